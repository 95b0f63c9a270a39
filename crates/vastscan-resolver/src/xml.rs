//! Fault-tolerant XML tree built on `quick-xml` events.
//!
//! Ad servers routinely emit markup that a strict parser rejects: unescaped
//! ampersands in URLs, mismatched closing tags, documents cut off mid-stream.
//! [`parse_document`] keeps whatever structure it can recover and only fails
//! when no element could be read at all.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::ResolveError;

/// An element and its subtree.
///
/// Text and CDATA content are merged into [`XmlChild::Text`]; whitespace-only
/// runs between elements are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlChild>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlChild {
    Element(XmlElement),
    Text(String),
}

/// Parse `bytes` into an element tree, recovering from malformed input.
///
/// - Invalid UTF-8 is replaced lossily and a leading BOM is skipped.
/// - A closing tag closes the nearest open element with the same name; a
///   closing tag with no open match is ignored.
/// - Elements still open at end of input are closed.
/// - A reader error ends parsing; everything read up to that point is kept.
/// - Only the first top-level element is returned.
///
/// # Errors
///
/// - [`ResolveError::Xml`] if the reader fails before any element opened.
/// - [`ResolveError::NoRootElement`] if the input holds no element at all.
pub fn parse_document(bytes: &[u8]) -> Result<XmlElement, ResolveError> {
    let decoded = String::from_utf8_lossy(bytes);
    let mut reader = Reader::from_str(decoded.trim_start_matches('\u{feff}'));
    {
        let config = reader.config_mut();
        config.trim_text(false);
        config.check_end_names = false;
        config.allow_unmatched_ends = true;
    }

    let mut tree = TreeBuilder::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => tree.open(XmlElement::from_start(&e)),
            Ok(Event::Empty(e)) => tree.attach(XmlElement::from_start(&e)),
            Ok(Event::End(e)) => tree.close(&String::from_utf8_lossy(e.name().as_ref())),
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map(std::borrow::Cow::into_owned)
                    .unwrap_or_else(|_| String::from_utf8_lossy(&e).into_owned());
                tree.text(text);
            }
            Ok(Event::CData(e)) => tree.text(String::from_utf8_lossy(&e).into_owned()),
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                if tree.is_empty() {
                    return Err(ResolveError::Xml(e));
                }
                tracing::debug!(
                    position = reader.buffer_position(),
                    error = %e,
                    "stopping at unreadable markup; keeping recovered elements"
                );
                break;
            }
        }
    }

    tree.finish().ok_or(ResolveError::NoRootElement)
}

/// Open-element stack plus the finished root.
#[derive(Default)]
struct TreeBuilder {
    stack: Vec<XmlElement>,
    root: Option<XmlElement>,
}

impl TreeBuilder {
    fn is_empty(&self) -> bool {
        self.stack.is_empty() && self.root.is_none()
    }

    fn open(&mut self, element: XmlElement) {
        self.stack.push(element);
    }

    fn attach(&mut self, element: XmlElement) {
        if let Some(parent) = self.stack.last_mut() {
            parent.children.push(XmlChild::Element(element));
        } else if self.root.is_none() {
            self.root = Some(element);
        } else {
            tracing::debug!(name = %element.name, "ignoring trailing top-level element");
        }
    }

    fn close(&mut self, name: &str) {
        let Some(pos) = self.stack.iter().rposition(|el| el.name == name) else {
            tracing::trace!(name, "ignoring unmatched closing tag");
            return;
        };
        while self.stack.len() > pos {
            if let Some(element) = self.stack.pop() {
                self.attach(element);
            }
        }
    }

    fn text(&mut self, text: String) {
        if let Some(parent) = self.stack.last_mut() {
            parent.push_text(text);
        }
    }

    fn finish(mut self) -> Option<XmlElement> {
        while let Some(element) = self.stack.pop() {
            self.attach(element);
        }
        self.root
    }
}

impl XmlElement {
    fn from_start(start: &BytesStart<'_>) -> Self {
        let attributes = start
            .attributes()
            .with_checks(false)
            .filter_map(Result::ok)
            .map(|attr| {
                let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
                let value = attr
                    .unescape_value()
                    .map(std::borrow::Cow::into_owned)
                    .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
                (key, value)
            })
            .collect();

        Self {
            name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
            attributes,
            children: Vec::new(),
        }
    }

    fn push_text(&mut self, text: String) {
        if text.trim().is_empty() {
            return;
        }
        if let Some(XmlChild::Text(existing)) = self.children.last_mut() {
            existing.push_str(&text);
        } else {
            self.children.push(XmlChild::Text(text));
        }
    }

    /// Qualified tag name as written, e.g. `vast:Ad`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tag name without any namespace prefix.
    #[must_use]
    pub fn local_name(&self) -> &str {
        local_part(&self.name)
    }

    /// Value of the attribute whose local name is `key`.
    #[must_use]
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| local_part(k) == key)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn children(&self) -> &[XmlChild] {
        &self.children
    }

    pub fn child_elements(&self) -> impl DoubleEndedIterator<Item = &XmlElement> {
        self.children.iter().filter_map(|child| match child {
            XmlChild::Element(el) => Some(el),
            XmlChild::Text(_) => None,
        })
    }

    /// First direct child element with the given local name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.child_elements().find(|el| el.local_name() == name)
    }

    /// Trimmed first text run of this element, if non-empty.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.children.iter().find_map(|child| match child {
            XmlChild::Text(t) if !t.trim().is_empty() => Some(t.trim()),
            _ => None,
        })
    }

    /// All descendant elements in document order, excluding `self`.
    #[must_use]
    pub fn descendants(&self) -> Vec<&XmlElement> {
        let mut out = Vec::new();
        let mut stack: Vec<&XmlElement> = self.child_elements().rev().collect();
        while let Some(el) = stack.pop() {
            out.push(el);
            stack.extend(el.child_elements().rev());
        }
        out
    }

    /// Elements matching a small path expression, in document order.
    ///
    /// Supported syntax: an optional leading `.//` (first step searches all
    /// descendants, otherwise direct children), `/`-separated child steps,
    /// and an optional `[@attr='value']` predicate on any step. Names match
    /// by local name.
    ///
    /// ```
    /// use vastscan_resolver::parse_document;
    ///
    /// let root = parse_document(
    ///     br#"<Ad><Extensions><Extension type="FreeWheel"><Id>7</Id></Extension></Extensions></Ad>"#,
    /// )
    /// .unwrap();
    /// let hits = root.select(".//Extensions/Extension[@type='FreeWheel']/Id");
    /// assert_eq!(hits[0].text(), Some("7"));
    /// ```
    #[must_use]
    pub fn select(&self, path: &str) -> Vec<&XmlElement> {
        let (descend, rest) = match path.strip_prefix(".//") {
            Some(rest) => (true, rest),
            None => (false, path),
        };
        let steps: Vec<Step<'_>> = rest.split('/').map(Step::parse).collect();
        let Some((first, tail)) = steps.split_first() else {
            return Vec::new();
        };

        let mut current: Vec<&XmlElement> = if descend {
            self.descendants()
                .into_iter()
                .filter(|el| first.matches(el))
                .collect()
        } else {
            self.child_elements().filter(|el| first.matches(el)).collect()
        };

        for step in tail {
            current = current
                .into_iter()
                .flat_map(|el| el.child_elements().filter(|c| step.matches(c)))
                .collect();
        }
        current
    }

    /// First non-empty trimmed text among the elements matching `path`.
    #[must_use]
    pub fn select_text(&self, path: &str) -> Option<&str> {
        self.select(path).into_iter().find_map(XmlElement::text)
    }

    /// Serialize this subtree as indented XML.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Serialize`] if the writer rejects an event.
    pub fn to_pretty_xml(&self) -> Result<String, ResolveError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        self.write_into(&mut writer)?;
        String::from_utf8(writer.into_inner()).map_err(|e| ResolveError::Serialize(e.to_string()))
    }

    fn write_into(&self, writer: &mut Writer<Vec<u8>>) -> Result<(), ResolveError> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.children.is_empty() {
            return write_event(writer, Event::Empty(start));
        }

        write_event(writer, Event::Start(start))?;
        for child in &self.children {
            match child {
                XmlChild::Element(el) => el.write_into(writer)?,
                XmlChild::Text(text) => write_event(writer, Event::Text(BytesText::new(text)))?,
            }
        }
        write_event(writer, Event::End(BytesEnd::new(self.name.as_str())))
    }
}

fn write_event(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), ResolveError> {
    writer
        .write_event(event)
        .map_err(|e| ResolveError::Serialize(e.to_string()))
}

fn local_part(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

/// One step of a [`XmlElement::select`] path.
struct Step<'p> {
    name: &'p str,
    predicate: Option<(&'p str, &'p str)>,
}

impl<'p> Step<'p> {
    fn parse(raw: &'p str) -> Self {
        let Some((name, rest)) = raw.split_once('[') else {
            return Self {
                name: raw,
                predicate: None,
            };
        };
        let predicate = rest
            .trim_end_matches(']')
            .trim_start_matches('@')
            .split_once('=')
            .map(|(key, value)| (key.trim(), value.trim().trim_matches(['\'', '"'])));
        Self { name, predicate }
    }

    fn matches(&self, el: &XmlElement) -> bool {
        if el.local_name() != self.name {
            return false;
        }
        match self.predicate {
            Some((key, value)) => el.attr(key) == Some(value),
            None => true,
        }
    }
}
