//! Ad entry extraction from a parsed tag document.

use serde::Serialize;

use crate::hash::creative_hash;
use crate::xml::XmlElement;

const AD_ELEMENT: &str = "Ad";
const WRAPPER_ELEMENT: &str = "Wrapper";
const REDIRECT_ELEMENT: &str = "VASTAdTagURI";
const DEFAULT_AD_ID: &str = "N/A";

const TITLE_PATH: &str = ".//AdTitle";
const DURATION_PATH: &str = ".//Duration";
const CLICK_THROUGH_PATH: &str = ".//ClickThrough";
const CREATIVE_PATH: &str = ".//Creative";
const MEDIA_FILE_PATH: &str = ".//MediaFile";
const SSAI_CREATIVE_ID_PATH: &str =
    ".//Extensions/Extension[@type='FreeWheel']/SSAICreativeId";

/// Where to look for the advertiser domain, most specific first.
const ADOMAIN_PATHS: [&str; 3] = [
    ".//AdVerifications/Verification/AdVerificationParameters/Adomain",
    ".//Extension[@type='advertiser']/Adomain",
    ".//Advertiser",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AdKind {
    Inline,
    /// Redirects to another tag document. `tag_uri` is `None` when the
    /// wrapper's redirect target is missing or blank; such a wrapper
    /// resolves to nothing.
    Wrapper { tag_uri: Option<String> },
}

/// Fields pulled from one `<Ad>` element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdNode {
    pub id: String,
    pub kind: AdKind,
    pub title: Option<String>,
    pub duration: Option<String>,
    pub click_url: Option<String>,
    pub creative_id: Option<String>,
    pub ssai_creative_id: Option<String>,
    pub media_urls: Vec<String>,
    pub adomain: Option<String>,
}

impl AdNode {
    /// Hash over the fields declared in the document.
    #[must_use]
    pub fn creative_hash(&self) -> String {
        creative_hash(
            self.ssai_creative_id.as_deref(),
            self.creative_id.as_deref(),
            &self.media_urls,
            self.adomain.as_deref(),
        )
    }
}

/// An extracted ad together with its source subtree.
#[derive(Debug, Clone)]
pub struct ExtractedAd {
    pub node: AdNode,
    pub element: XmlElement,
}

/// Extract every `<Ad>` element under `root` (including `root` itself) in
/// document order.
///
/// Order matters: the resolver correlates each wrapper with its own-layer
/// metadata by position.
#[must_use]
pub fn extract_ads(root: &XmlElement) -> Vec<ExtractedAd> {
    std::iter::once(root)
        .chain(root.descendants())
        .filter(|el| el.local_name() == AD_ELEMENT)
        .map(|el| ExtractedAd {
            node: extract_ad(el),
            element: el.clone(),
        })
        .collect()
}

/// Read the fields of a single `<Ad>` element. Absent or blank fields are `None`.
#[must_use]
pub fn extract_ad(ad: &XmlElement) -> AdNode {
    AdNode {
        id: ad
            .attr("id")
            .map_or_else(|| DEFAULT_AD_ID.to_string(), str::to_owned),
        kind: ad_kind(ad),
        title: owned(ad.select_text(TITLE_PATH)),
        duration: owned(ad.select_text(DURATION_PATH)),
        click_url: owned(ad.select_text(CLICK_THROUGH_PATH)),
        creative_id: ad
            .select(CREATIVE_PATH)
            .into_iter()
            .find_map(|creative| creative.attr("id").filter(|id| !id.trim().is_empty()))
            .map(|id| id.trim().to_owned()),
        ssai_creative_id: ad
            .select_text(SSAI_CREATIVE_ID_PATH)
            .map(strip_cdata_marker)
            .filter(|id| !id.is_empty()),
        media_urls: ad
            .select(MEDIA_FILE_PATH)
            .into_iter()
            .filter_map(XmlElement::text)
            .map(str::to_owned)
            .collect(),
        adomain: ADOMAIN_PATHS
            .iter()
            .find_map(|path| ad.select_text(path))
            .map(str::to_owned),
    }
}

fn ad_kind(ad: &XmlElement) -> AdKind {
    match ad.child(WRAPPER_ELEMENT) {
        Some(wrapper) => AdKind::Wrapper {
            tag_uri: wrapper
                .child(REDIRECT_ELEMENT)
                .and_then(XmlElement::text)
                .map(str::to_owned),
        },
        None => AdKind::Inline,
    }
}

/// Some servers escape the CDATA section, so the text arrives literally as
/// `CDATA[value]`.
fn strip_cdata_marker(value: &str) -> String {
    value
        .strip_prefix("CDATA[")
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(value)
        .trim()
        .to_owned()
}

fn owned(value: Option<&str>) -> Option<String> {
    value.map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::parse_document;

    fn ads_from(xml: &str) -> Vec<AdNode> {
        let root = parse_document(xml.as_bytes()).expect("fixture should parse");
        extract_ads(&root).into_iter().map(|e| e.node).collect()
    }

    const FULL_INLINE: &str = r#"<VAST version="4.1">
  <Ad id="ad-42">
    <InLine>
      <AdTitle>Spring Sale</AdTitle>
      <AdVerifications>
        <Verification vendor="iab">
          <AdVerificationParameters><Adomain>verified.example</Adomain></AdVerificationParameters>
        </Verification>
      </AdVerifications>
      <Creatives>
        <Creative id="cr-7">
          <Linear>
            <Duration>00:00:30</Duration>
            <VideoClicks><ClickThrough><![CDATA[http://click.example/c?id=1]]></ClickThrough></VideoClicks>
            <MediaFiles>
              <MediaFile type="video/mp4"> http://cdn.example/a.mp4 </MediaFile>
              <MediaFile type="video/mp4"></MediaFile>
              <MediaFile type="video/webm"><![CDATA[http://cdn.example/a.webm]]></MediaFile>
            </MediaFiles>
          </Linear>
        </Creative>
      </Creatives>
      <Extensions>
        <Extension type="advertiser"><Adomain>extension.example</Adomain></Extension>
        <Extension type="FreeWheel"><SSAICreativeId>fw-123</SSAICreativeId></Extension>
      </Extensions>
      <Advertiser>plain.example</Advertiser>
    </InLine>
  </Ad>
</VAST>"#;

    #[test]
    fn extracts_all_inline_fields() {
        let ads = ads_from(FULL_INLINE);
        assert_eq!(ads.len(), 1);
        let ad = &ads[0];
        assert_eq!(ad.id, "ad-42");
        assert_eq!(ad.kind, AdKind::Inline);
        assert_eq!(ad.title.as_deref(), Some("Spring Sale"));
        assert_eq!(ad.duration.as_deref(), Some("00:00:30"));
        assert_eq!(ad.click_url.as_deref(), Some("http://click.example/c?id=1"));
        assert_eq!(ad.creative_id.as_deref(), Some("cr-7"));
        assert_eq!(ad.ssai_creative_id.as_deref(), Some("fw-123"));
        assert_eq!(
            ad.media_urls,
            vec!["http://cdn.example/a.mp4", "http://cdn.example/a.webm"]
        );
        assert_eq!(ad.adomain.as_deref(), Some("verified.example"));
    }

    #[test]
    fn adomain_falls_back_to_advertiser_extension() {
        let ads = ads_from(
            r#"<VAST><Ad id="1"><InLine>
                <Extensions><Extension type="advertiser"><Adomain>ext.example</Adomain></Extension></Extensions>
                <Advertiser>plain.example</Advertiser>
            </InLine></Ad></VAST>"#,
        );
        assert_eq!(ads[0].adomain.as_deref(), Some("ext.example"));
    }

    #[test]
    fn adomain_falls_back_to_plain_advertiser() {
        let ads = ads_from(
            r#"<VAST><Ad id="1"><InLine>
                <Extensions><Extension type="advertiser"><Adomain>  </Adomain></Extension></Extensions>
                <Advertiser>plain.example</Advertiser>
            </InLine></Ad></VAST>"#,
        );
        assert_eq!(ads[0].adomain.as_deref(), Some("plain.example"));
    }

    #[test]
    fn missing_fields_are_none_and_id_defaults() {
        let ads = ads_from("<VAST><Ad><InLine/></Ad></VAST>");
        let ad = &ads[0];
        assert_eq!(ad.id, "N/A");
        assert_eq!(ad.kind, AdKind::Inline);
        assert!(ad.title.is_none());
        assert!(ad.duration.is_none());
        assert!(ad.click_url.is_none());
        assert!(ad.creative_id.is_none());
        assert!(ad.ssai_creative_id.is_none());
        assert!(ad.media_urls.is_empty());
        assert!(ad.adomain.is_none());
    }

    #[test]
    fn escaped_cdata_marker_is_stripped_from_ssai_id() {
        let ads = ads_from(
            r#"<VAST><Ad id="1"><InLine><Extensions>
                <Extension type="FreeWheel"><SSAICreativeId>&lt;![CDATA[fw-9]]&gt;</SSAICreativeId></Extension>
            </Extensions></InLine></Ad></VAST>"#,
        );
        // "<![CDATA[fw-9]]>" is not the literal marker form, so it is kept verbatim.
        assert_eq!(ads[0].ssai_creative_id.as_deref(), Some("<![CDATA[fw-9]]>"));

        let ads = ads_from(
            r#"<VAST><Ad id="1"><InLine><Extensions>
                <Extension type="FreeWheel"><SSAICreativeId>CDATA[fw-9]</SSAICreativeId></Extension>
            </Extensions></InLine></Ad></VAST>"#,
        );
        assert_eq!(ads[0].ssai_creative_id.as_deref(), Some("fw-9"));
    }

    #[test]
    fn ssai_id_requires_freewheel_extension() {
        let ads = ads_from(
            r#"<VAST><Ad id="1"><InLine><Extensions>
                <Extension type="Other"><SSAICreativeId>nope</SSAICreativeId></Extension>
            </Extensions></InLine></Ad></VAST>"#,
        );
        assert!(ads[0].ssai_creative_id.is_none());
    }

    #[test]
    fn wrapper_with_target_is_wrapper() {
        let ads = ads_from(
            r#"<VAST><Ad id="w1"><Wrapper>
                <AdTitle>Wrapper Title</AdTitle>
                <VASTAdTagURI><![CDATA[ http://next.example/vast.xml ]]></VASTAdTagURI>
            </Wrapper></Ad></VAST>"#,
        );
        assert_eq!(
            ads[0].kind,
            AdKind::Wrapper {
                tag_uri: Some("http://next.example/vast.xml".to_string())
            }
        );
        assert_eq!(ads[0].title.as_deref(), Some("Wrapper Title"));
    }

    #[test]
    fn wrapper_without_target_has_no_tag_uri() {
        let ads = ads_from(
            r#"<VAST><Ad id="w1"><Wrapper><VASTAdTagURI>   </VASTAdTagURI></Wrapper></Ad>
               <Ad id="w2"><Wrapper/></Ad></VAST>"#,
        );
        assert_eq!(ads[0].kind, AdKind::Wrapper { tag_uri: None });
        assert_eq!(ads[1].kind, AdKind::Wrapper { tag_uri: None });
    }

    #[test]
    fn ads_are_returned_in_document_order() {
        let ads = ads_from(
            r#"<VAST><Ad id="first"><InLine/></Ad><Ad id="second"><Wrapper><VASTAdTagURI>http://x</VASTAdTagURI></Wrapper></Ad><Ad id="third"><InLine/></Ad></VAST>"#,
        );
        let ids: Vec<&str> = ads.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn root_ad_element_is_included() {
        let ads = ads_from(r#"<Ad id="solo"><InLine/></Ad>"#);
        assert_eq!(ads.len(), 1);
        assert_eq!(ads[0].id, "solo");
    }

    #[test]
    fn document_without_ads_yields_nothing() {
        assert!(ads_from("<VAST version=\"3.0\"/>").is_empty());
        assert!(ads_from("<html><body>404</body></html>").is_empty());
    }

    #[test]
    fn extracted_element_keeps_subtree() {
        let root = parse_document(FULL_INLINE.as_bytes()).unwrap();
        let entries = extract_ads(&root);
        assert_eq!(entries[0].element.name(), "Ad");
        assert_eq!(entries[0].element.attr("id"), Some("ad-42"));
    }
}
