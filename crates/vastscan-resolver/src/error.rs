use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("empty response body from {url}")]
    EmptyBody { url: String },

    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("document contains no XML element")]
    NoRootElement,

    #[error("XML serialization error: {0}")]
    Serialize(String),
}

/// Coarse classification of a soft failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Network error, timeout, or non-success status.
    Transport,
    /// Markup could not be recovered even tolerantly.
    Parse,
    /// The document parsed but held no ads, or a wrapper had no redirect target.
    StructuralAbsence,
}

impl ResolveError {
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            ResolveError::Http(_)
            | ResolveError::UnexpectedStatus { .. }
            | ResolveError::EmptyBody { .. } => FailureKind::Transport,
            ResolveError::Xml(_) | ResolveError::Serialize(_) | ResolveError::NoRootElement => {
                FailureKind::Parse
            }
        }
    }
}
