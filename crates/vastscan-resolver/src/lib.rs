//! Ad tag resolution engine.
//!
//! Fetches a tag document, follows wrapper redirects down to the inline ads
//! they resolve to, and packages each terminal ad as an [`AdRecord`] with a
//! content-derived [`creative_hash`] for deduplication downstream.
//!
//! Every failure below the top-level call is soft: a broken hop contributes
//! zero ads and resolution carries on with the rest of the tree.

pub mod assemble;
pub mod error;
pub mod extract;
pub mod fallback;
pub mod fetch;
pub mod hash;
pub mod resolve;
pub mod scanner;
pub mod types;
pub mod xml;

pub use error::{FailureKind, ResolveError};
pub use extract::{extract_ads, AdKind, AdNode, ExtractedAd};
pub use fetch::DocumentFetcher;
pub use hash::creative_hash;
pub use resolve::{Resolution, VisitedSet, WrapperResolver};
pub use scanner::{ScanConfig, TagScanner};
pub use types::{AdRecord, OriginMetadata, ResolvedAd, ScanOutcome, ScanReport};
pub use xml::{parse_document, XmlElement};
