//! Output types of a tag resolution.

use serde::Serialize;

use crate::extract::AdNode;
use crate::xml::XmlElement;

/// Snapshot of one layer's declared fields, taken before any wrapper below it
/// is followed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OriginMetadata {
    pub ad_id: String,
    pub creative_id: Option<String>,
    pub ssai_creative_id: Option<String>,
    pub title: Option<String>,
    pub duration: Option<String>,
    pub clickthrough: Option<String>,
    pub media_urls: Vec<String>,
    pub adomain: Option<String>,
    pub creative_hash: String,
}

impl OriginMetadata {
    #[must_use]
    pub fn snapshot(ad: &AdNode) -> Self {
        Self {
            ad_id: ad.id.clone(),
            creative_id: ad.creative_id.clone(),
            ssai_creative_id: ad.ssai_creative_id.clone(),
            title: ad.title.clone(),
            duration: ad.duration.clone(),
            clickthrough: ad.click_url.clone(),
            media_urls: ad.media_urls.clone(),
            adomain: ad.adomain.clone(),
            creative_hash: ad.creative_hash(),
        }
    }
}

/// A terminal inline ad reached by the resolver.
#[derive(Debug, Clone)]
pub struct ResolvedAd {
    pub ad: AdNode,
    /// Source `<Ad>` subtree, kept for the audit copy.
    pub element: XmlElement,
    /// `true` when at least one wrapper hop led here.
    pub wrapped: bool,
    /// Fields of the nearest wrapper above this ad, or of the ad's own layer
    /// when it was not wrapped.
    pub origin: OriginMetadata,
}

/// One row handed to storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdRecord {
    pub call_number: u32,
    pub ad_id: String,
    pub creative_id: Option<String>,
    pub ssai_creative_id: Option<String>,
    pub title: Option<String>,
    pub duration: Option<String>,
    pub clickthrough: Option<String>,
    pub media_urls: Vec<String>,
    pub adomain: Option<String>,
    pub creative_hash: String,
    pub raw_xml: String,
    pub wrapped: bool,
    pub origin_metadata: OriginMetadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    Parsed(usize),
    /// Nothing resolved. Does not say why: transport, parse, and structural
    /// failures all end here.
    NoValidAds,
}

impl std::fmt::Display for ScanOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanOutcome::Parsed(n) => write!(f, "parsed {n} ads"),
            ScanOutcome::NoValidAds => write!(f, "no valid ads found"),
        }
    }
}

/// Result of one top-level resolution.
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub records: Vec<AdRecord>,
    pub count: usize,
    pub outcome: ScanOutcome,
    /// Body of the top-level document, when it could be fetched.
    pub top_level_document: Option<String>,
}

impl ScanReport {
    #[must_use]
    pub fn new(records: Vec<AdRecord>, top_level_document: Option<String>) -> Self {
        let count = records.len();
        let outcome = if count == 0 {
            ScanOutcome::NoValidAds
        } else {
            ScanOutcome::Parsed(count)
        };
        Self {
            records,
            count,
            outcome,
            top_level_document,
        }
    }
}
