//! Recursive wrapper resolution.
//!
//! Walks wrapper redirects depth-first until every branch ends in inline ads,
//! a failed hop, a revisited URL, or the depth bound. Each inline ad carries
//! the metadata snapshot of the nearest wrapper above it. Each hop passes
//! only its own snapshot down, so outer layers never accumulate a chain.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use futures::future::{join_all, BoxFuture, FutureExt};

use crate::error::FailureKind;
use crate::extract::{extract_ads, AdKind, ExtractedAd};
use crate::fetch::DocumentFetcher;
use crate::types::{OriginMetadata, ResolvedAd};
use crate::xml::parse_document;

/// URLs already claimed within one top-level resolution.
///
/// Shared by reference across every branch of that call tree and dropped
/// with it. Check-and-insert happens under one lock, so two concurrently
/// polled branches can never both fetch the same URL.
#[derive(Debug, Default)]
pub struct VisitedSet {
    urls: Mutex<HashSet<String>>,
}

impl VisitedSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `url` as visited. Returns `false` if it already was.
    pub fn try_claim(&self, url: &str) -> bool {
        self.urls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.to_owned())
    }

    #[must_use]
    pub fn contains(&self, url: &str) -> bool {
        self.urls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(url)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.urls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Terminal ads reached from one document, plus that document's text.
#[derive(Debug, Default)]
pub struct Resolution {
    pub ads: Vec<ResolvedAd>,
    /// `None` when the document could not be fetched.
    pub document: Option<String>,
}

pub struct WrapperResolver<'f> {
    fetcher: &'f DocumentFetcher,
    parallel_branches: bool,
}

impl<'f> WrapperResolver<'f> {
    /// With `parallel_branches`, sibling wrappers in one document are
    /// followed concurrently; output order is still document order.
    #[must_use]
    pub fn new(fetcher: &'f DocumentFetcher, parallel_branches: bool) -> Self {
        Self {
            fetcher,
            parallel_branches,
        }
    }

    /// Resolve `url` with a fresh [`VisitedSet`] scoped to this call.
    pub async fn resolve_tag(&self, url: &str, max_depth: u32) -> Resolution {
        let visited = VisitedSet::new();
        self.resolve(url, max_depth, &visited, None).await
    }

    /// Resolve one document and everything its wrappers lead to.
    ///
    /// `parent` is the snapshot of the wrapper that led here, `None` for the
    /// top-level tag. Ads reached with a parent are marked wrapped and carry
    /// that snapshot as their origin.
    ///
    /// Never fails: a fetch or parse failure, a URL already in `visited`, or
    /// `depth == 0` all yield an empty [`Resolution`].
    pub fn resolve<'a>(
        &'a self,
        url: &'a str,
        depth: u32,
        visited: &'a VisitedSet,
        parent: Option<&'a OriginMetadata>,
    ) -> BoxFuture<'a, Resolution> {
        async move {
            let is_wrapped = parent.is_some();
            if depth == 0 {
                tracing::debug!(url, "depth bound reached; dropping branch");
                return Resolution::default();
            }
            if !visited.try_claim(url) {
                tracing::debug!(url, "already visited in this resolution; skipping");
                return Resolution::default();
            }

            tracing::debug!(url, depth, is_wrapped, "fetching tag document");
            let bytes = match self.fetcher.fetch(url).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!(url, kind = ?e.kind(), error = %e, "tag fetch failed");
                    return Resolution::default();
                }
            };
            let document = String::from_utf8_lossy(&bytes).into_owned();

            let root = match parse_document(&bytes) {
                Ok(root) => root,
                Err(e) => {
                    tracing::warn!(url, kind = ?e.kind(), error = %e, "tag document unparseable");
                    return Resolution {
                        ads: Vec::new(),
                        document: Some(document),
                    };
                }
            };

            let entries = extract_ads(&root);
            if entries.is_empty() {
                tracing::debug!(
                    url,
                    kind = ?FailureKind::StructuralAbsence,
                    "tag document has no ad entries"
                );
            }

            // Snapshots are taken for the whole layer before any child is
            // fetched, so they only ever reflect what this document declares.
            let snapshots: Vec<OriginMetadata> = entries
                .iter()
                .map(|entry| OriginMetadata::snapshot(&entry.node))
                .collect();
            let branches = entries
                .into_iter()
                .zip(snapshots)
                .map(|(entry, snapshot)| {
                    self.resolve_entry(entry, snapshot, depth, visited, parent)
                });

            let ads = if self.parallel_branches {
                join_all(branches).await.into_iter().flatten().collect()
            } else {
                let mut ads = Vec::new();
                for branch in branches {
                    ads.extend(branch.await);
                }
                ads
            };

            Resolution {
                ads,
                document: Some(document),
            }
        }
        .boxed()
    }

    async fn resolve_entry(
        &self,
        entry: ExtractedAd,
        snapshot: OriginMetadata,
        depth: u32,
        visited: &VisitedSet,
        parent: Option<&OriginMetadata>,
    ) -> Vec<ResolvedAd> {
        let tag_uri = match entry.node.kind.clone() {
            AdKind::Inline => {
                return vec![ResolvedAd {
                    ad: entry.node,
                    element: entry.element,
                    wrapped: parent.is_some(),
                    origin: parent.cloned().unwrap_or(snapshot),
                }];
            }
            AdKind::Wrapper { tag_uri: None } => {
                tracing::debug!(
                    ad_id = %entry.node.id,
                    kind = ?FailureKind::StructuralAbsence,
                    "wrapper has no redirect target"
                );
                return Vec::new();
            }
            AdKind::Wrapper {
                tag_uri: Some(tag_uri),
            } => tag_uri,
        };

        self.resolve(&tag_uri, depth - 1, visited, Some(&snapshot))
            .await
            .ads
    }
}
