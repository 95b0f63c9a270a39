//! Top-level entry point: one tag URL in, one batch of records out.

use vastscan_core::AppConfig;

use crate::assemble::assemble_batch;
use crate::error::ResolveError;
use crate::fetch::DocumentFetcher;
use crate::resolve::WrapperResolver;
use crate::types::ScanReport;

/// Settings for a [`TagScanner`].
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub user_agent: String,
    pub fetch_timeout_secs: u64,
    pub fallback_timeout_secs: u64,
    pub max_depth: u32,
    pub parallel_branches: bool,
}

impl ScanConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            fetch_timeout_secs: config.fetch_timeout_secs,
            fallback_timeout_secs: config.fallback_timeout_secs,
            max_depth: config.max_depth,
            parallel_branches: config.parallel_branches,
        }
    }
}

/// Resolves tag URLs into [`ScanReport`]s.
///
/// Holds no state between scans beyond the HTTP connection pool: every call
/// to [`TagScanner::scan`] starts with an empty visited set.
pub struct TagScanner {
    fetcher: DocumentFetcher,
    max_depth: u32,
    parallel_branches: bool,
}

impl TagScanner {
    /// # Errors
    ///
    /// Returns [`ResolveError::Http`] if the HTTP clients cannot be built.
    pub fn new(config: &ScanConfig) -> Result<Self, ResolveError> {
        let fetcher = DocumentFetcher::new(
            &config.user_agent,
            config.fetch_timeout_secs,
            config.fallback_timeout_secs,
        )?;
        Ok(Self {
            fetcher,
            max_depth: config.max_depth,
            parallel_branches: config.parallel_branches,
        })
    }

    /// Resolve `tag_url` and package every terminal ad.
    ///
    /// `call_number` is copied onto each record and otherwise unused. An
    /// empty batch is reported through [`crate::ScanOutcome::NoValidAds`],
    /// never as an error.
    pub async fn scan(&self, tag_url: &str, call_number: u32) -> ScanReport {
        let resolver = WrapperResolver::new(&self.fetcher, self.parallel_branches);
        let resolution = resolver.resolve_tag(tag_url, self.max_depth).await;
        let records = assemble_batch(&self.fetcher, resolution.ads, call_number).await;
        let report = ScanReport::new(records, resolution.document);

        tracing::info!(
            tag_url,
            call_number,
            count = report.count,
            outcome = %report.outcome,
            "tag resolution finished"
        );
        report
    }
}
