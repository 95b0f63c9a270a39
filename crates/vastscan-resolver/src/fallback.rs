//! Advertiser domain recovery from click-through redirects.

use reqwest::Url;

use crate::fetch::DocumentFetcher;

/// Follow `click_url` to its final destination and return that host.
///
/// Best effort: any failure is logged and yields `None`.
pub async fn resolve_advertiser_domain(
    fetcher: &DocumentFetcher,
    click_url: &str,
) -> Option<String> {
    match fetcher.final_url(click_url).await {
        Ok(final_url) => {
            let host = host_of(&final_url);
            tracing::debug!(
                click_url,
                final_url = %final_url,
                host = host.as_deref().unwrap_or(""),
                "resolved advertiser domain from click-through"
            );
            host
        }
        Err(e) => {
            tracing::warn!(click_url, error = %e, "click-through lookup failed");
            None
        }
    }
}

/// Host component of `url`, without port.
pub(crate) fn host_of(url: &Url) -> Option<String> {
    url.host_str()
        .filter(|host| !host.is_empty())
        .map(str::to_owned)
}
