//! HTTP retrieval of tag documents.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, Url};

use crate::error::ResolveError;

const ACCEPT_XML: &str = "application/xml,text/xml;q=0.9,*/*;q=0.8";
const MAX_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Fetches tag documents while presenting a fixed playback-client identity.
///
/// Holds two clients sharing the same header profile: one for wrapper hops
/// and one with a shorter timeout for click-through lookups. Each request
/// carries its own timeout; nothing is cached between calls.
pub struct DocumentFetcher {
    client: Client,
    fallback_client: Client,
}

impl DocumentFetcher {
    /// Builds a fetcher with the given `User-Agent` and per-request timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Http`] if either `reqwest::Client` cannot be
    /// constructed (invalid header value, TLS init failure).
    pub fn new(
        user_agent: &str,
        fetch_timeout_secs: u64,
        fallback_timeout_secs: u64,
    ) -> Result<Self, ResolveError> {
        Ok(Self {
            client: build_client(user_agent, fetch_timeout_secs)?,
            fallback_client: build_client(user_agent, fallback_timeout_secs)?,
        })
    }

    /// Fetches a tag document and returns its body bytes.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::Http`] on network failure, timeout, or an unparseable URL.
    /// - [`ResolveError::UnexpectedStatus`] on any non-2xx status.
    /// - [`ResolveError::EmptyBody`] when the body is empty or whitespace only.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, ResolveError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }

        let body = response.bytes().await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(ResolveError::EmptyBody {
                url: url.to_owned(),
            });
        }
        Ok(body.to_vec())
    }

    /// Issues a GET to `url`, following redirects, and returns the final URL.
    ///
    /// The response status is not inspected: a landing page that answers
    /// with an error still identifies where the redirect chain ended.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Http`] on network failure, timeout, an
    /// unparseable URL, or a redirect loop.
    pub async fn final_url(&self, url: &str) -> Result<Url, ResolveError> {
        let response = self.fallback_client.get(url).send().await?;
        Ok(response.url().clone())
    }
}

fn build_client(user_agent: &str, timeout_secs: u64) -> Result<Client, ResolveError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_XML));

    let client = Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(
            timeout_secs.min(MAX_CONNECT_TIMEOUT_SECS),
        ))
        .user_agent(user_agent)
        .default_headers(headers)
        .build()?;
    Ok(client)
}
