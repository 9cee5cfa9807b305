//! HTTP retrieval of feeds, sitemaps and article pages.
//!
//! [`FetchText`] is the seam the discoverer and scraper are written against;
//! [`HttpFetcher`] is the reqwest implementation used by the binary.

use std::time::{Duration, Instant};

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use tracing::{debug, instrument, warn};

use crate::config::FetchConfig;
use crate::error::FetchError;

/// Bodies shorter than this are treated as failed fetches.
pub const MIN_BODY_BYTES: usize = 50;

const BLOCK_MARKERS: [&str; 3] = ["403 forbidden", "proxy error", "cloudflare"];

/// A successfully fetched response body.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: String,
    pub body: String,
    /// The body carries a block or challenge marker. Informational only.
    pub suspected_block: bool,
}

/// Retrieve a URL as text.
pub trait FetchText {
    async fn fetch_text(&self, url: &str, timeout: Duration) -> Result<FetchedPage, FetchError>;
}

/// reqwest-backed fetcher with a browser-like identity. No retries.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self { client })
    }
}

impl FetchText for HttpFetcher {
    #[instrument(level = "info", skip_all, fields(%url))]
    async fn fetch_text(&self, url: &str, timeout: Duration) -> Result<FetchedPage, FetchError> {
        let t0 = Instant::now();
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| FetchError::Http {
                url: url.to_string(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| FetchError::Http {
            url: url.to_string(),
            source: e,
        })?;
        debug!(bytes = body.len(), elapsed_ms = t0.elapsed().as_millis() as u64, "Fetched");
        inspect_body(url, body)
    }
}

/// Apply the body checks shared by every transport.
///
/// # Errors
///
/// [`FetchError::TooShort`] when the body is under [`MIN_BODY_BYTES`].
pub fn inspect_body(url: &str, body: String) -> Result<FetchedPage, FetchError> {
    if body.len() < MIN_BODY_BYTES {
        return Err(FetchError::TooShort {
            url: url.to_string(),
            len: body.len(),
        });
    }
    let suspected_block = looks_blocked(&body);
    if suspected_block {
        warn!(%url, "Response carries a block/challenge marker");
    }
    Ok(FetchedPage {
        url: url.to_string(),
        body,
        suspected_block,
    })
}

/// Case-insensitive check for block/challenge markers.
pub fn looks_blocked(body: &str) -> bool {
    let lower = body.to_lowercase();
    BLOCK_MARKERS.iter().any(|m| lower.contains(m))
}
