//! Page fetching for metadata enrichment.

use async_trait::async_trait;
use link_engine_core::FetchError;
use std::time::Duration;

/// Pages larger than this are abandoned; preview metadata lives in the head.
const MAX_HTML_BYTES: usize = 512 * 1024;

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = "LinkEngine/0.1 (link preview)";

/// Fetches raw HTML for a URL. The trait seam lets tests substitute canned
/// documents for live network access.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// reqwest-backed fetcher used outside of tests.
pub struct HttpPageFetcher {
    client: reqwest::Client,
}

impl HttpPageFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::Client {
                reason: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Request {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| FetchError::Body {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        if body.len() > MAX_HTML_BYTES {
            return Err(FetchError::TooLarge {
                url: url.to_string(),
                size: body.len(),
            });
        }

        Ok(body)
    }
}
