//! HTTP client for the corpus resource.
//!
//! The map loads its corpus (`cities.json` or `travels.json`) once at
//! startup. Transient failures (connection errors and 429/5xx responses)
//! are retried with exponential backoff; anything else fails immediately.

use std::time::{Duration, Instant};

use log::{info, warn};
use reqwest::{Client, StatusCode};

use crate::corpus::Corpus;
use crate::error::{Result, TrailError};

const MAX_RETRIES: u32 = 3;
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Backoff before retry `attempt` (1-based): 500ms, 1s, 2s, 4s...
fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(250 * (1 << attempt.min(5)))
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Fetches and parses corpus resources.
pub struct CorpusFetcher {
    client: Client,
}

impl CorpusFetcher {
    /// Create a fetcher with a pooled client.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| TrailError::HttpError {
                message: format!("Failed to create HTTP client: {}", e),
                status_code: None,
            })?;
        Ok(Self { client })
    }

    /// Download the corpus at `url` and parse it.
    pub async fn fetch(&self, url: &str) -> Result<Corpus> {
        let start = Instant::now();
        let body = self.fetch_text(url).await?;
        let corpus = Corpus::from_json_str(&body)?;
        info!(
            "[CorpusFetcher] Fetched {} ({} bytes) in {:.2}s",
            url,
            body.len(),
            start.elapsed().as_secs_f64()
        );
        Ok(corpus)
    }

    async fn fetch_text(&self, url: &str) -> Result<String> {
        let mut retries = 0;

        loop {
            match self.client.get(url).send().await {
                Ok(resp) => {
                    let status = resp.status();

                    if is_retryable(status) && retries < MAX_RETRIES {
                        retries += 1;
                        let wait = backoff(retries);
                        warn!(
                            "[CorpusFetcher] HTTP {} for {}, retry {} after {:?}",
                            status, url, retries, wait
                        );
                        tokio::time::sleep(wait).await;
                        continue;
                    }

                    if !status.is_success() {
                        return Err(TrailError::HttpError {
                            message: format!("HTTP {} for {}", status, url),
                            status_code: Some(status.as_u16()),
                        });
                    }

                    return resp.text().await.map_err(|e| TrailError::HttpError {
                        message: format!("Failed to read body: {}", e),
                        status_code: Some(status.as_u16()),
                    });
                }
                Err(e) => {
                    // A malformed URL will not get better by waiting
                    if e.is_builder() || retries >= MAX_RETRIES {
                        return Err(TrailError::HttpError {
                            message: format!("Request error: {}", e),
                            status_code: e.status().map(|s| s.as_u16()),
                        });
                    }
                    retries += 1;
                    let wait = backoff(retries);
                    warn!(
                        "[CorpusFetcher] Error for {}: {}, retry {} after {:?}",
                        url, e, retries, wait
                    );
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }
}

/// Download and parse the corpus at `url`.
pub async fn fetch_corpus(url: &str) -> Result<Corpus> {
    CorpusFetcher::new()?.fetch(url).await
}

/// Synchronous wrapper for FFI and the CLI - runs the fetch on a tokio runtime
pub fn fetch_corpus_blocking(url: &str) -> Result<Corpus> {
    let rt = tokio::runtime::Runtime::new().map_err(|e| TrailError::Internal {
        message: format!("Failed to create tokio runtime: {}", e),
    })?;
    rt.block_on(fetch_corpus(url))
}
