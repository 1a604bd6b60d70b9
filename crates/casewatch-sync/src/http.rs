//! [`Fetcher`] over a plain HTTP GET.
//!
//! Conditional hints become `If-None-Match` / `If-Modified-Since`; a 304
//! reply maps to [`FetchOutcome::NotModified`]. No retries, no politeness.

use std::time::Duration;

use async_trait::async_trait;
use casewatch_core::{ConditionalHints, FetchedContent, Headers};
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use tracing::{debug, info};

use crate::fetch::{FetchError, FetchOutcome, Fetcher};

#[derive(Debug, Clone)]
pub struct HttpFetcherConfig {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpFetcherConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("casewatch/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &HttpFetcherConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }
}

fn transport_error(url: &str, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Transport {
            url: url.to_string(),
            detail: e.to_string(),
        }
    }
}

/// Response headers as lower-cased name/value pairs. Values that are not
/// visible ASCII are dropped.
fn response_headers(map: &HeaderMap) -> Headers {
    map.iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, hints: &ConditionalHints) -> Result<FetchOutcome, FetchError> {
        let mut request = self.client.get(url);
        for (name, value) in hints.header_pairs() {
            request = request.header(name, value);
        }

        debug!(url, conditional = !hints.is_empty(), "GET");
        let resp = request.send().await.map_err(|e| transport_error(url, e))?;
        let status = resp.status();
        if status == StatusCode::NOT_MODIFIED {
            return Ok(FetchOutcome::NotModified);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Server {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let final_url = resp.url().to_string();
        let headers = response_headers(resp.headers());
        let body = resp.bytes().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                }
            } else {
                FetchError::Decode {
                    url: url.to_string(),
                    detail: e.to_string(),
                }
            }
        })?;
        info!(url, bytes = body.len(), "fetched");
        Ok(FetchOutcome::Fetched(FetchedContent::new(
            final_url,
            headers,
            body.to_vec(),
        )))
    }
}
