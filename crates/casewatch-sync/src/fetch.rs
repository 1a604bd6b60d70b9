//! Contract with the network layer.
//!
//! Politeness, retries and scheduling live behind this trait. The
//! controller only needs the three outcomes kept distinct: content,
//! not-modified, or failure.

use async_trait::async_trait;
use casewatch_core::{ConditionalHints, FetchedContent};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request to {url} timed out")]
    Timeout { url: String },
    #[error("transport error fetching {url}: {detail}")]
    Transport { url: String, detail: String },
    #[error("server returned {status} for {url}: {body}")]
    Server {
        url: String,
        status: u16,
        body: String,
    },
    #[error("could not read response body from {url}: {detail}")]
    Decode { url: String, detail: String },
}

/// Result of a successful fetch.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// Transport-level "not modified": no body, nothing to compare.
    NotModified,
    Fetched(FetchedContent),
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `url`. `hints` are advisory conditional-request validators.
    async fn fetch(&self, url: &str, hints: &ConditionalHints) -> Result<FetchOutcome, FetchError>;
}
