//! The capability interface every source format implements.
//!
//! The controller only ever talks to [`Extractor`]; it never knows whether
//! the source is a CSV feed, an HTML table or a document.

use serde_json::Value;
use thiserror::Error;

use crate::headers::Headers;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("content is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("malformed {format} content: {detail}")]
    Malformed { format: &'static str, detail: String },
}

/// Response content handed to extractors.
#[derive(Debug, Clone)]
pub struct FetchedContent {
    pub url: String,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl FetchedContent {
    pub fn new(url: impl Into<String>, headers: Headers, body: impl Into<Vec<u8>>) -> Self {
        Self {
            url: url.into(),
            headers,
            body: body.into(),
        }
    }

    /// Body as UTF-8 text.
    pub fn text(&self) -> Result<&str, ExtractError> {
        Ok(std::str::from_utf8(&self.body)?)
    }
}

/// One extracted record before validation.
///
/// `payload` is opaque to everything but the validator.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCase {
    pub payload: Value,
    /// Bind this record to a narrower payload than the whole response.
    pub raw_sha256: Option<String>,
    /// Identifier for a non-addressable sub-artifact, e.g. a document name.
    pub artifact_key: Option<String>,
}

impl RawCase {
    pub fn new(payload: Value) -> Self {
        Self {
            payload,
            raw_sha256: None,
            artifact_key: None,
        }
    }

    pub fn with_artifact_key(mut self, key: impl Into<String>) -> Self {
        self.artifact_key = Some(key.into());
        self
    }

    pub fn with_raw_sha256(mut self, sha: impl Into<String>) -> Self {
        self.raw_sha256 = Some(sha.into());
        self
    }
}

/// Format-specific extraction.
pub trait Extractor: Send + Sync {
    /// Short name used in logs.
    fn format(&self) -> &'static str;

    /// Identifiers of the entries visible in a listing, used only for
    /// fingerprinting. Order does not matter. An empty result means "hash
    /// the body instead".
    fn listing_identifiers(&self, content: &FetchedContent) -> Result<Vec<String>, ExtractError>;

    /// Loosely-structured records, one per listing entry.
    fn extract_records(&self, content: &FetchedContent) -> Result<Vec<RawCase>, ExtractError>;
}
