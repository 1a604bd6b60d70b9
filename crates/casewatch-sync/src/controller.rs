//! Change-detection controller: one fetch cycle per watched source.
//!
//! ```text
//! IDLE -> load cursor -> REQUESTED -> fetch
//!   -> SHORT_CIRCUIT  transport said "not modified"; nothing emitted, store untouched
//!   -> UNCHANGED      derived cursor matches stored; nothing emitted, store untouched
//!   -> CHANGED        extract, validate each record, emit, then commit cursor
//! ```
//!
//! Fetch and extraction failures abort before anything is committed, so the
//! next cycle starts from the same baseline. Writing the new cursor is
//! always the last step of a successful cycle.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use casewatch_core::hash::sha256_hex;
use casewatch_core::record::source_payload;
use casewatch_core::{
    CaseResult, Cursor, ExtractError, Extractor, FetchedContent, RawCase, ValidationError,
};
use casewatch_store::{CursorStore, StoreError};
use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::fetch::{FetchError, FetchOutcome, Fetcher};
use crate::sink::{RecordSink, SinkError};

#[derive(Error, Debug)]
pub enum CycleError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("extraction failed for {url}: {source}")]
    Extract { url: String, source: ExtractError },
    #[error("sink rejected results for {url}: {source}")]
    Sink { url: String, source: SinkError },
    #[error("cursor commit failed for {url}: {source}")]
    Store { url: String, source: StoreError },
}

/// How a cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CycleOutcome {
    ShortCircuit,
    Unchanged,
    Changed,
}

/// A record that failed validation. Siblings are unaffected.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    /// Position in the extractor's output.
    pub index: usize,
    pub case_ref: Option<String>,
    pub error: ValidationError,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub url: String,
    pub outcome: CycleOutcome,
    pub emitted: usize,
    pub rejected: Vec<Rejection>,
    /// Stored cursor after the cycle.
    pub cursor: Cursor,
}

impl CycleReport {
    fn quiet(url: &str, outcome: CycleOutcome, cursor: Cursor) -> Self {
        Self {
            url: url.to_string(),
            outcome,
            emitted: 0,
            rejected: Vec::new(),
            cursor,
        }
    }
}

/// One async mutex per source URL, so two cycles for the same source never
/// interleave their read-compare-write of the cursor.
#[derive(Default)]
struct SourceLocks(Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>);

impl SourceLocks {
    fn lock_for(&self, url: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.0.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(url.to_string()).or_default().clone()
    }
}

/// Runs fetch cycles against a shared cursor store.
pub struct Controller<S> {
    store: Arc<S>,
    locks: SourceLocks,
}

impl<S: CursorStore> Controller<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            locks: SourceLocks::default(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run one cycle for the source at `url`.
    ///
    /// Accepted results are handed to `sink` before the new cursor is
    /// written; if the sink fails, the cursor is left alone.
    pub async fn run_cycle(
        &self,
        url: &str,
        fetcher: &dyn Fetcher,
        extractor: &dyn Extractor,
        sink: &mut dyn RecordSink,
    ) -> Result<CycleReport, CycleError> {
        let _guard = self.locks.lock_for(url).lock_owned().await;

        let previous = self.store.get(url);
        let hints = previous.hints();
        debug!(url, conditional = !hints.is_empty(), "requesting");

        let content = match fetcher.fetch(url, &hints).await? {
            FetchOutcome::NotModified => {
                info!(url, "no change (not modified)");
                return Ok(CycleReport::quiet(url, CycleOutcome::ShortCircuit, previous));
            }
            FetchOutcome::Fetched(content) => content,
        };

        let extract_err = |source: ExtractError| CycleError::Extract {
            url: url.to_string(),
            source,
        };

        let next = Cursor::derive_with(&content.headers, &content.body, || {
            extractor.listing_identifiers(&content)
        })
        .map_err(extract_err)?;

        if next.matches(&previous) {
            info!(url, tier = ?next.tier(), "no change (cursor match)");
            return Ok(CycleReport::quiet(url, CycleOutcome::Unchanged, previous));
        }

        let raw = extractor.extract_records(&content).map_err(extract_err)?;
        let (accepted, rejected) = validate_all(&content, raw);

        sink.emit(&accepted).map_err(|source| CycleError::Sink {
            url: url.to_string(),
            source,
        })?;

        self.store
            .put(url, next.clone())
            .map_err(|source| CycleError::Store {
                url: url.to_string(),
                source,
            })?;

        info!(
            url,
            format = extractor.format(),
            tier = ?next.tier(),
            emitted = accepted.len(),
            rejected = rejected.len(),
            "change processed"
        );
        Ok(CycleReport {
            url: url.to_string(),
            outcome: CycleOutcome::Changed,
            emitted: accepted.len(),
            rejected,
            cursor: next,
        })
    }
}

/// Validate every raw record against one fetch's provenance.
///
/// Each record is judged on its own; a failure only drops that record.
fn validate_all(
    content: &FetchedContent,
    raw: Vec<RawCase>,
) -> (Vec<CaseResult>, Vec<Rejection>) {
    let fetched_at = Utc::now().to_rfc3339();
    let body_sha = sha256_hex(&content.body);

    let mut accepted = Vec::with_capacity(raw.len());
    let mut rejected = Vec::new();
    for (index, record) in raw.into_iter().enumerate() {
        let source = source_payload(
            &content.url,
            &fetched_at,
            record.raw_sha256.as_deref().unwrap_or(&body_sha),
            record.artifact_key.as_deref(),
        );
        match CaseResult::from_parts(&record.payload, &source) {
            Ok(result) => accepted.push(result),
            Err(error) => {
                let case_ref = record
                    .payload
                    .get("case_ref")
                    .and_then(|v| v.as_str())
                    .map(str::to_string);
                warn!(
                    url = %content.url,
                    index,
                    case_ref = ?case_ref,
                    %error,
                    "record rejected"
                );
                rejected.push(Rejection {
                    index,
                    case_ref,
                    error,
                });
            }
        }
    }
    (accepted, rejected)
}
