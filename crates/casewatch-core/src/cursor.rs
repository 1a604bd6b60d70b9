//! Per-source cursor: the last observed state of one watched source.
//!
//! A cursor is derived from exactly one evidence tier, chosen by priority:
//!
//! 1. transport validators (`ETag` / `Last-Modified`)
//! 2. listing fingerprint (hash over the set of listing entry identifiers)
//! 3. artifact hash (SHA-256 of the whole response body)
//!
//! Comparison walks the same tiers in the same order and decides on the
//! first tier both sides carry. When no tier is comparable the answer is
//! "changed".

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::hash::{listing_fingerprint, sha256_hex};
use crate::headers::Headers;

/// Which evidence tier a cursor was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CursorTier {
    Validators,
    ListingFingerprint,
    ArtifactHash,
}

/// Last known state of a watched source.
///
/// The variants make mixing tiers within one cursor unrepresentable. The
/// persisted form is the flat field set `{etag, last_modified,
/// list_fingerprint, artifact_sha256}` with absent fields omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "CursorFields", into = "CursorFields")]
pub enum Cursor {
    /// Nothing stored yet for this source.
    #[default]
    Empty,
    /// At least one of the two validators is set.
    Validators {
        etag: Option<String>,
        last_modified: Option<String>,
    },
    Listing { list_fingerprint: String },
    Artifact { artifact_sha256: String },
}

/// Flat on-disk representation of a [`Cursor`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CursorFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    etag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_modified: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    list_fingerprint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    artifact_sha256: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl From<CursorFields> for Cursor {
    /// Persisted state written by older tools may carry several tiers; the
    /// highest-priority one wins.
    fn from(fields: CursorFields) -> Self {
        let etag = non_empty(fields.etag);
        let last_modified = non_empty(fields.last_modified);
        if etag.is_some() || last_modified.is_some() {
            return Cursor::Validators {
                etag,
                last_modified,
            };
        }
        if let Some(list_fingerprint) = non_empty(fields.list_fingerprint) {
            return Cursor::Listing { list_fingerprint };
        }
        if let Some(artifact_sha256) = non_empty(fields.artifact_sha256) {
            return Cursor::Artifact { artifact_sha256 };
        }
        Cursor::Empty
    }
}

impl From<Cursor> for CursorFields {
    fn from(cursor: Cursor) -> Self {
        match cursor {
            Cursor::Empty => CursorFields::default(),
            Cursor::Validators {
                etag,
                last_modified,
            } => CursorFields {
                etag,
                last_modified,
                ..Default::default()
            },
            Cursor::Listing { list_fingerprint } => CursorFields {
                list_fingerprint: Some(list_fingerprint),
                ..Default::default()
            },
            Cursor::Artifact { artifact_sha256 } => CursorFields {
                artifact_sha256: Some(artifact_sha256),
                ..Default::default()
            },
        }
    }
}

/// Conditional-request hints for the fetcher. Advisory only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionalHints {
    pub if_none_match: Option<String>,
    pub if_modified_since: Option<String>,
}

impl ConditionalHints {
    pub fn is_empty(&self) -> bool {
        self.if_none_match.is_none() && self.if_modified_since.is_none()
    }

    /// Hints as HTTP request header pairs.
    pub fn header_pairs(&self) -> Vec<(&'static str, &str)> {
        let mut pairs = Vec::with_capacity(2);
        if let Some(v) = &self.if_none_match {
            pairs.push(("If-None-Match", v.as_str()));
        }
        if let Some(v) = &self.if_modified_since {
            pairs.push(("If-Modified-Since", v.as_str()));
        }
        pairs
    }
}

impl Cursor {
    /// Cursor built from transport validators only, if the response has any.
    pub fn from_validators(headers: &Headers) -> Option<Cursor> {
        let etag = headers.get_non_empty("etag").map(str::to_string);
        let last_modified = headers.get_non_empty("last-modified").map(str::to_string);
        if etag.is_none() && last_modified.is_none() {
            return None;
        }
        Some(Cursor::Validators {
            etag,
            last_modified,
        })
    }

    /// Derive a cursor from a fetched response, taking the highest-priority
    /// signal available.
    pub fn derive<S: AsRef<str>>(headers: &Headers, body: &[u8], identifiers: &[S]) -> Cursor {
        let owned = || {
            Ok::<_, std::convert::Infallible>(
                identifiers.iter().map(|s| s.as_ref().to_string()).collect(),
            )
        };
        match Self::derive_with(headers, body, owned) {
            Ok(cursor) => cursor,
            Err(never) => match never {},
        }
    }

    /// Like [`derive`](Self::derive), but listing identifiers are only
    /// computed when no validator is present.
    pub fn derive_with<E>(
        headers: &Headers,
        body: &[u8],
        identifiers: impl FnOnce() -> Result<Vec<String>, E>,
    ) -> Result<Cursor, E> {
        if let Some(cursor) = Self::from_validators(headers) {
            debug!(tier = ?CursorTier::Validators, "cursor derived");
            return Ok(cursor);
        }
        if let Some(list_fingerprint) = listing_fingerprint(&identifiers()?) {
            debug!(tier = ?CursorTier::ListingFingerprint, "cursor derived");
            return Ok(Cursor::Listing { list_fingerprint });
        }
        debug!(tier = ?CursorTier::ArtifactHash, "cursor derived");
        Ok(Cursor::Artifact {
            artifact_sha256: sha256_hex(body),
        })
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cursor::Empty)
    }

    pub fn tier(&self) -> Option<CursorTier> {
        match self {
            Cursor::Empty => None,
            Cursor::Validators { .. } => Some(CursorTier::Validators),
            Cursor::Listing { .. } => Some(CursorTier::ListingFingerprint),
            Cursor::Artifact { .. } => Some(CursorTier::ArtifactHash),
        }
    }

    pub fn etag(&self) -> Option<&str> {
        match self {
            Cursor::Validators { etag, .. } => etag.as_deref(),
            _ => None,
        }
    }

    pub fn last_modified(&self) -> Option<&str> {
        match self {
            Cursor::Validators { last_modified, .. } => last_modified.as_deref(),
            _ => None,
        }
    }

    pub fn list_fingerprint(&self) -> Option<&str> {
        match self {
            Cursor::Listing { list_fingerprint } => Some(list_fingerprint),
            _ => None,
        }
    }

    pub fn artifact_sha256(&self) -> Option<&str> {
        match self {
            Cursor::Artifact { artifact_sha256 } => Some(artifact_sha256),
            _ => None,
        }
    }

    /// Conditional-request hints derived from the validator fields.
    pub fn hints(&self) -> ConditionalHints {
        ConditionalHints {
            if_none_match: self.etag().map(str::to_string),
            if_modified_since: self.last_modified().map(str::to_string),
        }
    }

    /// Whether `self` (freshly derived) describes the same content as
    /// `previous` (stored).
    ///
    /// Decides on the first comparable tier: etag, then last-modified
    /// (together the validator tier), then listing fingerprint, then
    /// artifact hash. Lower tiers are never consulted once a comparable
    /// tier is found. No comparable tier means "changed".
    pub fn matches(&self, previous: &Cursor) -> bool {
        let tiers = [
            (self.etag(), previous.etag()),
            (self.last_modified(), previous.last_modified()),
            (self.list_fingerprint(), previous.list_fingerprint()),
            (self.artifact_sha256(), previous.artifact_sha256()),
        ];
        for (current, stored) in tiers {
            if let (Some(current), Some(stored)) = (current, stored) {
                return current == stored;
            }
        }
        false
    }
}
