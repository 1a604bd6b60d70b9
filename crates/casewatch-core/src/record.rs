//! Canonical case record and provenance types.
//!
//! These types are `Serialize` only. The single way into them is through
//! [`crate::validate`], so nothing downstream of a fetch can hold a record
//! that skipped validation.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::hash::sha256_hex;
use crate::validate::{ValidationError, validate_record, validate_source};

/// Lifecycle status of a case.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseStatus {
    Open,
    Pending,
    Closed,
    #[default]
    Unknown,
}

impl CaseStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(Self::Open),
            "pending" => Some(Self::Pending),
            "closed" => Some(Self::Closed),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyRole {
    Plaintiff,
    Defendant,
    Owner,
    Other,
}

impl PartyRole {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "plaintiff" => Some(Self::Plaintiff),
            "defendant" => Some(Self::Defendant),
            "owner" => Some(Self::Owner),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Party {
    pub role: PartyRole,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Amount {
    #[serde(rename = "type")]
    pub kind: String,
    pub amount: f64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Address {
    pub line1: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    pub county_code: String,
}

/// The canonical output unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedCaseRecord {
    pub case_ref: String,
    pub state: String,
    pub county_code: String,
    pub source_system: String,
    pub filed_at: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sale_date: Option<NaiveDate>,
    pub status: CaseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_address: Option<Address>,
    pub parties: Vec<Party>,
    pub amounts: Vec<Amount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
}

/// Provenance of one fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceMetadata {
    pub url: String,
    /// ISO 8601 timestamp string, as validated.
    pub fetched_at: String,
    pub raw_sha256: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_key: Option<String>,
}

/// Untyped provenance payload in the shape [`validate_source`] accepts.
pub fn source_payload(
    url: &str,
    fetched_at: &str,
    raw_sha256: &str,
    artifact_key: Option<&str>,
) -> Value {
    let mut payload = json!({
        "url": url,
        "fetched_at": fetched_at,
        "raw_sha256": raw_sha256,
    });
    if let (Some(key), Value::Object(map)) = (artifact_key, &mut payload) {
        map.insert("artifact_key".into(), Value::String(key.to_string()));
    }
    payload
}

/// A validated record paired with its validated provenance.
///
/// Fields are private: a `CaseResult` can only be built from untyped
/// payloads via the validators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseResult {
    normalized_case: NormalizedCaseRecord,
    source: SourceMetadata,
}

impl CaseResult {
    /// Validate a record payload and a source payload into one pair.
    ///
    /// The record is checked first; its error wins when both are invalid.
    pub fn from_parts(record: &Value, source: &Value) -> Result<Self, ValidationError> {
        let normalized_case = validate_record(record)?;
        let source = validate_source(source)?;
        Ok(Self {
            normalized_case,
            source,
        })
    }

    /// Validate an envelope `{"normalized_case": {...}, "source": {...}}`.
    pub fn validate(envelope: &Value) -> Result<Self, ValidationError> {
        let obj = envelope
            .as_object()
            .ok_or_else(|| ValidationError::new("$", "result must be an object"))?;
        let empty = Value::Object(Map::new());
        let record = obj
            .get("normalized_case")
            .filter(|v| !v.is_null())
            .unwrap_or(&empty);
        let source = obj.get("source").filter(|v| !v.is_null()).unwrap_or(&empty);
        Self::from_parts(record, source)
    }

    pub fn normalized_case(&self) -> &NormalizedCaseRecord {
        &self.normalized_case
    }

    pub fn source(&self) -> &SourceMetadata {
        &self.source
    }

    /// Rebind the provenance hash to a narrower payload than the whole
    /// response.
    pub fn with_raw_sha(&self, body: &[u8]) -> Self {
        let mut next = self.clone();
        next.source.raw_sha256 = sha256_hex(body);
        next
    }

    pub fn into_parts(self) -> (NormalizedCaseRecord, SourceMetadata) {
        (self.normalized_case, self.source)
    }
}
