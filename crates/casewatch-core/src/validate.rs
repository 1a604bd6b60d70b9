//! Schema validation: the single gate between loosely-typed extractor
//! output and the canonical record types.
//!
//! Both entry points are total: they either return the canonical value or
//! a [`ValidationError`] naming the offending field. The only
//! normalisations applied are numeric amounts widened to `f64`, absent
//! optional fields left out, and `status` / `currency` defaulted when
//! absent. JSON `null` counts as absent.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::record::{
    Address, Amount, CaseStatus, NormalizedCaseRecord, Party, PartyRole, SourceMetadata,
};

static DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").expect("valid date pattern"));

static ZIP_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{5}(?:-[0-9]{4})?$").expect("valid zip pattern"));

const DEFAULT_CURRENCY: &str = "USD";

/// A record or provenance payload failed validation.
///
/// `field` is a path into the payload, e.g. `parties[1].role` or
/// `property_address.postal_code`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

type Result<T> = std::result::Result<T, ValidationError>;

// ── Field helpers ──

fn path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

fn as_object<'a>(value: &'a Value, field: &str) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| ValidationError::new(field, "must be an object"))
}

/// Field value, with `null` treated as absent.
fn present<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    obj.get(key).filter(|v| !v.is_null())
}

fn optional_str<'a>(
    obj: &'a Map<String, Value>,
    key: &str,
    field: &str,
) -> Result<Option<&'a str>> {
    match present(obj, key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(ValidationError::new(field, "must be a string")),
    }
}

fn required_str<'a>(obj: &'a Map<String, Value>, key: &str, field: &str) -> Result<&'a str> {
    match optional_str(obj, key, field)? {
        Some(s) if !s.trim().is_empty() => Ok(s),
        _ => Err(ValidationError::new(field, "is required")),
    }
}

fn check_len(value: &str, field: &str, min: usize, max: usize) -> Result<()> {
    let n = value.chars().count();
    if n < min || n > max {
        let message = if min == max {
            format!("must be {min} characters")
        } else {
            format!("must be {min}-{max} characters")
        };
        return Err(ValidationError::new(field, message));
    }
    Ok(())
}

fn parse_date(value: &str, field: &str) -> Result<NaiveDate> {
    if !DATE_PATTERN.is_match(value) {
        return Err(ValidationError::new(field, "must be YYYY-MM-DD"));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ValidationError::new(field, "is not a calendar date"))
}

fn is_iso8601(value: &str) -> bool {
    DateTime::parse_from_rfc3339(value).is_ok()
        || NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
        || NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f").is_ok()
        || (DATE_PATTERN.is_match(value) && NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok())
}

// ── Record ──

/// Validate and normalise one extracted case record.
///
/// Required scalars are checked first and fail fast on the first problem.
/// `parties` and `amounts` are then checked element by element; any bad
/// element fails the whole record. `property_address`, when present, must
/// satisfy its own required fields.
pub fn validate_record(payload: &Value) -> Result<NormalizedCaseRecord> {
    let obj = as_object(payload, "$")?;

    let case_ref = required_str(obj, "case_ref", "case_ref")?;
    let state = required_str(obj, "state", "state")?;
    check_len(state, "state", 2, 2)?;
    let county_code = required_str(obj, "county_code", "county_code")?;
    check_len(county_code, "county_code", 2, 12)?;
    let source_system = required_str(obj, "source_system", "source_system")?;
    let filed_at = parse_date(required_str(obj, "filed_at", "filed_at")?, "filed_at")?;
    let sale_date = optional_str(obj, "sale_date", "sale_date")?
        .map(|s| parse_date(s, "sale_date"))
        .transpose()?;
    let status = match optional_str(obj, "status", "status")? {
        None => CaseStatus::default(),
        Some(s) => CaseStatus::parse(s)
            .ok_or_else(|| ValidationError::new("status", format!("invalid value {s:?}")))?,
    };

    let parties = validate_parties(present(obj, "parties"))?;
    let amounts = validate_amounts(present(obj, "amounts"))?;
    let property_address = present(obj, "property_address")
        .map(|v| validate_address(v, "property_address"))
        .transpose()?;

    let metadata = match present(obj, "metadata") {
        None => None,
        Some(Value::Object(map)) => Some(map.clone()),
        Some(_) => return Err(ValidationError::new("metadata", "must be an object")),
    };
    let raw = present(obj, "raw").cloned();

    Ok(NormalizedCaseRecord {
        case_ref: case_ref.to_string(),
        state: state.to_string(),
        county_code: county_code.to_string(),
        source_system: source_system.to_string(),
        filed_at,
        sale_date,
        status,
        property_address,
        parties,
        amounts,
        metadata,
        raw,
    })
}

fn as_list<'a>(value: Option<&'a Value>, field: &str) -> Result<&'a [Value]> {
    match value {
        None => Ok(&[]),
        Some(Value::Array(items)) => Ok(items.as_slice()),
        Some(_) => Err(ValidationError::new(field, "must be a list")),
    }
}

fn validate_parties(value: Option<&Value>) -> Result<Vec<Party>> {
    let items = as_list(value, "parties")?;
    let mut parties = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let prefix = format!("parties[{i}]");
        let obj = as_object(item, &prefix)?;
        let role_field = path(&prefix, "role");
        let role = optional_str(obj, "role", &role_field)?
            .and_then(PartyRole::parse)
            .ok_or_else(|| ValidationError::new(&role_field, "is invalid"))?;
        let name = required_str(obj, "name", &path(&prefix, "name"))?;
        let contact = optional_str(obj, "contact", &path(&prefix, "contact"))?;
        parties.push(Party {
            role,
            name: name.to_string(),
            contact: contact.map(str::to_string),
        });
    }
    Ok(parties)
}

fn validate_amounts(value: Option<&Value>) -> Result<Vec<Amount>> {
    let items = as_list(value, "amounts")?;
    let mut amounts = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let prefix = format!("amounts[{i}]");
        let obj = as_object(item, &prefix)?;
        let kind = required_str(obj, "type", &path(&prefix, "type"))?;

        let amount_field = path(&prefix, "amount");
        let amount = present(obj, "amount")
            .and_then(Value::as_f64)
            .filter(|n| n.is_finite() && *n >= 0.0)
            .ok_or_else(|| ValidationError::new(&amount_field, "must be a non-negative number"))?;

        let currency_field = path(&prefix, "currency");
        let currency = optional_str(obj, "currency", &currency_field)?.unwrap_or(DEFAULT_CURRENCY);
        check_len(currency, &currency_field, 3, 3)?;

        amounts.push(Amount {
            kind: kind.to_string(),
            amount,
            currency: currency.to_string(),
        });
    }
    Ok(amounts)
}

fn validate_address(value: &Value, prefix: &str) -> Result<Address> {
    let obj = as_object(value, prefix)?;
    let line1 = required_str(obj, "line1", &path(prefix, "line1"))?;
    let city = required_str(obj, "city", &path(prefix, "city"))?;
    let state_field = path(prefix, "state");
    let state = required_str(obj, "state", &state_field)?;
    check_len(state, &state_field, 2, 2)?;
    let county_field = path(prefix, "county_code");
    let county_code = required_str(obj, "county_code", &county_field)?;
    check_len(county_code, &county_field, 2, 12)?;

    let postal_field = path(prefix, "postal_code");
    let postal_code = optional_str(obj, "postal_code", &postal_field)?;
    if let Some(zip) = postal_code
        && !ZIP_PATTERN.is_match(zip)
    {
        return Err(ValidationError::new(postal_field, "must be a 5 or 5+4 digit ZIP"));
    }
    let line2 = optional_str(obj, "line2", &path(prefix, "line2"))?.filter(|s| !s.is_empty());

    Ok(Address {
        line1: line1.to_string(),
        line2: line2.map(str::to_string),
        city: city.to_string(),
        state: state.to_string(),
        postal_code: postal_code.map(str::to_string),
        county_code: county_code.to_string(),
    })
}

// ── Source ──

/// Validate provenance metadata for one fetch.
pub fn validate_source(payload: &Value) -> Result<SourceMetadata> {
    let obj = as_object(payload, "$")?;

    let raw_url = required_str(obj, "url", "url")?;
    match url::Url::parse(raw_url) {
        Ok(u) if matches!(u.scheme(), "http" | "https") => {}
        _ => return Err(ValidationError::new("url", "must be an http(s) URL")),
    }

    let fetched_at = required_str(obj, "fetched_at", "fetched_at")?;
    if !is_iso8601(fetched_at) {
        return Err(ValidationError::new("fetched_at", "must be ISO-8601"));
    }

    let raw_sha256 = required_str(obj, "raw_sha256", "raw_sha256")?;
    let artifact_key = optional_str(obj, "artifact_key", "artifact_key")?;

    Ok(SourceMetadata {
        url: raw_url.to_string(),
        fetched_at: fetched_at.to_string(),
        raw_sha256: raw_sha256.to_string(),
        artifact_key: artifact_key.map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_record() -> Value {
        json!({
            "case_ref": "HT-R1001",
            "state": "TX",
            "county_code": "TRAVIS",
            "source_system": "html_table_overages",
            "filed_at": "2024-03-01",
            "sale_date": "2024-03-01",
            "status": "open",
            "property_address": {
                "line1": "123 Main St",
                "city": "Austin",
                "state": "TX",
                "county_code": "TRAVIS",
                "postal_code": "78701"
            },
            "parties": [{"role": "owner", "name": "Jane Doe"}],
            "amounts": [{"type": "surplus", "amount": 1250.75}],
            "metadata": {"property_id": "R1001", "record_format": "html_table"}
        })
    }

    fn with(mut base: Value, key: &str, value: Value) -> Value {
        base.as_object_mut().unwrap().insert(key.into(), value);
        base
    }

    fn without(mut base: Value, key: &str) -> Value {
        base.as_object_mut().unwrap().remove(key);
        base
    }

    fn err_field(payload: &Value) -> String {
        validate_record(payload).unwrap_err().field
    }

    #[test]
    fn full_record_validates() {
        let record = validate_record(&full_record()).unwrap();
        assert_eq!(record.case_ref, "HT-R1001");
        assert_eq!(record.status, CaseStatus::Open);
        assert_eq!(record.amounts[0].currency, "USD");
        assert_eq!(record.amounts[0].amount, 1250.75);
        let address = record.property_address.unwrap();
        assert_eq!(address.postal_code.as_deref(), Some("78701"));
        assert_eq!(address.line2, None);
    }

    #[test]
    fn defaults_applied_when_absent() {
        let minimal = json!({
            "case_ref": "ABC-123",
            "state": "TX",
            "county_code": "201",
            "source_system": "dummy",
            "filed_at": "2023-12-31"
        });
        let record = validate_record(&minimal).unwrap();
        assert_eq!(record.status, CaseStatus::Unknown);
        assert!(record.parties.is_empty());
        assert!(record.amounts.is_empty());
        assert!(record.sale_date.is_none());
        assert!(record.metadata.is_none());

        let value = serde_json::to_value(&record).unwrap();
        let obj = value.as_object().unwrap();
        assert!(!obj.contains_key("sale_date"));
        assert!(!obj.contains_key("property_address"));
        assert!(!obj.contains_key("raw"));
    }

    #[test]
    fn rejects_missing_case_ref() {
        assert_eq!(err_field(&without(full_record(), "case_ref")), "case_ref");
        assert_eq!(err_field(&with(full_record(), "case_ref", json!("   "))), "case_ref");
    }

    #[test]
    fn rejects_bad_state_code() {
        assert_eq!(err_field(&with(full_record(), "state", json!("TEX"))), "state");
        assert_eq!(err_field(&with(full_record(), "state", json!("T"))), "state");
    }

    #[test]
    fn rejects_bad_county_code() {
        assert_eq!(err_field(&with(full_record(), "county_code", json!("X"))), "county_code");
        assert_eq!(
            err_field(&with(full_record(), "county_code", json!("ABCDEFGHIJKLM"))),
            "county_code"
        );
    }

    #[test]
    fn rejects_unknown_status() {
        let err = validate_record(&with(full_record(), "status", json!("archived"))).unwrap_err();
        assert_eq!(err.field, "status");
        assert!(err.message.contains("archived"));
    }

    #[test]
    fn rejects_bad_dates() {
        assert_eq!(err_field(&with(full_record(), "filed_at", json!("03/01/2024"))), "filed_at");
        assert_eq!(err_field(&with(full_record(), "filed_at", json!("2024-02-30"))), "filed_at");
        assert_eq!(err_field(&with(full_record(), "sale_date", json!("2024-3-1"))), "sale_date");
        assert_eq!(err_field(&with(full_record(), "sale_date", json!(20240301))), "sale_date");
    }

    #[test]
    fn non_ascii_digits_rejected() {
        let mut payload = full_record();
        payload["property_address"]["postal_code"] = json!("٧٨٧٠١");
        assert_eq!(err_field(&payload), "property_address.postal_code");

        let mut payload = full_record();
        payload["property_address"]["postal_code"] = json!("78701-١٢٣٤");
        assert_eq!(err_field(&payload), "property_address.postal_code");

        let payload = with(full_record(), "filed_at", json!("٢٠٢٤-03-01"));
        assert_eq!(err_field(&payload), "filed_at");
    }

    #[test]
    fn first_failing_required_field_wins() {
        let payload = with(without(full_record(), "case_ref"), "state", json!("TEX"));
        assert_eq!(err_field(&payload), "case_ref");
    }

    #[test]
    fn rejects_invalid_party_role() {
        let payload = with(
            full_record(),
            "parties",
            json!([
                {"role": "owner", "name": "Jane Doe"},
                {"role": "landlord", "name": "Acme"}
            ]),
        );
        assert_eq!(err_field(&payload), "parties[1].role");
    }

    #[test]
    fn rejects_unnamed_party() {
        let payload = with(full_record(), "parties", json!([{"role": "owner", "name": ""}]));
        assert_eq!(err_field(&payload), "parties[0].name");
    }

    #[test]
    fn rejects_negative_amount() {
        let payload = with(full_record(), "amounts", json!([{"type": "surplus", "amount": -1}]));
        assert_eq!(err_field(&payload), "amounts[0].amount");
    }

    #[test]
    fn rejects_non_numeric_amount_and_bad_currency() {
        let payload = with(full_record(), "amounts", json!([{"type": "surplus", "amount": "10"}]));
        assert_eq!(err_field(&payload), "amounts[0].amount");
        let payload = with(
            full_record(),
            "amounts",
            json!([{"type": "surplus", "amount": 10, "currency": "US"}]),
        );
        assert_eq!(err_field(&payload), "amounts[0].currency");
        let payload = with(full_record(), "amounts", json!([{"amount": 10}]));
        assert_eq!(err_field(&payload), "amounts[0].type");
    }

    #[test]
    fn integer_amounts_widen_to_float() {
        let payload = with(
            full_record(),
            "amounts",
            json!([{"type": "surplus", "amount": 3500, "currency": "CAD"}]),
        );
        let record = validate_record(&payload).unwrap();
        assert_eq!(record.amounts[0].amount, 3500.0);
        assert_eq!(record.amounts[0].currency, "CAD");
    }

    #[test]
    fn collections_must_be_lists_of_objects() {
        assert_eq!(err_field(&with(full_record(), "parties", json!("owner"))), "parties");
        assert_eq!(err_field(&with(full_record(), "amounts", json!([5]))), "amounts[0]");
    }

    #[test]
    fn null_collections_are_empty() {
        let payload = with(with(full_record(), "parties", Value::Null), "amounts", Value::Null);
        let record = validate_record(&payload).unwrap();
        assert!(record.parties.is_empty());
        assert!(record.amounts.is_empty());
    }

    #[test]
    fn address_failures_fail_the_record() {
        let mut payload = full_record();
        payload["property_address"]["city"] = json!("");
        assert_eq!(err_field(&payload), "property_address.city");

        let mut payload = full_record();
        payload["property_address"]["postal_code"] = json!("7870");
        assert_eq!(err_field(&payload), "property_address.postal_code");

        let mut payload = full_record();
        payload["property_address"]["state"] = json!("Texas");
        assert_eq!(err_field(&payload), "property_address.state");

        let payload = with(full_record(), "property_address", json!("123 Main St"));
        assert_eq!(err_field(&payload), "property_address");
    }

    #[test]
    fn zip_plus_four_and_line2_accepted() {
        let mut payload = full_record();
        payload["property_address"]["postal_code"] = json!("78701-1234");
        payload["property_address"]["line2"] = json!("Unit 4");
        let address = validate_record(&payload).unwrap().property_address.unwrap();
        assert_eq!(address.postal_code.as_deref(), Some("78701-1234"));
        assert_eq!(address.line2.as_deref(), Some("Unit 4"));
    }

    #[test]
    fn metadata_must_be_a_mapping() {
        assert_eq!(err_field(&with(full_record(), "metadata", json!([1]))), "metadata");
    }

    #[test]
    fn raw_passes_through_opaque() {
        let payload = with(full_record(), "raw", json!({"cells": ["R1001", "Jane Doe"]}));
        let record = validate_record(&payload).unwrap();
        assert_eq!(record.raw, Some(json!({"cells": ["R1001", "Jane Doe"]})));
    }

    #[test]
    fn validated_record_round_trips() {
        let payload = with(full_record(), "raw", json!({"row": 1}));
        let first = validate_record(&payload).unwrap();
        let serialized = serde_json::to_value(&first).unwrap();
        let second = validate_record(&serialized).unwrap();
        assert_eq!(first, second);
        assert_eq!(serde_json::to_value(&second).unwrap(), serialized);
    }

    #[test]
    fn non_object_payload_rejected() {
        assert_eq!(validate_record(&json!("case")).unwrap_err().field, "$");
    }

    // ── Source ──

    fn source() -> Value {
        json!({
            "url": "https://data.example.gov/overages/csv-feed",
            "fetched_at": "2024-03-02T10:00:00.123456+00:00",
            "raw_sha256": "abc123"
        })
    }

    #[test]
    fn source_validates() {
        let meta = validate_source(&source()).unwrap();
        assert_eq!(meta.url, "https://data.example.gov/overages/csv-feed");
        assert_eq!(meta.artifact_key, None);
    }

    #[test]
    fn source_accepts_common_iso_forms() {
        for ts in [
            "2024-03-02T10:00:00Z",
            "2024-03-02T10:00:00",
            "2024-03-02 10:00:00",
            "2024-03-02",
        ] {
            assert!(
                validate_source(&with(source(), "fetched_at", json!(ts))).is_ok(),
                "{ts} should parse"
            );
        }
    }

    #[test]
    fn source_rejects_bad_fields() {
        let field = |p: Value| validate_source(&p).unwrap_err().field;
        assert_eq!(field(with(source(), "url", json!("ftp://example.gov/x"))), "url");
        assert_eq!(field(with(source(), "url", json!("not a url"))), "url");
        assert_eq!(field(with(source(), "fetched_at", json!("yesterday"))), "fetched_at");
        assert_eq!(field(with(source(), "raw_sha256", json!(""))), "raw_sha256");
        assert_eq!(field(without(source(), "raw_sha256")), "raw_sha256");
    }

    #[test]
    fn artifact_key_passes_through() {
        let meta = validate_source(&with(source(), "artifact_key", json!("pdf_list.pdf"))).unwrap();
        assert_eq!(meta.artifact_key.as_deref(), Some("pdf_list.pdf"));
    }
}
