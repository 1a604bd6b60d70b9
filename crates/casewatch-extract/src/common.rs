//! Helpers shared by the adapters.

use serde_json::{Map, Value, json};

/// Jurisdiction and naming shared by every record from one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceProfile {
    pub state: String,
    pub county_code: String,
    pub source_system: String,
}

impl SourceProfile {
    pub fn new(
        state: impl Into<String>,
        county_code: impl Into<String>,
        source_system: impl Into<String>,
    ) -> Self {
        Self {
            state: state.into(),
            county_code: county_code.into(),
            source_system: source_system.into(),
        }
    }
}

/// Parse `"123 Main St, Austin, TX 78701"` into an address payload.
///
/// Missing pieces stay empty (and will fail validation); the state falls
/// back to the profile's state when the third segment is missing.
pub fn parse_address(raw: &str, profile: &SourceProfile) -> Value {
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    let line1 = parts.first().copied().unwrap_or(raw);
    let city = parts.get(1).copied().unwrap_or("");
    let mut state_zip = parts.get(2).copied().unwrap_or("").split_whitespace();
    let state = state_zip.next().unwrap_or(profile.state.as_str());
    let postal = state_zip.next();

    let mut address = Map::new();
    address.insert("line1".into(), line1.into());
    address.insert("city".into(), city.into());
    address.insert("state".into(), state.into());
    address.insert("county_code".into(), profile.county_code.as_str().into());
    if let Some(zip) = postal {
        address.insert("postal_code".into(), zip.into());
    }
    Value::Object(address)
}

/// Parse a currency-formatted amount such as `"$1,250.75"`.
///
/// Everything but digits and `.` is dropped; anything unparseable is `0.0`.
pub fn parse_amount(text: &str) -> f64 {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    cleaned.parse().unwrap_or(0.0)
}

/// One row of a surplus listing, whatever the format.
pub(crate) struct ListingRow<'a> {
    pub property_id: &'a str,
    pub owner: &'a str,
    pub address: &'a str,
    pub amount: f64,
    pub sale_date: &'a str,
    pub status: &'a str,
}

/// Raw case payload for a listing row, in the validator's input shape.
pub(crate) fn case_payload(
    profile: &SourceProfile,
    ref_prefix: &str,
    record_format: &str,
    row: &ListingRow<'_>,
    raw: Value,
) -> Value {
    json!({
        "case_ref": format!("{ref_prefix}-{}", row.property_id),
        "state": profile.state,
        "county_code": profile.county_code,
        "source_system": profile.source_system,
        "filed_at": row.sale_date,
        "sale_date": row.sale_date,
        "status": row.status,
        "property_address": parse_address(row.address, profile),
        "parties": [{ "role": "owner", "name": row.owner }],
        "amounts": [{ "type": "surplus", "amount": row.amount }],
        "metadata": { "property_id": row.property_id, "record_format": record_format },
        "raw": raw,
    })
}
