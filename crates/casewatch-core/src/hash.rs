//! SHA-256 helpers used for body hashes and listing fingerprints.

use std::collections::BTreeSet;

use ring::digest::{SHA256, digest};

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(digest(&SHA256, bytes))
}

/// Fingerprint a listing by its entry identifiers.
///
/// Identifiers are trimmed, de-duplicated and sorted, then encoded as a
/// compact JSON array before hashing, so row order and incidental
/// whitespace never change the result. Returns `None` when no non-empty
/// identifier remains.
pub fn listing_fingerprint<S: AsRef<str>>(identifiers: &[S]) -> Option<String> {
    let set: BTreeSet<&str> = identifiers
        .iter()
        .map(|s| s.as_ref().trim())
        .filter(|s| !s.is_empty())
        .collect();
    if set.is_empty() {
        return None;
    }
    let canonical = serde_json::to_string(&set).ok()?;
    Some(sha256_hex(canonical.as_bytes()))
}
