//! Document listings (e.g. a published PDF of surplus funds).
//!
//! Getting text out of the binary document is a separate capability,
//! [`DocumentText`]. The adapter works on the text: one row per line
//! containing `|`, fields `property_id | owner | address | sale_date |
//! amount`, header lines (`Property ID | ...`) skipped. Every record is
//! tagged with the document's artifact key.

use casewatch_core::{ExtractError, Extractor, FetchedContent, RawCase};
use serde_json::json;

use crate::common::{ListingRow, SourceProfile, case_payload, parse_amount};

const FORMAT: &str = "document";
const DEFAULT_ARTIFACT_KEY: &str = "pdf_list.pdf";
const HEADER_MARKER: &str = "Property ID";

/// Text rendition of a binary document.
pub trait DocumentText: Send + Sync {
    fn text(&self, body: &[u8]) -> Result<String, ExtractError>;
}

/// Treat the body as UTF-8 text already.
#[derive(Debug, Clone, Copy, Default)]
pub struct Utf8Text;

impl DocumentText for Utf8Text {
    fn text(&self, body: &[u8]) -> Result<String, ExtractError> {
        Ok(std::str::from_utf8(body)?.to_string())
    }
}

pub struct DocumentList<T = Utf8Text> {
    profile: SourceProfile,
    text: T,
    artifact_key: String,
}

impl DocumentList<Utf8Text> {
    pub fn new(profile: SourceProfile) -> Self {
        Self::with_text(profile, Utf8Text)
    }
}

impl<T: DocumentText> DocumentList<T> {
    pub fn with_text(profile: SourceProfile, text: T) -> Self {
        Self {
            profile,
            text,
            artifact_key: DEFAULT_ARTIFACT_KEY.to_string(),
        }
    }

    pub fn with_artifact_key(mut self, key: impl Into<String>) -> Self {
        self.artifact_key = key.into();
        self
    }

    fn rows(&self, content: &FetchedContent) -> Result<Vec<[String; 5]>, ExtractError> {
        let text = self.text.text(&content.body)?;
        Ok(text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && line.contains('|') && !line.contains(HEADER_MARKER))
            .filter_map(|line| {
                let parts: Vec<&str> = line.split('|').map(str::trim).collect();
                match parts.as_slice() {
                    [id, owner, address, sale_date, amount, ..] => Some([
                        id.to_string(),
                        owner.to_string(),
                        address.to_string(),
                        sale_date.to_string(),
                        amount.to_string(),
                    ]),
                    _ => None,
                }
            })
            .collect())
    }
}

impl<T: DocumentText> Extractor for DocumentList<T> {
    fn format(&self) -> &'static str {
        FORMAT
    }

    fn listing_identifiers(&self, content: &FetchedContent) -> Result<Vec<String>, ExtractError> {
        Ok(self
            .rows(content)?
            .into_iter()
            .map(|[id, ..]| id)
            .collect())
    }

    fn extract_records(&self, content: &FetchedContent) -> Result<Vec<RawCase>, ExtractError> {
        Ok(self
            .rows(content)?
            .iter()
            .map(|[id, owner, address, sale_date, amount]| {
                let listing = ListingRow {
                    property_id: id,
                    owner,
                    address,
                    amount: parse_amount(amount),
                    sale_date,
                    status: "pending",
                };
                let raw = json!({ "line": [id, owner, address, sale_date, amount] });
                RawCase::new(case_payload(&self.profile, "PDF", "pdf_list", &listing, raw))
                    .with_artifact_key(self.artifact_key.as_str())
            })
            .collect())
    }
}
