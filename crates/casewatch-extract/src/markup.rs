//! Rendered HTML tables.
//!
//! Rows live under a configurable selector (default
//! `table#overages tbody tr`); the first five cells are
//! `property_id, owner, address, amount, sale_date`.

use casewatch_core::{ExtractError, Extractor, FetchedContent, RawCase};
use scraper::{Html, Selector};
use serde_json::Value;

use crate::common::{ListingRow, SourceProfile, case_payload, parse_amount};

const FORMAT: &str = "html";
const DEFAULT_ROW_SELECTOR: &str = "table#overages tbody tr";

pub struct HtmlTable {
    profile: SourceProfile,
    row_selector: String,
}

fn selector(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|e| ExtractError::Malformed {
        format: FORMAT,
        detail: format!("bad selector {css:?}: {e}"),
    })
}

impl HtmlTable {
    pub fn new(profile: SourceProfile) -> Self {
        Self {
            profile,
            row_selector: DEFAULT_ROW_SELECTOR.to_string(),
        }
    }

    /// Use a different row selector. Fails if `css` does not parse.
    pub fn with_row_selector(mut self, css: &str) -> Result<Self, ExtractError> {
        selector(css)?;
        self.row_selector = css.to_string();
        Ok(self)
    }

    /// Trimmed cell texts for every row.
    fn rows(&self, content: &FetchedContent) -> Result<Vec<Vec<String>>, ExtractError> {
        let document = Html::parse_document(content.text()?);
        let rows = selector(&self.row_selector)?;
        let cells = selector("td")?;
        Ok(document
            .select(&rows)
            .map(|row| {
                row.select(&cells)
                    .map(|cell| cell.text().collect::<String>().trim().to_string())
                    .collect()
            })
            .collect())
    }
}

impl Extractor for HtmlTable {
    fn format(&self) -> &'static str {
        FORMAT
    }

    fn listing_identifiers(&self, content: &FetchedContent) -> Result<Vec<String>, ExtractError> {
        Ok(self
            .rows(content)?
            .into_iter()
            .filter_map(|cells| cells.into_iter().next())
            .collect())
    }

    fn extract_records(&self, content: &FetchedContent) -> Result<Vec<RawCase>, ExtractError> {
        Ok(self
            .rows(content)?
            .iter()
            .filter(|cells| cells.len() >= 5)
            .map(|cells| {
                let listing = ListingRow {
                    property_id: &cells[0],
                    owner: &cells[1],
                    address: &cells[2],
                    amount: parse_amount(&cells[3]),
                    sale_date: &cells[4],
                    status: "open",
                };
                let raw = Value::Array(cells.iter().cloned().map(Value::String).collect());
                RawCase::new(case_payload(
                    &self.profile,
                    "HT",
                    "html_table",
                    &listing,
                    serde_json::json!({ "cells": raw }),
                ))
            })
            .collect())
    }
}
