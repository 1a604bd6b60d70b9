//! Tabular (CSV) feeds, read through Arrow's CSV reader.
//!
//! Expected header: `property_id, owner, address, amount, sale_date, status`.
//! Column order does not matter; every column is read as UTF-8.

use std::collections::BTreeMap;
use std::io::Cursor;
use std::sync::Arc;

use arrow::array::{Array, StringArray};
use arrow::csv::ReaderBuilder;
use arrow::csv::reader::Format;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use casewatch_core::{ExtractError, Extractor, FetchedContent, RawCase};
use serde_json::{Map, Value};
use tracing::debug;

use crate::common::{ListingRow, SourceProfile, case_payload, parse_amount};

const FORMAT: &str = "csv";

/// CSV feed adapter.
pub struct CsvFeed {
    profile: SourceProfile,
}

type Row = BTreeMap<String, String>;

fn malformed(e: ArrowError) -> ExtractError {
    ExtractError::Malformed {
        format: FORMAT,
        detail: e.to_string(),
    }
}

impl CsvFeed {
    pub fn new(profile: SourceProfile) -> Self {
        Self { profile }
    }

    /// Parse the body into rows keyed by (trimmed) header name.
    fn rows(&self, content: &FetchedContent) -> Result<Vec<Row>, ExtractError> {
        let text = content.text()?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        // Short rows are kept; their missing trailing cells read as null.
        let format = Format::default()
            .with_header(true)
            .with_truncated_rows(true);
        let (inferred, _) = format
            .infer_schema(Cursor::new(text.as_bytes()), Some(0))
            .map_err(malformed)?;
        let fields: Vec<Field> = inferred
            .fields()
            .iter()
            .map(|f| Field::new(f.name(), DataType::Utf8, true))
            .collect();
        let schema = Arc::new(Schema::new(fields));

        let reader = ReaderBuilder::new(schema)
            .with_header(true)
            .with_truncated_rows(true)
            .build(Cursor::new(text.as_bytes()))
            .map_err(malformed)?;

        let mut rows = Vec::new();
        for batch in reader {
            rows.extend(rows_from_batch(&batch.map_err(malformed)?));
        }
        debug!(url = %content.url, rows = rows.len(), "parsed csv feed");
        Ok(rows)
    }
}

fn rows_from_batch(batch: &RecordBatch) -> Vec<Row> {
    let schema = batch.schema();
    let columns: Vec<(&str, Option<&StringArray>)> = schema
        .fields()
        .iter()
        .zip(batch.columns())
        .map(|(field, col)| {
            (
                field.name().trim(),
                col.as_any().downcast_ref::<StringArray>(),
            )
        })
        .collect();

    (0..batch.num_rows())
        .map(|row| {
            columns
                .iter()
                .map(|(name, col)| {
                    let value = match col {
                        Some(arr) if !arr.is_null(row) => arr.value(row).trim().to_string(),
                        _ => String::new(),
                    };
                    (name.to_string(), value)
                })
                .collect()
        })
        .collect()
}

fn cell<'a>(row: &'a Row, name: &str) -> &'a str {
    row.get(name).map(String::as_str).unwrap_or("")
}

impl Extractor for CsvFeed {
    fn format(&self) -> &'static str {
        FORMAT
    }

    fn listing_identifiers(&self, content: &FetchedContent) -> Result<Vec<String>, ExtractError> {
        Ok(self
            .rows(content)?
            .iter()
            .map(|row| cell(row, "property_id").to_string())
            .filter(|id| !id.is_empty())
            .collect())
    }

    fn extract_records(&self, content: &FetchedContent) -> Result<Vec<RawCase>, ExtractError> {
        let records = self
            .rows(content)?
            .iter()
            .map(|row| {
                let status = match cell(row, "status") {
                    "" => "unknown",
                    s => s,
                };
                let listing = ListingRow {
                    property_id: cell(row, "property_id"),
                    owner: cell(row, "owner"),
                    address: cell(row, "address"),
                    amount: parse_amount(cell(row, "amount")),
                    sale_date: cell(row, "sale_date"),
                    status,
                };
                let raw: Map<String, Value> = row
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect();
                RawCase::new(case_payload(
                    &self.profile,
                    "CSV",
                    "csv_feed",
                    &listing,
                    Value::Object(raw),
                ))
            })
            .collect();
        Ok(records)
    }
}
