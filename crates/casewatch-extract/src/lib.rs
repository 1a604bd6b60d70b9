//! Extraction adapters, one per source format.
//!
//! Adapters turn fetched bytes into listing identifiers and raw case
//! payloads. They never validate; that is the validator's job.

mod common;
pub mod document;
pub mod markup;
pub mod tabular;

pub use common::{SourceProfile, parse_address, parse_amount};
pub use document::{DocumentList, DocumentText, Utf8Text};
pub use markup::HtmlTable;
pub use tabular::CsvFeed;
