//! Destinations for validated results.

use std::io::Write;

use casewatch_core::CaseResult;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Receives each cycle's accepted results before the cycle commits its
/// cursor. An error here aborts the commit.
pub trait RecordSink: Send {
    fn emit(&mut self, results: &[CaseResult]) -> Result<(), SinkError>;
}

/// Collects results in memory.
#[derive(Debug, Default)]
pub struct VecSink {
    pub results: Vec<CaseResult>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordSink for VecSink {
    fn emit(&mut self, results: &[CaseResult]) -> Result<(), SinkError> {
        self.results.extend_from_slice(results);
        Ok(())
    }
}

/// Writes one JSON object per result per line.
pub struct JsonLinesSink<W> {
    writer: W,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> RecordSink for JsonLinesSink<W> {
    fn emit(&mut self, results: &[CaseResult]) -> Result<(), SinkError> {
        for result in results {
            serde_json::to_writer(&mut self.writer, result)?;
            self.writer.write_all(b"\n")?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result(case_ref: &str) -> CaseResult {
        CaseResult::validate(&json!({
            "normalized_case": {
                "case_ref": case_ref,
                "state": "CA",
                "county_code": "001",
                "source_system": "example_watch",
                "filed_at": "2024-01-01"
            },
            "source": {
                "url": "https://example.org/watch",
                "fetched_at": "2024-01-02T00:00:00+00:00",
                "raw_sha256": "abc"
            }
        }))
        .unwrap()
    }

    #[test]
    fn json_lines_one_per_result() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.emit(&[result("A-1"), result("A-2")]).unwrap();
        let out = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["normalized_case"]["case_ref"], "A-2");
        assert_eq!(second["source"]["raw_sha256"], "abc");
    }

    #[test]
    fn emitted_lines_revalidate() {
        let mut sink = JsonLinesSink::new(Vec::new());
        let original = result("A-1");
        sink.emit(std::slice::from_ref(&original)).unwrap();
        let out = String::from_utf8(sink.into_inner()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(out.trim()).unwrap();
        assert_eq!(CaseResult::validate(&parsed).unwrap(), original);
    }

    #[test]
    fn vec_sink_accumulates() {
        let mut sink = VecSink::new();
        sink.emit(&[result("A-1")]).unwrap();
        sink.emit(&[]).unwrap();
        sink.emit(&[result("A-2")]).unwrap();
        assert_eq!(sink.results.len(), 2);
    }
}
