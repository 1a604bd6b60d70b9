//! `casewatch validate`: run result envelopes back through the validator.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::Context;
use casewatch_core::CaseResult;
use serde_json::Value;

pub struct Summary {
    pub valid: usize,
    pub rejects: Vec<(usize, String)>,
}

pub fn validate_file(path: &Path) -> anyhow::Result<Summary> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    validate_lines(BufReader::new(file))
}

/// Validate each non-blank line. Line numbers are 1-based.
fn validate_lines(reader: impl BufRead) -> anyhow::Result<Summary> {
    let mut summary = Summary {
        valid: 0,
        rejects: Vec::new(),
    };
    for (i, line) in reader.lines().enumerate() {
        let line = line.context("reading input")?;
        if line.trim().is_empty() {
            continue;
        }
        let outcome = serde_json::from_str::<Value>(&line)
            .map_err(|e| format!("not JSON: {e}"))
            .and_then(|v| CaseResult::validate(&v).map_err(|e| e.to_string()));
        match outcome {
            Ok(_) => summary.valid += 1,
            Err(reason) => {
                eprintln!("line {}: {reason}", i + 1);
                summary.rejects.push((i + 1, reason));
            }
        }
    }
    Ok(summary)
}
