//! `casewatch run`: one cycle per URL against the watcher's cursor file.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use casewatch_core::{Extractor, StateConfig};
use casewatch_extract::{CsvFeed, DocumentList, HtmlTable, SourceProfile};
use casewatch_store::JsonCursorStore;
use casewatch_sync::{Controller, CycleOutcome, HttpFetcher, HttpFetcherConfig, JsonLinesSink};
use futures::future::join_all;
use tracing::{error, info};

use crate::SourceFormat;

pub struct Watch {
    pub format: SourceFormat,
    pub name: String,
    pub state: String,
    pub county: String,
    pub source_system: String,
    pub timeout: Duration,
}

impl Watch {
    fn extractor(&self) -> Box<dyn Extractor> {
        let profile = SourceProfile::new(
            self.state.as_str(),
            self.county.as_str(),
            self.source_system.as_str(),
        );
        match self.format {
            SourceFormat::Csv => Box::new(CsvFeed::new(profile)),
            SourceFormat::Html => Box::new(HtmlTable::new(profile)),
            SourceFormat::Document => Box::new(DocumentList::new(profile)),
        }
    }
}

/// Cycle every distinct URL concurrently. Fails if any cycle failed, after
/// all of them have run.
pub async fn run(watch: &Watch, urls: &[String], config: &StateConfig) -> anyhow::Result<()> {
    let mut urls = urls.to_vec();
    urls.sort();
    urls.dedup();

    let store = Arc::new(JsonCursorStore::open_for(config, &watch.name));
    let controller = Controller::new(store);
    let fetcher = HttpFetcher::new(&HttpFetcherConfig {
        timeout: watch.timeout,
        ..HttpFetcherConfig::default()
    })
    .context("building HTTP client")?;
    let extractor = watch.extractor();

    let cycles = urls.iter().map(|url| {
        let controller = &controller;
        let fetcher = &fetcher;
        let extractor = extractor.as_ref();
        async move {
            let mut sink = JsonLinesSink::new(std::io::stdout());
            (url, controller.run_cycle(url, fetcher, extractor, &mut sink).await)
        }
    });

    let mut failed = 0usize;
    for (url, result) in join_all(cycles).await {
        match result {
            Ok(report) => {
                if report.outcome == CycleOutcome::Changed {
                    for rejection in &report.rejected {
                        eprintln!(
                            "{url}: record {} ({}) rejected: {}",
                            rejection.index,
                            rejection.case_ref.as_deref().unwrap_or("-"),
                            rejection.error
                        );
                    }
                }
                info!(
                    url = %url,
                    outcome = ?report.outcome,
                    emitted = report.emitted,
                    rejected = report.rejected.len(),
                    "cycle complete"
                );
            }
            Err(e) => {
                failed += 1;
                error!(url = %url, error = %e, "cycle failed");
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} cycle(s) failed", urls.len());
    }
    Ok(())
}
