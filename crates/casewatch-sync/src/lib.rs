//! Sync layer: the per-source change-detection cycle, the fetch contract it
//! depends on, and sinks for validated results.

pub mod controller;
pub mod fetch;
pub mod sink;

#[cfg(feature = "http")]
pub mod http;

pub use controller::{Controller, CycleError, CycleOutcome, CycleReport, Rejection};
pub use fetch::{FetchError, FetchOutcome, Fetcher};
pub use sink::{JsonLinesSink, RecordSink, SinkError, VecSink};

#[cfg(feature = "http")]
pub use http::{HttpFetcher, HttpFetcherConfig};
