//! Cursor storage: one mapping from watched URL to its latest accepted
//! cursor, persisted as a single unit.

mod error;
mod json;
mod memory;

pub use error::StoreError;
pub use json::JsonCursorStore;
pub use memory::MemoryCursorStore;

use std::collections::BTreeMap;

use casewatch_core::Cursor;

/// Durable key-value store of the latest cursor per source URL.
///
/// Implementations use interior mutability so one store can be shared by
/// cycles running for different sources. Callers serialise cycles for the
/// same source; the store itself only guarantees each call is atomic.
pub trait CursorStore: Send + Sync {
    /// Stored cursor for `source`, or [`Cursor::Empty`] if none. Never fails.
    fn get(&self, source: &str) -> Cursor;

    /// Store `cursor` for `source`, overwriting unconditionally. Durable
    /// implementations write through before returning.
    fn put(&self, source: &str, cursor: Cursor) -> Result<(), StoreError>;

    /// Persist the whole mapping.
    fn flush(&self) -> Result<(), StoreError>;

    /// Copy of every stored cursor, keyed by source URL.
    fn snapshot(&self) -> BTreeMap<String, Cursor>;
}
