use std::collections::BTreeMap;
use std::sync::RwLock;

use casewatch_core::Cursor;

use crate::{CursorStore, StoreError};

/// Ephemeral store scoped to one process.
#[derive(Debug, Default)]
pub struct MemoryCursorStore {
    cursors: RwLock<BTreeMap<String, Cursor>>,
}

impl MemoryCursorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CursorStore for MemoryCursorStore {
    fn get(&self, source: &str) -> Cursor {
        let cursors = self.cursors.read().unwrap_or_else(|e| e.into_inner());
        cursors.get(source).cloned().unwrap_or_default()
    }

    fn put(&self, source: &str, cursor: Cursor) -> Result<(), StoreError> {
        let mut cursors = self.cursors.write().unwrap_or_else(|e| e.into_inner());
        cursors.insert(source.to_string(), cursor);
        Ok(())
    }

    fn flush(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn snapshot(&self) -> BTreeMap<String, Cursor> {
        self.cursors.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}
