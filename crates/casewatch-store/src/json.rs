//! File-backed cursor store: one pretty-printed JSON object per watcher.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use casewatch_core::{Cursor, StateConfig};
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::{CursorStore, StoreError};

/// JSON-file cursor store.
///
/// The file maps each watched URL to its cursor fields, absent fields
/// omitted:
///
/// ```json
/// {
///   "https://data.example.gov/overages/csv-feed": { "etag": "\"abc123\"" }
/// }
/// ```
///
/// The whole mapping is rewritten on every [`put`](CursorStore::put),
/// through a temp file in the same directory and an atomic rename. A
/// missing, unreadable or corrupt file loads as the empty mapping: the
/// cost is one redundant pass over every source, never a stuck watcher.
pub struct JsonCursorStore {
    path: PathBuf,
    cursors: RwLock<BTreeMap<String, Cursor>>,
}

impl JsonCursorStore {
    /// Open the store at `path`, loading whatever state is there.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let cursors = load_all(&path);
        Self {
            path,
            cursors: RwLock::new(cursors),
        }
    }

    /// Open the store for a named watcher under the configured state root.
    pub fn open_for(config: &StateConfig, watcher: &str) -> Self {
        Self::open(config.cursor_path(watcher))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.cursors.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn write(&self, cursors: &BTreeMap<String, Cursor>) -> Result<(), StoreError> {
        let dir = self
            .path
            .parent()
            .ok_or_else(|| StoreError::NoParent(self.path.clone()))?;
        std::fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, cursors)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

fn load_all(path: &Path) -> BTreeMap<String, Cursor> {
    if !path.exists() {
        return BTreeMap::new();
    }
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cursor state unreadable, starting empty");
            return BTreeMap::new();
        }
    };
    match serde_json::from_str::<BTreeMap<String, Cursor>>(&text) {
        Ok(cursors) => {
            info!(path = %path.display(), count = cursors.len(), "loaded cursor state");
            cursors
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cursor state corrupt, starting empty");
            BTreeMap::new()
        }
    }
}

impl CursorStore for JsonCursorStore {
    fn get(&self, source: &str) -> Cursor {
        let cursors = self.cursors.read().unwrap_or_else(|e| e.into_inner());
        cursors.get(source).cloned().unwrap_or_default()
    }

    fn put(&self, source: &str, cursor: Cursor) -> Result<(), StoreError> {
        let mut cursors = self.cursors.write().unwrap_or_else(|e| e.into_inner());
        cursors.insert(source.to_string(), cursor);
        self.write(&cursors)
    }

    fn flush(&self) -> Result<(), StoreError> {
        let cursors = self.cursors.read().unwrap_or_else(|e| e.into_inner());
        self.write(&cursors)
    }

    fn snapshot(&self) -> BTreeMap<String, Cursor> {
        self.cursors.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}
