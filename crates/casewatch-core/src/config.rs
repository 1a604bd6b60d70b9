//! Location of durable cursor state.

use std::path::PathBuf;

/// Environment variable naming the state root directory.
pub const STATE_DIR_ENV: &str = "CASEWATCH_STATE_DIR";

const DEFAULT_STATE_DIR: &str = ".state";
const CURSOR_FILE: &str = "cursor.json";

/// Where cursor state lives on disk.
///
/// Each named watcher gets its own directory under the root:
/// `<root>/<watcher>/cursor.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateConfig {
    pub root: PathBuf,
}

impl StateConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn cursor_path(&self, watcher: &str) -> PathBuf {
        self.root.join(watcher).join(CURSOR_FILE)
    }
}

impl Default for StateConfig {
    fn default() -> Self {
        Self::new(DEFAULT_STATE_DIR)
    }
}
