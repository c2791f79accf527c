use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::task::TaskState;

/// The persisted state document: one record per task, keyed by task name.
///
/// Written pretty-printed with `BTreeMap` ordering so the file stays stable
/// and diffable across runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SavedState {
    #[serde(default)]
    pub tasks: BTreeMap<String, TaskState>,
}

impl SavedState {
    /// Read a state document from `path`.
    ///
    /// `Ok(None)` when the file does not exist yet (first run). An existing
    /// but unreadable or unparseable file is an error: silently discarding
    /// saved state would lose metric history.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            info!(path = %path.display(), "state file does not exist yet");
            return Ok(None);
        }
        let raw = std::fs::read_to_string(path)?;
        let state: Self = serde_json::from_str(&raw)?;
        info!(path = %path.display(), tasks = state.tasks.len(), "found saved state file");
        Ok(Some(state))
    }

    /// Write the document to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let body = serde_json::to_string_pretty(self)?;
        std::fs::write(path, body)?;
        info!(path = %path.display(), tasks = self.tasks.len(), "state saved");
        Ok(())
    }

    pub fn task(&self, name: &str) -> Option<&TaskState> {
        self.tasks.get(name)
    }
}
