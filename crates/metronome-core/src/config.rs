use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Json},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Worker count used when `thread_pool_capacity` is absent or null.
pub const DEFAULT_THREAD_POOL_CAPACITY: usize = 3;

/// Top-level config document (JSON file + METRONOME_* env overrides).
///
/// All scheduler settings live under a required `config` root object;
/// a document without that root fails to load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    pub config: EngineConfig,
}

/// Scheduler engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Worker thread count. Absent or null falls back to
    /// [`DEFAULT_THREAD_POOL_CAPACITY`].
    #[serde(default)]
    pub thread_pool_capacity: Option<usize>,

    /// Where task state is persisted on stop and restored from on startup.
    /// Absent or null disables persistence.
    #[serde(default, rename = "stateFile")]
    pub state_file: Option<PathBuf>,

    /// Task definitions, scheduled in the order listed.
    pub tasks: Vec<TaskEntry>,
}

impl EngineConfig {
    /// Effective worker thread count.
    pub fn worker_threads(&self) -> usize {
        self.thread_pool_capacity
            .unwrap_or(DEFAULT_THREAD_POOL_CAPACITY)
    }
}

/// One entry of the `tasks` array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEntry {
    /// Task label, also the key under which its state is persisted.
    /// Uniqueness across entries is the config author's responsibility.
    pub name: String,

    /// Registry tag selecting the task factory (`system`, `network`,
    /// `network:connect`, ...).
    #[serde(rename = "type")]
    pub kind: String,

    /// Execution period in milliseconds.
    pub period: u64,

    /// Free-form string parameters forwarded to the factory.
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

impl TaskEntry {
    /// Parameter lookup, `None` when the key is absent.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

impl ConfigFile {
    /// Load the config document from a JSON file with METRONOME_* env
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Config` when the file does not exist, is not
    /// valid JSON, or is missing the `config` root or a required field.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(CoreError::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }

        let config: ConfigFile = Figment::new()
            .merge(Json::file(path))
            .merge(Env::prefixed("METRONOME_").split("_"))
            .extract()
            .map_err(|e| CoreError::Config(e.to_string()))?;

        Ok(config)
    }
}
