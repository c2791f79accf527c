use thiserror::Error;

/// Errors that can occur within the scheduler subsystem.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A task factory rejected its configuration entry.
    #[error("Invalid task config: {0}")]
    TaskConfig(String),

    /// The engine configuration is unusable (e.g. zero worker threads).
    #[error("Configuration error: {0}")]
    Config(String),

    /// `run` was called while this instance was already running.
    #[error("Scheduler is already running")]
    AlreadyRunning,

    /// `stop` was called while this instance was not running.
    #[error("Scheduler is already stopped")]
    NotRunning,

    /// The state file could not be read or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The state file contents could not be parsed or produced.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
