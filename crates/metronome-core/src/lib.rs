//! `metronome-core` — configuration loading and shared error types.
//!
//! The daemon consumes one JSON document with a required `config` root
//! holding the worker-pool size, the optional state-file path, and the task
//! definitions. Values can be overridden through `METRONOME_*` environment
//! variables.

pub mod config;
pub mod error;

pub use config::{ConfigFile, EngineConfig, TaskEntry, DEFAULT_THREAD_POOL_CAPACITY};
pub use error::{CoreError, Result};
