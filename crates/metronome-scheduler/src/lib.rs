//! `metronome-scheduler` — the periodic execution engine.
//!
//! # Overview
//!
//! A [`Scheduler`] owns a fixed set of [`Task`]s, each constructed from
//! configuration through a [`TaskRegistry`] and scheduled on its own
//! millisecond period. `run` starts a shared tokio worker pool with one
//! timer actor per task; every expiry posts the task body onto the pool and
//! re-arms immediately, so execution time never skews the timer cadence.
//! `stop` captures each task's remaining delay and writes the state file,
//! which the next construction (or process) restores.
//!
//! # Restart protocol
//!
//! | Moment        | Action                                                  |
//! |---------------|---------------------------------------------------------|
//! | construction  | load state file, apply matching records per task        |
//! | first arming  | consume remaining time, fall back to the full period    |
//! | later armings | always the full period                                  |
//! | stop          | remaining = expiry - now (past expiry: full period)     |

pub mod engine;
pub mod error;
pub mod registry;
pub mod state;
pub mod task;

pub use engine::Scheduler;
pub use error::{Result, SchedulerError};
pub use registry::{TaskFactory, TaskRegistry};
pub use state::SavedState;
pub use task::{Task, TaskHandle, TaskMeta, TaskState, USE_FULL_PERIOD};
