//! `metronome-metrics` — thread-safe running aggregates for task telemetry.
//!
//! Each task owns a fixed [`MetricSet`]. Every sample recorded into a
//! [`Metric`] folds into five fields (`current`, `min`, `max`, `average`,
//! `count`) under a single lock, and [`MetricSnapshot`] carries those fields
//! across the persistence boundary.

pub mod metric;
pub mod set;

pub use metric::{Metric, MetricSnapshot};
pub use set::MetricSet;
