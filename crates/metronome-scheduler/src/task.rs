use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use metronome_metrics::{Metric, MetricSet, MetricSnapshot};

/// Remaining-time sentinel: arm the next timer with the full period.
pub const USE_FULL_PERIOD: i64 = -1;

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(0);

/// The contract every schedulable unit of work fulfils.
///
/// Concrete kinds embed a [`TaskMeta`] for the engine-facing bookkeeping and
/// implement `execute` for the work itself. A failed execution is logged by
/// the engine and never affects the schedule or other tasks.
#[async_trait]
pub trait Task: Send + Sync {
    /// Perform one unit of work, updating the task's own metrics.
    async fn execute(&self) -> anyhow::Result<()>;

    /// The registry tag this task was created under.
    fn kind(&self) -> &str;

    /// Identity, period, remaining time and metrics.
    fn meta(&self) -> &TaskMeta;
}

/// Shared handle under which the engine schedules a task.
pub type TaskHandle = Arc<dyn Task>;

/// Engine-facing bookkeeping shared by every task kind.
///
/// The id is process-unique and never reused; the name is the config-supplied
/// label used as the state-file key. `remaining_ms` carries the restart
/// protocol: it is set from saved state (or by [`capture`](Self::set_remaining)
/// on stop) and consumed once, at the first arming.
#[derive(Debug)]
pub struct TaskMeta {
    id: u64,
    name: String,
    period_ms: u64,
    remaining_ms: AtomicI64,
    metrics: MetricSet,
}

impl TaskMeta {
    pub fn new(name: impl Into<String>, period_ms: u64) -> Self {
        Self::with_metrics(name, period_ms, MetricSet::new())
    }

    /// Build bookkeeping for a task that owns the given metrics.
    pub fn with_metrics(name: impl Into<String>, period_ms: u64, metrics: MetricSet) -> Self {
        Self {
            id: NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
            period_ms,
            remaining_ms: AtomicI64::new(USE_FULL_PERIOD),
            metrics,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn period_ms(&self) -> u64 {
        self.period_ms
    }

    /// Milliseconds until the next execution as of the last stop, or
    /// [`USE_FULL_PERIOD`].
    pub fn remaining(&self) -> i64 {
        self.remaining_ms.load(Ordering::SeqCst)
    }

    pub fn set_remaining(&self, remaining: i64) {
        self.remaining_ms.store(remaining, Ordering::SeqCst);
    }

    /// Consume the remaining time, resetting it to the sentinel so later
    /// armings use the full period.
    pub fn take_remaining(&self) -> i64 {
        self.remaining_ms.swap(USE_FULL_PERIOD, Ordering::SeqCst)
    }

    pub fn metrics(&self) -> &MetricSet {
        &self.metrics
    }

    pub fn metric(&self, name: &str) -> Option<&Arc<Metric>> {
        self.metrics.get(name)
    }

    /// Project this task into its state-file record.
    pub fn state(&self) -> TaskState {
        TaskState {
            name: Some(self.name.clone()),
            remaining_time: Some(self.remaining()),
            metrics: Some(self.metrics.snapshot()),
        }
    }

    /// Apply a state-file record to this task.
    ///
    /// A record naming a different task is ignored (the name check guards
    /// against key/record mismatch in hand-edited files; records without a
    /// name are accepted). Only fields present and non-null are applied, and
    /// stored metrics the task does not declare are skipped.
    pub fn load_state(&self, record: &TaskState) {
        if let Some(stored) = &record.name {
            if stored != &self.name {
                warn!(
                    task = %self.name,
                    stored = %stored,
                    "state record names a different task, ignoring it"
                );
                return;
            }
        }

        if let Some(remaining) = record.remaining_time {
            self.set_remaining(remaining);
        }

        if let Some(snapshots) = &record.metrics {
            for (name, snapshot) in snapshots {
                match self.metrics.get(name) {
                    Some(metric) => metric.restore(snapshot),
                    None => warn!(
                        task = %self.name,
                        metric = %name,
                        "stored metric is not declared by the task, skipping"
                    ),
                }
            }
        }
    }
}

/// Persisted record of one task inside the state file.
///
/// Every field is optional on the way in so partially written or hand-edited
/// records still load; saving always fills all three.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub remaining_time: Option<i64>,
    #[serde(default)]
    pub metrics: Option<BTreeMap<String, MetricSnapshot>>,
}
