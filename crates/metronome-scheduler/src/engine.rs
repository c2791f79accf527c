use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::runtime::{Builder, Runtime};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use metronome_core::EngineConfig;

use crate::error::{Result, SchedulerError};
use crate::registry::TaskRegistry;
use crate::state::SavedState;
use crate::task::{TaskHandle, USE_FULL_PERIOD};

/// How long `stop` waits for in-flight task bodies before dropping them.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Deadline of a task's next firing, shared between its timer actor and
/// `stop`. `None` until the timer has been armed for the first time.
type DeadlineSlot = Arc<Mutex<Option<Instant>>>;

/// Runtime half of a running scheduler, created by `run` and torn down by
/// `stop` (or `Drop` as a last resort).
struct RunningState {
    runtime: Runtime,
    shutdown: watch::Sender<bool>,
}

/// Drives a fixed set of periodic tasks over a shared worker pool.
///
/// Construction parses configuration into tasks (via the registry) and
/// merges any saved state. `run` starts a multi-thread runtime with one
/// timer actor per task; each expiry posts the task body onto the pool and
/// immediately re-arms, so a slow body never blocks its own timer (and may
/// overlap the next invocation of the same task). `stop` tears the pool
/// down, captures every task's remaining delay and persists the state file.
pub struct Scheduler {
    tasks: Vec<TaskHandle>,
    deadlines: HashMap<u64, DeadlineSlot>,
    worker_threads: usize,
    state_path: Option<PathBuf>,
    running: AtomicBool,
    inner: Mutex<Option<RunningState>>,
}

impl Scheduler {
    /// Build a scheduler from configuration.
    ///
    /// Every entry in `config.tasks` is constructed through `registry` in
    /// order. When a state file is configured and present, each task's saved
    /// record is applied before scheduling; tasks without a record start
    /// fresh.
    ///
    /// # Errors
    ///
    /// Fails when the worker count is zero, a factory rejects its entry, or
    /// a configured state file exists but cannot be read or parsed.
    ///
    /// # Panics
    ///
    /// Propagates the registry panic on an unregistered task type.
    pub fn new(config: &EngineConfig, registry: &TaskRegistry) -> Result<Self> {
        let worker_threads = config.worker_threads();
        if worker_threads == 0 {
            return Err(SchedulerError::Config(
                "thread_pool_capacity must be at least 1".into(),
            ));
        }

        let state_path = config.state_file.clone();
        let saved = match &state_path {
            Some(path) => SavedState::load(path)?,
            None => {
                info!("state file not configured, persistence disabled");
                None
            }
        };

        let mut tasks: Vec<TaskHandle> = Vec::with_capacity(config.tasks.len());
        let mut deadlines = HashMap::new();
        for entry in &config.tasks {
            let task = registry.create(entry)?;
            if let Some(record) = saved.as_ref().and_then(|s| s.task(&entry.name)) {
                info!(task = %entry.name, "loading saved state");
                task.meta().load_state(record);
            }
            deadlines.insert(task.meta().id(), Arc::new(Mutex::new(None)));
            tasks.push(task);
        }

        Ok(Self {
            tasks,
            deadlines,
            worker_threads,
            state_path,
            running: AtomicBool::new(false),
            inner: Mutex::new(None),
        })
    }

    /// Start the worker pool and arm every task's timer.
    ///
    /// Returns as soon as the pool is up; timers and task bodies run on the
    /// pool threads. Fails with [`SchedulerError::AlreadyRunning`] when this
    /// instance is already running.
    pub fn run(&self) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(SchedulerError::AlreadyRunning);
        }

        info!(worker_threads = self.worker_threads, "scheduler starting");

        let runtime = match Builder::new_multi_thread()
            .worker_threads(self.worker_threads)
            .thread_name("metronome-worker")
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                return Err(e.into());
            }
        };

        // Deadlines from an earlier run must not leak into this one's
        // remaining-time capture.
        for slot in self.deadlines.values() {
            *slot.lock().expect("deadline slot poisoned") = None;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        for task in &self.tasks {
            let deadline = Arc::clone(&self.deadlines[&task.meta().id()]);
            runtime.spawn(drive_task(
                Arc::clone(task),
                deadline,
                shutdown_rx.clone(),
            ));
        }

        *self.lock_inner() = Some(RunningState {
            runtime,
            shutdown: shutdown_tx,
        });
        Ok(())
    }

    /// Stop the pool, capture every task's remaining delay and persist the
    /// state file.
    ///
    /// In-flight task bodies get a short grace period, then are dropped with
    /// the runtime. Remaining delays are measured from the moment the stop
    /// was triggered, so the grace period does not eat into them. Fails with
    /// [`SchedulerError::NotRunning`] when this instance is not running.
    pub fn stop(&self) -> Result<()> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Err(SchedulerError::NotRunning);
        }

        info!("scheduler stop triggered");
        let stopped_at = Instant::now();

        if let Some(RunningState { runtime, shutdown }) = self.lock_inner().take() {
            // Cancels every timer actor; their pending waits end silently.
            let _ = shutdown.send(true);
            runtime.shutdown_timeout(SHUTDOWN_GRACE);
        }

        self.capture_remaining(stopped_at);
        info!("scheduler stopped");
        self.save_state()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Configured tasks in scheduling order.
    pub fn tasks(&self) -> &[TaskHandle] {
        &self.tasks
    }

    /// Record each task's delay left at the instant the engine stopped.
    ///
    /// An expiry already in the past means the due execution may not have
    /// run to completion; those tasks fall back to the full-period sentinel.
    /// A timer that was never armed keeps whatever remaining value it
    /// already carries.
    fn capture_remaining(&self, stopped_at: Instant) {
        for task in &self.tasks {
            let meta = task.meta();
            let deadline = *self.deadlines[&meta.id()]
                .lock()
                .expect("deadline slot poisoned");
            let Some(expiry) = deadline else {
                continue;
            };
            let remaining = if expiry > stopped_at {
                expiry.duration_since(stopped_at).as_millis() as i64
            } else {
                USE_FULL_PERIOD
            };
            meta.set_remaining(remaining);
            debug!(
                task_id = meta.id(),
                task = %meta.name(),
                remaining,
                "captured remaining delay"
            );
        }
    }

    fn save_state(&self) -> Result<()> {
        let Some(path) = &self.state_path else {
            info!("state file location unspecified, exiting without saving state");
            return Ok(());
        };
        let mut state = SavedState::default();
        for task in &self.tasks {
            let meta = task.meta();
            state.tasks.insert(meta.name().to_string(), meta.state());
        }
        state.save(path)
    }

    fn lock_inner(&self) -> MutexGuard<'_, Option<RunningState>> {
        self.inner.lock().expect("scheduler state mutex poisoned")
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        // Owner never called stop: tear the pool down but do not persist,
        // only an explicit stop writes the state file.
        if self.running.swap(false, Ordering::SeqCst) {
            if let Some(RunningState { runtime, shutdown }) = self.lock_inner().take() {
                let _ = shutdown.send(true);
                runtime.shutdown_timeout(Duration::from_millis(100));
            }
        }
    }
}

/// Per-task timer actor: arm, wait, post, re-arm until shutdown.
///
/// The first arming honours a restored remaining time, capped at one
/// period; every later arming uses the full period. The task body is
/// spawned onto the pool rather than awaited here, which keeps the timer
/// cadence independent of execution time.
async fn drive_task(task: TaskHandle, deadline: DeadlineSlot, mut shutdown: watch::Receiver<bool>) {
    let mut delay = initial_delay(&task);
    loop {
        let next = Instant::now() + delay;
        *deadline.lock().expect("deadline slot poisoned") = Some(next);

        tokio::select! {
            _ = tokio::time::sleep_until(next) => {
                tokio::spawn(execute_task(Arc::clone(&task)));
                delay = Duration::from_millis(task.meta().period_ms());
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    debug!(task_id = task.meta().id(), task = %task.meta().name(), "timer cancelled");
                    break;
                }
            }
        }
    }
}

fn initial_delay(task: &TaskHandle) -> Duration {
    let meta = task.meta();
    let period = Duration::from_millis(meta.period_ms());
    let remaining = meta.take_remaining();
    if remaining <= 0 {
        return period;
    }
    let restored = Duration::from_millis(remaining as u64);
    // A record the engine wrote never exceeds one period. Larger values come
    // from hand-edited files and can push the deadline past what the timer
    // arithmetic represents.
    if restored > period {
        warn!(
            task_id = meta.id(),
            task = %meta.name(),
            remaining,
            "saved remaining time exceeds the period, arming with the full period"
        );
        return period;
    }
    restored
}

/// One posted execution: run the body, contain any error.
async fn execute_task(task: TaskHandle) {
    let meta = task.meta();
    debug!(task_id = meta.id(), task = %meta.name(), "executing task");
    if let Err(e) = task.execute().await {
        error!(task_id = meta.id(), task = %meta.name(), "task execution failed: {e:#}");
    }
}
