// Verify scheduling continuity across stop/run cycles: what stop() captures
// is exactly what the next run arms, whether that run happens on the same
// instance or on a fresh one built from the persisted state file.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use metronome_core::{EngineConfig, TaskEntry};
use metronome_metrics::MetricSet;
use metronome_scheduler::{
    Result, Scheduler, Task, TaskHandle, TaskMeta, TaskRegistry, USE_FULL_PERIOD,
};

struct CounterTask {
    meta: TaskMeta,
}

#[async_trait]
impl Task for CounterTask {
    async fn execute(&self) -> anyhow::Result<()> {
        self.meta.metric("samples").unwrap().record(1.0);
        Ok(())
    }

    fn kind(&self) -> &str {
        "test:counter"
    }

    fn meta(&self) -> &TaskMeta {
        &self.meta
    }
}

fn counter_factory(entry: &TaskEntry) -> Result<TaskHandle> {
    Ok(Arc::new(CounterTask {
        meta: TaskMeta::with_metrics(
            &entry.name,
            entry.period,
            MetricSet::with_names(["samples"]),
        ),
    }))
}

fn registry() -> TaskRegistry {
    let mut registry = TaskRegistry::new();
    registry.register("test:counter", counter_factory);
    registry
}

fn entry(name: &str, period: u64) -> TaskEntry {
    TaskEntry {
        name: name.into(),
        kind: "test:counter".into(),
        period,
        params: BTreeMap::new(),
    }
}

#[test]
fn stop_persists_remaining_time_per_task() {
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("state.json");

    let config = EngineConfig {
        thread_pool_capacity: Some(2),
        state_file: Some(state_path.clone()),
        tasks: vec![entry("quick", 500), entry("slow", 2000)],
    };

    let scheduler = Scheduler::new(&config, &registry()).unwrap();
    scheduler.run().unwrap();
    std::thread::sleep(Duration::from_millis(200));
    scheduler.stop().unwrap();

    let raw = std::fs::read_to_string(&state_path).unwrap();
    assert!(raw.contains("\"quick\""));
    assert!(raw.contains("\"slow\""));
    assert!(raw.contains("remaining_time"));

    let state: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let slow_remaining = state["tasks"]["slow"]["remaining_time"].as_i64().unwrap();
    assert!(
        slow_remaining > 0 && slow_remaining < 2000,
        "slow task stopped 200ms in must have most of its period left, saw {slow_remaining}"
    );

    let quick_remaining = state["tasks"]["quick"]["remaining_time"].as_i64().unwrap();
    assert!(
        quick_remaining == USE_FULL_PERIOD || (quick_remaining > 0 && quick_remaining < 500),
        "quick task must hold a sub-period remainder or the sentinel, saw {quick_remaining}"
    );
}

#[test]
fn rerun_of_the_same_instance_honours_captured_remaining() {
    let config = EngineConfig {
        thread_pool_capacity: Some(1),
        state_file: None,
        tasks: vec![entry("steady", 1000)],
    };

    let scheduler = Scheduler::new(&config, &registry()).unwrap();
    scheduler.run().unwrap();
    std::thread::sleep(Duration::from_millis(700));
    scheduler.stop().unwrap();

    let meta = scheduler.tasks()[0].meta();
    assert_eq!(meta.metric("samples").unwrap().count(), 0);
    let captured = meta.remaining();
    assert!(
        captured > 0 && captured < 1000,
        "expected a sub-period remainder, saw {captured}"
    );

    // The second run must arm with the captured remainder: a fire lands
    // around the 300ms mark, while a full-period arm would stay silent for
    // the whole window.
    scheduler.run().unwrap();
    std::thread::sleep(Duration::from_millis(600));
    scheduler.stop().unwrap();
    assert_eq!(meta.metric("samples").unwrap().count(), 1);
}

#[test]
fn state_survives_a_scheduler_restart() {
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("state.json");

    let config = EngineConfig {
        thread_pool_capacity: Some(1),
        state_file: Some(state_path),
        tasks: vec![entry("probe", 60_000)],
    };

    let first = Scheduler::new(&config, &registry()).unwrap();
    first.tasks()[0].meta().metric("samples").unwrap().record(7.5);
    first.run().unwrap();
    std::thread::sleep(Duration::from_millis(300));
    first.stop().unwrap();

    let meta = first.tasks()[0].meta();
    let captured = meta.remaining();
    assert!(
        captured > 0 && captured < 60_000,
        "expected a positive remainder, saw {captured}"
    );
    let snapshot = meta.metric("samples").unwrap().snapshot();

    // A second instance built from the same config must pick up where the
    // first left off.
    let second = Scheduler::new(&config, &registry()).unwrap();
    let restored = second.tasks()[0].meta();
    assert_eq!(restored.remaining(), captured);
    assert_eq!(restored.metric("samples").unwrap().snapshot(), snapshot);
    assert_eq!(snapshot.count, 1);
    assert_eq!(snapshot.current, 7.5);
}

#[test]
fn hand_written_remaining_time_arms_the_first_fire() {
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("state.json");
    std::fs::write(
        &state_path,
        r#"{"tasks":{"probe":{"remaining_time":250,"metrics":{}}}}"#,
    )
    .unwrap();

    let config = EngineConfig {
        thread_pool_capacity: Some(1),
        state_file: Some(state_path),
        tasks: vec![entry("probe", 1000)],
    };

    let scheduler = Scheduler::new(&config, &registry()).unwrap();
    assert_eq!(scheduler.tasks()[0].meta().remaining(), 250);

    scheduler.run().unwrap();
    // Fires at ~250ms; the next full-period fire at ~1250ms is out of reach.
    std::thread::sleep(Duration::from_millis(650));
    scheduler.stop().unwrap();

    let fired = scheduler.tasks()[0]
        .meta()
        .metric("samples")
        .unwrap()
        .count();
    assert_eq!(fired, 1, "first arm must use the stored 250ms, not 1000ms");
}
