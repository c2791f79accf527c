use std::collections::HashMap;

use tracing::debug;

use metronome_core::TaskEntry;

use crate::error::Result;
use crate::task::TaskHandle;

/// Constructor signature every task kind registers.
///
/// Factories may fail on bad parameters; that surfaces as a fatal
/// construction error when the scheduler is built.
pub type TaskFactory = fn(&TaskEntry) -> Result<TaskHandle>;

/// Maps type tags to task constructors.
///
/// Built once at startup by explicit registration calls, then only read.
/// Task kinds are fixed at build time, so looking up an unregistered tag is
/// a programming error and panics rather than returning a recoverable error.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    factories: HashMap<String, TaskFactory>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under a type tag.
    ///
    /// Re-registering a tag overwrites the previous factory.
    pub fn register(&mut self, kind: impl Into<String>, factory: TaskFactory) {
        let kind = kind.into();
        debug!(%kind, "registering task factory");
        self.factories.insert(kind, factory);
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Registered tags, sorted for stable output.
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Construct a task from its config entry.
    ///
    /// # Panics
    ///
    /// Panics when `entry.kind` was never registered. Register every task
    /// kind before constructing a scheduler.
    pub fn create(&self, entry: &TaskEntry) -> Result<TaskHandle> {
        let Some(factory) = self.factories.get(&entry.kind) else {
            panic!(
                "task type '{}' is not registered (task '{}'); \
                 register the kind before building the scheduler",
                entry.kind, entry.name
            );
        };
        factory(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;

    use crate::error::SchedulerError;
    use crate::task::{Task, TaskMeta};

    struct NoopTask {
        meta: TaskMeta,
    }

    #[async_trait]
    impl Task for NoopTask {
        async fn execute(&self) -> anyhow::Result<()> {
            Ok(())
        }

        fn kind(&self) -> &str {
            "test:noop"
        }

        fn meta(&self) -> &TaskMeta {
            &self.meta
        }
    }

    fn noop_factory(entry: &TaskEntry) -> Result<TaskHandle> {
        Ok(Arc::new(NoopTask {
            meta: TaskMeta::new(&entry.name, entry.period),
        }))
    }

    fn failing_factory(entry: &TaskEntry) -> Result<TaskHandle> {
        Err(SchedulerError::TaskConfig(format!(
            "task '{}' is missing a parameter",
            entry.name
        )))
    }

    fn entry(kind: &str) -> TaskEntry {
        TaskEntry {
            name: "unit".into(),
            kind: kind.into(),
            period: 100,
            params: Default::default(),
        }
    }

    #[test]
    fn registered_kind_creates_a_task() {
        let mut registry = TaskRegistry::new();
        registry.register("test:noop", noop_factory);
        assert!(registry.contains("test:noop"));

        let task = registry.create(&entry("test:noop")).expect("create");
        assert_eq!(task.kind(), "test:noop");
        assert_eq!(task.meta().name(), "unit");
        assert_eq!(task.meta().period_ms(), 100);
    }

    #[test]
    fn re_registration_overwrites() {
        let mut registry = TaskRegistry::new();
        registry.register("test:noop", failing_factory);
        registry.register("test:noop", noop_factory);
        assert_eq!(registry.kinds(), vec!["test:noop"]);
        assert!(registry.create(&entry("test:noop")).is_ok());
    }

    #[test]
    fn factory_errors_propagate() {
        let mut registry = TaskRegistry::new();
        registry.register("test:bad", failing_factory);
        // Task handles carry no Debug impl, so unwrap the error side only.
        let err = registry.create(&entry("test:bad")).err().expect("must fail");
        assert!(matches!(err, SchedulerError::TaskConfig(_)));
    }

    #[test]
    #[should_panic(expected = "not registered")]
    fn unregistered_kind_panics() {
        let registry = TaskRegistry::new();
        let _ = registry.create(&entry("test:ghost"));
    }
}
