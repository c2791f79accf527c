use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::info;

use metronome_core::TaskEntry;
use metronome_scheduler::{Result, Task, TaskHandle, TaskMeta};

/// Type tag for the simulated blocking I/O task.
pub const KIND: &str = "system";

/// Simulates a blocking I/O operation (e.g. a slow file read) by sleeping a
/// random 2 to 6 whole seconds. Useful for exercising the worker pool.
pub struct SystemTask {
    meta: TaskMeta,
}

impl SystemTask {
    pub fn factory(entry: &TaskEntry) -> Result<TaskHandle> {
        Ok(Arc::new(Self {
            meta: TaskMeta::new(&entry.name, entry.period),
        }))
    }
}

#[async_trait]
impl Task for SystemTask {
    async fn execute(&self) -> anyhow::Result<()> {
        let secs: u64 = rand::thread_rng().gen_range(2..=6);
        info!(
            task_id = self.meta.id(),
            task = %self.meta.name(),
            secs,
            "performing a simulated I/O operation"
        );
        tokio::time::sleep(Duration::from_secs(secs)).await;
        info!(
            task_id = self.meta.id(),
            task = %self.meta.name(),
            "finished simulated I/O operation"
        );
        Ok(())
    }

    fn kind(&self) -> &str {
        KIND
    }

    fn meta(&self) -> &TaskMeta {
        &self.meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn factory_builds_from_entry() {
        let entry = TaskEntry {
            name: "io".into(),
            kind: KIND.into(),
            period: 4000,
            params: BTreeMap::new(),
        };
        let task = SystemTask::factory(&entry).expect("factory");
        assert_eq!(task.kind(), "system");
        assert_eq!(task.meta().name(), "io");
        assert_eq!(task.meta().period_ms(), 4000);
        assert!(task.meta().metrics().is_empty());
    }
}
