use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::info;

use metronome_core::TaskEntry;
use metronome_scheduler::{Result, Task, TaskHandle, TaskMeta};

/// Type tag for the simulated network task.
pub const KIND: &str = "network";

/// Simulates a network round trip by sleeping a random 1 to 5 whole seconds.
pub struct NetworkTask {
    meta: TaskMeta,
}

impl NetworkTask {
    pub fn factory(entry: &TaskEntry) -> Result<TaskHandle> {
        Ok(Arc::new(Self {
            meta: TaskMeta::new(&entry.name, entry.period),
        }))
    }
}

#[async_trait]
impl Task for NetworkTask {
    async fn execute(&self) -> anyhow::Result<()> {
        let secs: u64 = rand::thread_rng().gen_range(1..=5);
        info!(
            task_id = self.meta.id(),
            task = %self.meta.name(),
            secs,
            "performing a simulated network operation"
        );
        tokio::time::sleep(Duration::from_secs(secs)).await;
        info!(
            task_id = self.meta.id(),
            task = %self.meta.name(),
            "finished simulated network operation"
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
