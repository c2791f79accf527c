use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::{lookup_host, TcpStream};
use tokio::time::{timeout, Instant};
use tracing::{info, warn};

use metronome_core::TaskEntry;
use metronome_metrics::MetricSet;
use metronome_scheduler::{Result, Task, TaskHandle, TaskMeta};

/// Type tag for the TCP connect latency probe.
pub const KIND: &str = "network:connect";

/// Metric collecting one latency sample per successful probe.
pub const METRIC_CONNECT_TIME_MS: &str = "connect-time(ms)";

/// Caps a single connect attempt so a blackholed endpoint cannot pile up
/// probes across periods forever.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Measures how long a TCP connect to `domain:port` takes, feeding the
/// `connect-time(ms)` metric.
///
/// Params: `domain` and `port` (both strings; missing params leave the
/// target empty and every probe fails at resolution). Resolution and
/// connection failures are logged and skip the cycle; the task stays
/// scheduled and the metric keeps only successful samples.
pub struct ConnectTask {
    meta: TaskMeta,
    domain: String,
    port: String,
}

impl ConnectTask {
    pub fn factory(entry: &TaskEntry) -> Result<TaskHandle> {
        Ok(Arc::new(Self {
            meta: TaskMeta::with_metrics(
                &entry.name,
                entry.period,
                MetricSet::with_names([METRIC_CONNECT_TIME_MS]),
            ),
            domain: entry.param("domain").unwrap_or_default().to_string(),
            port: entry.param("port").unwrap_or_default().to_string(),
        }))
    }

    /// Try each resolved address in order until one connects.
    async fn connect_any(&self, addrs: Vec<SocketAddr>) -> std::result::Result<(), String> {
        let mut last_error = String::from("no addresses resolved");
        for addr in addrs {
            match timeout(CONNECT_TIMEOUT, TcpStream::connect(addr)).await {
                Ok(Ok(_stream)) => return Ok(()),
                Ok(Err(e)) => last_error = format!("{addr}: {e}"),
                Err(_) => last_error = format!("{addr}: timed out"),
            }
        }
        Err(last_error)
    }
}

#[async_trait]
impl Task for ConnectTask {
    async fn execute(&self) -> anyhow::Result<()> {
        let target = format!("{}:{}", self.domain, self.port);
        // Latency is measured from before resolution, so the sample covers
        // the full user-visible connect path.
        let started = Instant::now();

        let addrs: Vec<SocketAddr> = match lookup_host(target.as_str()).await {
            Ok(addrs) => addrs.collect(),
            Err(e) => {
                warn!(
                    task = %self.meta.name(),
                    domain = %self.domain,
                    "error resolving domain: {e}"
                );
                return Ok(());
            }
        };

        match self.connect_any(addrs).await {
            Ok(()) => {
                let elapsed_ms = started.elapsed().as_millis() as f64;
                if let Some(metric) = self.meta.metric(METRIC_CONNECT_TIME_MS) {
                    metric.record(elapsed_ms);
                    info!(
                        task = %self.meta.name(),
                        domain = %self.domain,
                        port = %self.port,
                        "{metric}"
                    );
                }
            }
            Err(reason) => {
                warn!(
                    task = %self.meta.name(),
                    domain = %self.domain,
                    "error connecting: {reason}"
                );
            }
        }
        Ok(())
    }

    fn kind(&self) -> &str {
        KIND
    }

    fn meta(&self) -> &TaskMeta {
        &self.meta
    }
}
