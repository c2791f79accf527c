use std::path::PathBuf;

use clap::Parser;
use tracing::info;

mod console;

/// Periodic task scheduler daemon.
///
/// Reads a JSON config describing the worker pool, the optional state file
/// and the tasks to run, then schedules them until `exit` is typed on the
/// console. Remaining delays and metrics are persisted on stop and restored
/// on the next start.
#[derive(Parser, Debug)]
#[command(name = "metronome-daemon", version)]
struct Cli {
    /// Path of the JSON config file.
    config: PathBuf,
}

// The scheduler owns its worker runtime, so main stays synchronous; the
// console loop below is plain blocking stdin.
fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "metronome_daemon=info,metronome_scheduler=info,metronome_tasks=info".into()
            }),
        )
        .with_thread_names(true)
        .init();

    let cli = Cli::parse();
    info!(config = %cli.config.display(), "loading configuration");
    let config = metronome_core::ConfigFile::load(&cli.config)?.config;

    let registry = metronome_tasks::builtin_registry();
    let scheduler = metronome_scheduler::Scheduler::new(&config, &registry)?;

    info!("starting scheduler");
    scheduler.run()?;

    // Blocks until the operator types "exit" or stdin closes.
    console::monitor(&scheduler)?;

    info!("scheduler daemon exiting");
    Ok(())
}
