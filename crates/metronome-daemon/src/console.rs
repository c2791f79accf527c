use std::io::{self, BufRead, Write};

use tracing::info;

use metronome_scheduler::Scheduler;

/// Line-oriented control surface on stdin.
///
/// `exit` stops the scheduler and returns; `status` prints the engine state
/// and every task's metrics; anything else is echoed back as unknown. EOF
/// behaves like `exit` so a closed stdin cannot spin the loop.
pub fn monitor(scheduler: &Scheduler) -> anyhow::Result<()> {
    run_loop(scheduler, io::stdin().lock())
}

fn run_loop(scheduler: &Scheduler, input: impl BufRead) -> anyhow::Result<()> {
    let mut lines = input.lines();
    loop {
        print!("Type 'exit' to stop the scheduler: ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            info!("stdin closed, stopping scheduler");
            break;
        };
        match line?.trim() {
            "exit" => {
                info!("exit command received");
                break;
            }
            "status" => print_status(scheduler),
            other => println!("Unknown command: {other}"),
        }
    }

    if scheduler.is_running() {
        scheduler.stop()?;
    }
    Ok(())
}

fn print_status(scheduler: &Scheduler) {
    let state = if scheduler.is_running() {
        "running"
    } else {
        "stopped"
    };
    println!("scheduler is {state}");
    for task in scheduler.tasks() {
        let meta = task.meta();
        println!(
            "  [{}] {} ({}) period {}ms",
            meta.id(),
            meta.name(),
            task.kind(),
            meta.period_ms()
        );
        for (_, metric) in meta.metrics().iter() {
            println!("    {metric}");
        }
    }
}
