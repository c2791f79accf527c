//! `metronome-tasks` — the built-in task kinds.
//!
//! | Tag               | Behaviour                                         |
//! |-------------------|---------------------------------------------------|
//! | `system`          | Simulated blocking I/O (random 2-6s sleep)        |
//! | `network`         | Simulated network call (random 1-5s sleep)        |
//! | `network:connect` | TCP connect latency probe with a `connect-time(ms)` metric |
//!
//! Call [`builtin_registry`] at startup to get a [`TaskRegistry`] with all
//! of them registered.

pub mod connect;
pub mod network;
pub mod system;

pub use connect::ConnectTask;
pub use network::NetworkTask;
pub use system::SystemTask;

use metronome_scheduler::TaskRegistry;

/// Registry with every built-in task kind registered.
pub fn builtin_registry() -> TaskRegistry {
    let mut registry = TaskRegistry::new();
    registry.register(system::KIND, SystemTask::factory);
    registry.register(network::KIND, NetworkTask::factory);
    registry.register(connect::KIND, ConnectTask::factory);
    registry
}
