// src/watch/mod.rs

//! Watch mode: keep the process alive and re-render on demand.
//!
//! - [`gate`] serialises passes so only one runs at a time and bursts of
//!   triggers collapse into one follow-up pass.
//! - [`trigger`] reads `reload` / `quit` commands from an input stream.
//! - [`watcher`] turns source-tree changes into reload signals (`notify`).
//! - [`pass`] is the pass runner used by the `watch` command.

pub mod gate;
pub mod pass;
pub mod trigger;
pub mod watcher;

pub use gate::{GateHandle, GatePhase, PassRunner, ReloadGate, DEFAULT_SHUTDOWN_TIMEOUT};
pub use pass::{startup_only_changes, WatchPass};
pub use trigger::{read_commands, InputEnd, TriggerCommand};
pub use watcher::{spawn_source_watcher, SourceWatcher};
