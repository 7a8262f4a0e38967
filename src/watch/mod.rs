// src/watch/mod.rs

//! File watching.
//!
//! This module is responsible for:
//! - Compiling each asset class's watch globs into a [`WatchBinding`].
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Turning raw notify events into per-class [`WatchTrigger`]s.
//!
//! It does not run tasks; the watch loop in `engine` consumes the triggers.

pub mod event_handler;
pub mod patterns;
pub mod watcher;

use crate::types::AssetClass;

/// A change to a watched path that should re-run `class`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTrigger {
    pub class: AssetClass,
    /// Changed path relative to the project root, forward slashes.
    pub rel_path: String,
}

pub use event_handler::{is_relevant, triggers_for_event};
pub use patterns::{WatchBinding, build_bindings};
pub use watcher::{WatcherHandle, spawn_watcher};
