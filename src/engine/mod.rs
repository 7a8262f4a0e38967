// src/engine/mod.rs

//! Orchestration engine for assetflow.
//!
//! This module ties together:
//! - the build graph of tasks, watcher and dev server ([`graph`])
//! - the composer that runs a graph respecting its ordering ([`composer`])
//! - the watch loop that re-runs tasks and fires reloads ([`watch_loop`])
//! - the production node executor ([`nodes`])
//! - Ctrl-C driven shutdown ([`shutdown`])

pub mod composer;
pub mod graph;
pub mod nodes;
pub mod shutdown;
pub mod watch_loop;

pub use composer::{NodeExecutor, run_graph};
pub use graph::{BuildGraph, Composition, Node, build_once, parallel, series, watch_mode};
pub use nodes::{ProductionNodes, ServeSettings};
pub use shutdown::{Shutdown, ShutdownTrigger, shutdown_channel};
pub use watch_loop::WatchLoop;
