// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod pipeline;
pub mod server;
pub mod transforms;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::resolve_config;
use crate::engine::{
    BuildGraph, ProductionNodes, ServeSettings, build_once, run_graph, shutdown_channel,
    watch_mode,
};
use crate::fs::RealFileSystem;
use crate::pipeline::{ConsoleReporter, Pipeline, TaskContext};
use crate::server::LiveReload;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the four transform tasks
/// - the build graph (build once, or build then watch + serve)
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let (config_path, explicit) = args.config_path();
    let cfg = resolve_config(&config_path, explicit)?;
    let root = config_root_dir(&config_path);

    let composition = if args.once { build_once() } else { watch_mode() };
    let graph = BuildGraph::from_composition(&composition)?;
    let serve = ServeSettings::from_config(&cfg, &root, args.port);

    let ctx = TaskContext {
        root: root.clone(),
        fs: Arc::new(RealFileSystem),
        reporter: Arc::new(ConsoleReporter),
    };
    let pipeline = Arc::new(Pipeline::new(&cfg, ctx)?);

    if args.dry_run {
        print_dry_run(&config_path, &pipeline, &graph, &serve, args.once);
        return Ok(());
    }

    // Ctrl-C -> graceful shutdown of the watcher and the dev server.
    let (trigger, shutdown) = shutdown_channel();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("failed to listen for Ctrl+C: {e}");
            return;
        }
        info!("Ctrl+C received; shutting down");
        trigger.trigger();
    });

    info!(root = ?root, once = args.once, "assetflow starting");
    let nodes = ProductionNodes::new(&cfg, pipeline, serve, LiveReload::new(), shutdown)?;
    run_graph(&graph, Arc::new(nodes)).await
}

/// Figure out the project root all paths are relative to.
///
/// - If the config path has a non-empty parent (e.g. "web/Assetflow.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Assetflow.toml" (parent = ""),
///   we fall back to the current working directory "."
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Print the path table, the stage chains and the build graph.
fn print_dry_run(
    config_path: &Path,
    pipeline: &Pipeline,
    graph: &BuildGraph,
    serve: &ServeSettings,
    once: bool,
) {
    println!("assetflow dry-run");
    println!("  config = {}", config_path.display());
    println!("  root = {}", pipeline.context().root.display());
    println!();

    println!("tasks:");
    for line in pipeline.describe() {
        println!("  - {line}");
    }
    println!();

    println!("build graph ({}):", if once { "once" } else { "watch" });
    for line in graph.describe() {
        println!("  - {line}");
    }

    if !once {
        println!();
        println!(
            "dev server: http://{}:{} serving {}",
            serve.host,
            serve.port,
            serve.dir.display()
        );
    }

    debug!("dry-run complete (no execution)");
}
