// src/engine/nodes.rs

//! The production [`NodeExecutor`]: real tasks, a real watcher and a real
//! HTTP server.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::ConfigFile;
use crate::engine::composer::NodeExecutor;
use crate::engine::graph::Node;
use crate::engine::shutdown::Shutdown;
use crate::engine::watch_loop::WatchLoop;
use crate::pipeline::{Pipeline, TaskBackend};
use crate::server::{DevServer, LiveReload};
use crate::types::AssetClass;
use crate::watch::{WatchBinding, build_bindings, spawn_watcher};

/// Where and what the dev server serves.
#[derive(Debug, Clone)]
pub struct ServeSettings {
    pub host: String,
    pub port: u16,
    /// Absolute (or root-joined) directory to serve.
    pub dir: PathBuf,
}

impl ServeSettings {
    /// `[server]` settings, with an optional port override from the CLI.
    ///
    /// Without `[server].root` the template output directory is served.
    pub fn from_config(cfg: &ConfigFile, root: &std::path::Path, port: Option<u16>) -> Self {
        let dir = match &cfg.server.root {
            Some(dir) => root.join(dir),
            None => root.join(cfg.paths().get(AssetClass::Template).output()),
        };
        Self {
            host: cfg.server.host.clone(),
            port: port.unwrap_or(cfg.server.port),
            dir,
        }
    }
}

#[derive(Debug)]
pub struct ProductionNodes {
    pipeline: Arc<Pipeline>,
    bindings: Vec<WatchBinding>,
    serve: ServeSettings,
    reload: LiveReload,
    shutdown: Shutdown,
}

impl ProductionNodes {
    pub fn new(
        cfg: &ConfigFile,
        pipeline: Arc<Pipeline>,
        serve: ServeSettings,
        reload: LiveReload,
        shutdown: Shutdown,
    ) -> Result<Self> {
        Ok(Self {
            bindings: build_bindings(cfg.paths())?,
            pipeline,
            serve,
            reload,
            shutdown,
        })
    }

    /// Ctrl-C abandons the build without an error, so `--once` exits 0
    /// and watch mode winds down as usual.
    async fn build(&self, class: AssetClass) -> Result<()> {
        let summary = tokio::select! {
            biased;
            _ = self.shutdown.wait() => {
                warn!(class = %class, "build of {class} interrupted; outputs may be incomplete");
                return Ok(());
            }
            summary = self.pipeline.run(class) => summary?,
        };
        info!(
            class = %class,
            inputs = summary.inputs,
            written = summary.written.len(),
            failures = summary.failures,
            "initial build of {class} done"
        );
        Ok(())
    }

    async fn watch(&self) -> Result<()> {
        let root = self.pipeline.context().root.clone();
        let (tx, rx) = mpsc::unbounded_channel();
        // Dropping the handle stops the watcher, so hold it for the loop.
        let _watcher = spawn_watcher(root, self.bindings.clone(), tx)?;

        let backend: Arc<dyn TaskBackend> = self.pipeline.clone();
        WatchLoop::new(
            backend,
            Arc::new(self.reload.clone()),
            rx,
            self.shutdown.clone(),
        )
        .run()
        .await
    }

    async fn serve(&self) -> Result<()> {
        let handle = DevServer::start(
            &self.serve.host,
            self.serve.port,
            self.serve.dir.clone(),
            self.reload.clone(),
        )
        .await?;
        self.shutdown.wait().await;
        handle.stop().await
    }
}

impl NodeExecutor for ProductionNodes {
    fn run_node(&self, node: Node) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        match node {
            Node::Task(class) => Box::pin(self.build(class)),
            Node::WatchLoop => Box::pin(self.watch()),
            Node::DevServer => Box::pin(self.serve()),
        }
    }
}
