// src/engine/watch_loop.rs

use std::fmt;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::engine::shutdown::Shutdown;
use crate::pipeline::{TaskBackend, TaskSummary};
use crate::server::ReloadTrigger;
use crate::types::AssetClass;
use crate::watch::WatchTrigger;

type RunOutcome = (AssetClass, Result<TaskSummary>);

/// Re-runs a class's task for every watch trigger, then fires a reload.
///
/// Every trigger produces one run. Runs are neither debounced nor
/// serialized, so two runs of the same class may overlap.
pub struct WatchLoop {
    backend: Arc<dyn TaskBackend>,
    reload: Arc<dyn ReloadTrigger>,
    triggers: mpsc::UnboundedReceiver<WatchTrigger>,
    shutdown: Shutdown,
}

impl fmt::Debug for WatchLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchLoop")
            .field("shutdown", &self.shutdown)
            .finish_non_exhaustive()
    }
}

impl WatchLoop {
    pub fn new(
        backend: Arc<dyn TaskBackend>,
        reload: Arc<dyn ReloadTrigger>,
        triggers: mpsc::UnboundedReceiver<WatchTrigger>,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            backend,
            reload,
            triggers,
            shutdown,
        }
    }

    /// Loop until shutdown or until the trigger channel closes.
    ///
    /// Runs still in flight at that point are allowed to settle. A run that
    /// fails with a filesystem error ends the loop with that error.
    pub async fn run(self) -> Result<()> {
        let Self {
            backend,
            reload,
            mut triggers,
            shutdown,
        } = self;
        let mut running: JoinSet<RunOutcome> = JoinSet::new();

        info!("watching for changes");
        loop {
            tokio::select! {
                _ = shutdown.wait() => {
                    info!("shutdown requested; leaving watch loop");
                    break;
                }
                maybe = triggers.recv() => {
                    let Some(trigger) = maybe else {
                        debug!("watch trigger channel closed");
                        break;
                    };
                    info!(class = %trigger.class, file = %trigger.rel_path, "change detected");
                    running.spawn(run_and_reload(
                        Arc::clone(&backend),
                        Arc::clone(&reload),
                        trigger.class,
                    ));
                }
                Some(joined) = running.join_next(), if !running.is_empty() => {
                    if let Err(err) = settle(joined) {
                        running.abort_all();
                        return Err(err);
                    }
                }
            }
        }

        while let Some(joined) = running.join_next().await {
            settle(joined)?;
        }
        Ok(())
    }
}

async fn run_and_reload(
    backend: Arc<dyn TaskBackend>,
    reload: Arc<dyn ReloadTrigger>,
    class: AssetClass,
) -> RunOutcome {
    let result = backend.run_task(class).await;
    if result.is_ok() {
        // Per-file failures still count as a settled run.
        reload.reload(class);
    }
    (class, result)
}

fn settle(joined: std::result::Result<RunOutcome, tokio::task::JoinError>) -> Result<()> {
    let (class, result) = joined.map_err(|e| anyhow!("watch-mode task panicked: {e}"))?;
    match result {
        Ok(summary) => {
            if summary.failures > 0 {
                warn!(class = %class, failures = summary.failures, "rebuild finished with errors");
            } else {
                debug!(class = %class, written = summary.written.len(), "rebuild finished");
            }
            Ok(())
        }
        Err(err) => Err(err.context(format!("{class} rebuild failed in watch mode"))),
    }
}
