//! Recording stand-ins for the crate's injectable capabilities.

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Result, anyhow};

use assetflow::engine::{Node, NodeExecutor};
use assetflow::pipeline::{FailureReport, Reporter, TaskBackend, TaskSummary};
use assetflow::server::ReloadTrigger;
use assetflow::types::AssetClass;

/// Collects every reported failure.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    reports: Mutex<Vec<FailureReport>>,
}

impl RecordingReporter {
    pub fn reports(&self) -> Vec<FailureReport> {
        self.reports.lock().unwrap().clone()
    }
}

impl Reporter for RecordingReporter {
    fn report(&self, report: FailureReport) {
        self.reports.lock().unwrap().push(report);
    }
}

/// Counts reloads per class, in the order they fired.
#[derive(Debug, Default)]
pub struct CountingReloader {
    fired: Mutex<Vec<AssetClass>>,
}

impl CountingReloader {
    pub fn fired(&self) -> Vec<AssetClass> {
        self.fired.lock().unwrap().clone()
    }

    pub fn count(&self, class: AssetClass) -> usize {
        self.fired.lock().unwrap().iter().filter(|c| **c == class).count()
    }
}

impl ReloadTrigger for CountingReloader {
    fn reload(&self, class: AssetClass) {
        self.fired.lock().unwrap().push(class);
    }
}

/// A task backend that records which classes ran instead of touching files.
#[derive(Debug, Default)]
pub struct FakeTaskBackend {
    runs: Mutex<Vec<AssetClass>>,
    failing: Option<AssetClass>,
}

impl FakeTaskBackend {
    /// Runs of `class` fail with a filesystem-style error.
    pub fn failing(class: AssetClass) -> Self {
        Self {
            failing: Some(class),
            ..Self::default()
        }
    }

    pub fn runs(&self) -> Vec<AssetClass> {
        self.runs.lock().unwrap().clone()
    }

    pub fn count(&self, class: AssetClass) -> usize {
        self.runs.lock().unwrap().iter().filter(|c| **c == class).count()
    }
}

impl TaskBackend for FakeTaskBackend {
    fn run_task(
        &self,
        class: AssetClass,
    ) -> Pin<Box<dyn Future<Output = Result<TaskSummary>> + Send + '_>> {
        Box::pin(async move {
            self.runs.lock().unwrap().push(class);
            if self.failing == Some(class) {
                return Err(anyhow!("simulated write failure for {class}"));
            }
            Ok(TaskSummary::default())
        })
    }
}

/// Event recorded by [`RecordingNodes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeEvent {
    Started(Node),
    Finished(Node),
}

/// A node executor that sleeps briefly per node and records start/finish.
#[derive(Debug, Default)]
pub struct RecordingNodes {
    events: Mutex<Vec<NodeEvent>>,
    failing: Option<Node>,
}

impl RecordingNodes {
    pub fn failing(node: Node) -> Self {
        Self {
            failing: Some(node),
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<NodeEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn position(&self, event: NodeEvent) -> Option<usize> {
        self.events.lock().unwrap().iter().position(|e| *e == event)
    }
}

impl NodeExecutor for RecordingNodes {
    fn run_node(&self, node: Node) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.events.lock().unwrap().push(NodeEvent::Started(node));
            tokio::time::sleep(Duration::from_millis(20)).await;
            if self.failing == Some(node) {
                return Err(anyhow!("{node} exploded"));
            }
            self.events.lock().unwrap().push(NodeEvent::Finished(node));
            Ok(())
        })
    }
}
