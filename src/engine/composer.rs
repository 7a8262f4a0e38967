// src/engine/composer.rs

//! Runs a [`BuildGraph`]: every node starts as soon as all of its
//! predecessors have finished successfully.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::engine::graph::{BuildGraph, Node};

/// Trait abstracting how a single graph node is executed.
///
/// Production code runs real tasks, the watcher and the dev server; tests
/// record the order nodes were started in.
pub trait NodeExecutor: Send + Sync + 'static {
    fn run_node(&self, node: Node) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Run `graph` to completion.
///
/// The first node error aborts every node still running and is returned.
pub async fn run_graph<E: NodeExecutor>(graph: &BuildGraph, executor: Arc<E>) -> Result<()> {
    let mut waiting: BTreeMap<Node, usize> = graph
        .nodes()
        .iter()
        .map(|&node| (node, graph.predecessors(node).len()))
        .collect();

    let mut running: JoinSet<(Node, Result<()>)> = JoinSet::new();
    let ready: Vec<Node> = waiting
        .iter()
        .filter(|(_, pending)| **pending == 0)
        .map(|(&node, _)| node)
        .collect();
    for node in ready {
        waiting.remove(&node);
        spawn_node(&mut running, &executor, node);
    }

    while let Some(joined) = running.join_next().await {
        let (node, result) = match joined {
            Ok(done) => done,
            Err(err) => {
                running.abort_all();
                return Err(anyhow!("build graph node panicked: {err}"));
            }
        };

        if let Err(err) = result {
            error!(%node, error = %err, "node failed; aborting build graph");
            running.abort_all();
            return Err(err.context(format!("`{node}` failed")));
        }
        debug!(%node, "node finished");

        for next in graph.successors(node) {
            let Some(pending) = waiting.get_mut(&next) else {
                continue;
            };
            *pending -= 1;
            if *pending == 0 {
                waiting.remove(&next);
                spawn_node(&mut running, &executor, next);
            }
        }
    }

    info!("build graph finished");
    Ok(())
}

fn spawn_node<E: NodeExecutor>(
    running: &mut JoinSet<(Node, Result<()>)>,
    executor: &Arc<E>,
    node: Node,
) {
    info!(%node, "starting");
    let executor = Arc::clone(executor);
    running.spawn(async move {
        let result = executor.run_node(node).await;
        (node, result)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::graph::{build_once, parallel, series, watch_mode};
    use crate::types::AssetClass;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Mark {
        Start(Node),
        End(Node),
    }

    #[derive(Default)]
    struct Recorder {
        marks: Mutex<Vec<Mark>>,
        fail: Option<Node>,
    }

    impl NodeExecutor for Recorder {
        fn run_node(&self, node: Node) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
            Box::pin(async move {
                self.marks.lock().unwrap().push(Mark::Start(node));
                tokio::time::sleep(Duration::from_millis(10)).await;
                if self.fail == Some(node) {
                    return Err(anyhow!("boom"));
                }
                self.marks.lock().unwrap().push(Mark::End(node));
                Ok(())
            })
        }
    }

    fn position(marks: &[Mark], mark: Mark) -> usize {
        marks.iter().position(|m| *m == mark).unwrap()
    }

    #[tokio::test]
    async fn long_lived_nodes_start_after_every_task_ends() {
        let graph = BuildGraph::from_composition(&watch_mode()).unwrap();
        let recorder = Arc::new(Recorder::default());
        run_graph(&graph, Arc::clone(&recorder)).await.unwrap();

        let marks = recorder.marks.lock().unwrap().clone();
        assert_eq!(marks.len(), 12);
        for class in AssetClass::ALL {
            let end = position(&marks, Mark::End(Node::Task(class)));
            assert!(end < position(&marks, Mark::Start(Node::WatchLoop)));
            assert!(end < position(&marks, Mark::Start(Node::DevServer)));
        }
    }

    #[tokio::test]
    async fn independent_tasks_overlap() {
        let graph = BuildGraph::from_composition(&build_once()).unwrap();
        let recorder = Arc::new(Recorder::default());
        run_graph(&graph, Arc::clone(&recorder)).await.unwrap();

        let marks = recorder.marks.lock().unwrap().clone();
        assert!(marks[..4].iter().all(|m| matches!(m, Mark::Start(_))));
    }

    #[tokio::test]
    async fn failure_stops_dependents() {
        let style = Node::Task(AssetClass::Style);
        let graph =
            BuildGraph::from_composition(&series([parallel([style]), parallel([Node::DevServer])]))
                .unwrap();
        let recorder = Arc::new(Recorder {
            fail: Some(style),
            ..Recorder::default()
        });

        let err = run_graph(&graph, Arc::clone(&recorder)).await.unwrap_err();
        assert!(format!("{err:#}").contains("`style` failed: boom"), "{err:#}");

        let marks = recorder.marks.lock().unwrap().clone();
        assert_eq!(marks, vec![Mark::Start(style)]);
    }
}
