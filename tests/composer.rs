// tests/composer.rs

mod common;
use crate::common::{NodeEvent, RecordingNodes, init_tracing, with_timeout};

use std::error::Error;
use std::sync::Arc;

use assetflow::engine::{BuildGraph, Node, build_once, parallel, run_graph, series, watch_mode};
use assetflow::errors::AssetflowError;
use assetflow::types::AssetClass;

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn watch_and_serve_start_only_after_the_initial_build() -> TestResult {
    init_tracing();
    let graph = BuildGraph::from_composition(&watch_mode())?;
    let nodes = Arc::new(RecordingNodes::default());
    with_timeout(run_graph(&graph, Arc::clone(&nodes))).await?;

    let watch_start = nodes.position(NodeEvent::Started(Node::WatchLoop)).unwrap();
    let serve_start = nodes.position(NodeEvent::Started(Node::DevServer)).unwrap();
    for class in AssetClass::ALL {
        let done = nodes.position(NodeEvent::Finished(Node::Task(class))).unwrap();
        assert!(done < watch_start, "{class} finished after watch started");
        assert!(done < serve_start, "{class} finished after serve started");
    }
    Ok(())
}

#[tokio::test]
async fn initial_build_tasks_run_concurrently() -> TestResult {
    init_tracing();
    let graph = BuildGraph::from_composition(&build_once())?;
    let nodes = Arc::new(RecordingNodes::default());
    with_timeout(run_graph(&graph, Arc::clone(&nodes))).await?;

    let events = nodes.events();
    assert_eq!(events.len(), 8);
    assert!(
        events[..4].iter().all(|e| matches!(e, NodeEvent::Started(_))),
        "{events:?}"
    );
    Ok(())
}

#[tokio::test]
async fn failing_task_prevents_watch_mode() -> TestResult {
    init_tracing();
    let graph = BuildGraph::from_composition(&watch_mode())?;
    let nodes = Arc::new(RecordingNodes::failing(Node::Task(AssetClass::Image)));

    let err = with_timeout(run_graph(&graph, Arc::clone(&nodes)))
        .await
        .expect_err("graph should fail");
    assert!(format!("{err:#}").contains("image exploded"), "{err:#}");
    assert_eq!(nodes.position(NodeEvent::Started(Node::WatchLoop)), None);
    assert_eq!(nodes.position(NodeEvent::Started(Node::DevServer)), None);
    Ok(())
}

#[test]
fn self_dependent_composition_is_rejected() {
    let style = Node::Task(AssetClass::Style);
    let comp = series([parallel([style, Node::WatchLoop]), parallel([style])]);
    match BuildGraph::from_composition(&comp) {
        Err(AssetflowError::GraphCycle(msg)) => assert!(msg.contains("style"), "{msg}"),
        other => panic!("expected GraphCycle, got {other:?}"),
    }
}
