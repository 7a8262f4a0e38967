// tests/watch_mode.rs

mod common;
use crate::common::{
    ConfigFileBuilder, CountingReloader, FakeTaskBackend, Project, eventually, init_tracing,
    with_timeout,
};

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use notify::event::{DataChange, ModifyKind};
use notify::{Event, EventKind};
use tokio::sync::mpsc;

use assetflow::engine::{WatchLoop, shutdown_channel};
use assetflow::types::AssetClass;
use assetflow::watch::{build_bindings, spawn_watcher, triggers_for_event};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn one_js_change_runs_only_the_script_task_once() -> TestResult {
    init_tracing();
    let project = Project::new();
    let cfg = ConfigFileBuilder::new().build();
    let bindings = build_bindings(cfg.paths())?;

    let event = Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
        .add_path(project.path("src/assets/js/main.js"));
    let triggers = triggers_for_event(project.root(), &event, &bindings);
    assert_eq!(triggers.len(), 1);

    let (tx, rx) = mpsc::unbounded_channel();
    for trigger in triggers {
        tx.send(trigger)?;
    }
    drop(tx);

    let backend = Arc::new(FakeTaskBackend::default());
    let reloads = Arc::new(CountingReloader::default());
    let (_stop, shutdown) = shutdown_channel();
    with_timeout(WatchLoop::new(backend.clone(), reloads.clone(), rx, shutdown).run()).await?;

    assert_eq!(backend.runs(), vec![AssetClass::Script]);
    assert_eq!(reloads.fired(), vec![AssetClass::Script]);
    Ok(())
}

#[tokio::test]
async fn real_watcher_drives_the_loop_until_shutdown() -> TestResult {
    init_tracing();
    let project = Project::new();
    project.write("src/assets/js/.keep", "");
    let cfg = ConfigFileBuilder::new().build();

    let (tx, rx) = mpsc::unbounded_channel();
    let _watcher = spawn_watcher(project.root(), build_bindings(cfg.paths())?, tx)?;

    let backend = Arc::new(FakeTaskBackend::default());
    let reloads = Arc::new(CountingReloader::default());
    let (stop, shutdown) = shutdown_channel();
    let watch = tokio::spawn(
        WatchLoop::new(backend.clone(), reloads.clone(), rx, shutdown).run(),
    );

    project.write("src/assets/js/main.js", "let a = 1;");

    eventually("a script reload", || reloads.count(AssetClass::Script) > 0).await;
    // Let any follow-up events for the same write settle.
    tokio::time::sleep(Duration::from_millis(200)).await;

    stop.trigger();
    with_timeout(watch).await??;

    // notify may report one write as several events; each one is a run.
    let script_runs = backend.count(AssetClass::Script);
    assert!(script_runs >= 1);
    assert_eq!(backend.runs().len(), script_runs, "only the script task ran");
    assert_eq!(reloads.count(AssetClass::Script), script_runs);
    assert_eq!(reloads.fired().len(), script_runs);
    Ok(())
}

#[tokio::test]
async fn filesystem_error_terminates_watch_mode() -> TestResult {
    init_tracing();
    let (tx, rx) = mpsc::unbounded_channel();
    tx.send(assetflow::watch::WatchTrigger {
        class: AssetClass::Style,
        rel_path: "src/assets/scss/base.scss".to_string(),
    })?;

    let backend = Arc::new(FakeTaskBackend::failing(AssetClass::Style));
    let reloads = Arc::new(CountingReloader::default());
    let (_stop, shutdown) = shutdown_channel();

    let result = with_timeout(WatchLoop::new(backend, reloads.clone(), rx, shutdown).run()).await;
    let err = result.expect_err("watch loop should stop on a filesystem error");
    assert!(format!("{err:#}").contains("simulated write failure"), "{err:#}");
    assert!(reloads.fired().is_empty());
    drop(tx);
    Ok(())
}
