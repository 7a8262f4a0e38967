// src/pipeline/registry.rs

//! The four stock transform tasks and the backend abstraction the composer
//! and watch loop run them through.
//!
//! - [`Pipeline`] builds every task from a validated [`ConfigFile`] and runs
//!   them against the real filesystem.
//! - Tests implement [`TaskBackend`] themselves to record which classes
//!   were run without touching any files.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use crate::config::ConfigFile;
use crate::pipeline::task::TaskContext;
use crate::pipeline::{Branch, TaskSummary, TransformChain, TransformTask};
use crate::transforms::image::ImageMin;
use crate::transforms::rename::Rename;
use crate::transforms::script::{MinifyJs, Transpile};
use crate::transforms::style::{CleanCss, PostCss, SassCompile, SassGlob, browser_targets};
use crate::transforms::template::{FormatHtml, PugRender};
use crate::types::AssetClass;

/// Trait abstracting how a class's task is run.
pub trait TaskBackend: Send + Sync {
    /// Run the task for `class` over all of its current inputs.
    ///
    /// Per-file failures are reported and counted in the summary; only
    /// filesystem errors come back as `Err`.
    fn run_task(
        &self,
        class: AssetClass,
    ) -> Pin<Box<dyn Future<Output = Result<TaskSummary>> + Send + '_>>;
}

/// All four tasks, ready to run.
pub struct Pipeline {
    tasks: BTreeMap<AssetClass, Arc<TransformTask>>,
    ctx: TaskContext,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("tasks", &self.tasks)
            .field("ctx", &self.ctx)
            .finish()
    }
}

impl Pipeline {
    pub fn new(cfg: &ConfigFile, ctx: TaskContext) -> Result<Self> {
        let mut tasks = BTreeMap::new();
        for class in AssetClass::ALL {
            let task = match class {
                AssetClass::Style => style_task(cfg, &ctx.root)?,
                AssetClass::Script => script_task(cfg, &ctx.root),
                AssetClass::Image => image_task(cfg),
                AssetClass::Template => template_task(cfg, &ctx.root),
            };
            debug!(
                class = %class,
                upstream = ?task.upstream_stage_names(),
                "registered transform task"
            );
            tasks.insert(class, Arc::new(task));
        }
        Ok(Self { tasks, ctx })
    }

    pub fn task(&self, class: AssetClass) -> &Arc<TransformTask> {
        &self.tasks[&class]
    }

    pub fn context(&self) -> &TaskContext {
        &self.ctx
    }

    pub async fn run(&self, class: AssetClass) -> Result<TaskSummary> {
        Arc::clone(self.task(class))
            .run(&self.ctx)
            .await
            .with_context(|| format!("running {class} task"))
    }

    /// One line per task: class, stages and output branches.
    pub fn describe(&self) -> Vec<String> {
        self.tasks
            .values()
            .map(|task| {
                let branches: Vec<String> = task
                    .branches()
                    .iter()
                    .map(|b| format!("{}{:?}", b.name, b.chain.stage_names()))
                    .collect();
                format!(
                    "{}: {} -> {} => [{}]",
                    task.class(),
                    task.paths().input(),
                    task.paths().output().display(),
                    branches.join(", ")
                )
            })
            .collect()
    }
}

impl TaskBackend for Pipeline {
    fn run_task(
        &self,
        class: AssetClass,
    ) -> Pin<Box<dyn Future<Output = Result<TaskSummary>> + Send + '_>> {
        Box::pin(self.run(class))
    }
}

/// sass-glob -> sass -> postcss, then minify with source map and rename.
fn style_task(cfg: &ConfigFile, root: &Path) -> Result<TransformTask> {
    let targets = browser_targets(&cfg.style.browsers).context("resolving [style].browsers")?;
    let load_paths = cfg.style.include_paths.iter().map(|p| root.join(p)).collect();

    let upstream = TransformChain::new()
        .then(SassGlob)
        .then(SassCompile::new(cfg.style.output_style, load_paths))
        .then(PostCss::new(targets.clone()));
    let min = TransformChain::new()
        .then(CleanCss::new(targets, cfg.style.source_maps))
        .then(Rename::extname(".min.css"));

    Ok(TransformTask::new(
        cfg.paths().get(AssetClass::Style).clone(),
        upstream,
        vec![Branch::new("min", min)],
    )
    .skipping_partials())
}

/// transpile, then write both the plain and the minified result.
fn script_task(cfg: &ConfigFile, root: &Path) -> TransformTask {
    let upstream =
        TransformChain::new().then(Transpile::new(cfg.script.transpile_command(), root));
    let min = TransformChain::new()
        .then(MinifyJs)
        .then(Rename::extname(".min.js"));

    TransformTask::new(
        cfg.paths().get(AssetClass::Script).clone(),
        upstream,
        vec![Branch::passthrough("plain"), Branch::new("min", min)],
    )
}

fn image_task(cfg: &ConfigFile) -> TransformTask {
    TransformTask::new(
        cfg.paths().get(AssetClass::Image).clone(),
        TransformChain::new().then(ImageMin::new(&cfg.image)),
        vec![Branch::passthrough("out")],
    )
}

/// Every view renders, `_`-prefixed ones included; layouts meant only for
/// `extends` live outside the views directory.
fn template_task(cfg: &ConfigFile, root: &Path) -> TransformTask {
    let upstream = TransformChain::new()
        .then(PugRender::new(root.join(&cfg.template.basedir), cfg.template.pretty))
        .then(FormatHtml);

    TransformTask::new(
        cfg.paths().get(AssetClass::Template).clone(),
        upstream,
        vec![Branch::passthrough("html")],
    )
}
