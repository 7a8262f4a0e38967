// src/pipeline/task.rs

//! A transform task: one shared upstream chain fanned out into named output
//! branches, run over every input file of one asset class.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::config::paths::{ClassPaths, collect_matching_files};
use crate::fs::FileSystem;
use crate::pipeline::report::{FailureReport, Reporter};
use crate::pipeline::{Artifact, StageFailure, TransformChain};
use crate::types::AssetClass;

/// A named output chain hanging off the task's upstream chain.
///
/// Every branch receives its own copy of the upstream result and ends in a
/// write, so a task with two branches writes two artifacts per input.
#[derive(Debug)]
pub struct Branch {
    pub name: &'static str,
    pub chain: TransformChain,
}

impl Branch {
    pub fn new(name: &'static str, chain: TransformChain) -> Self {
        Self { name, chain }
    }

    /// A branch that writes the upstream result unchanged.
    pub fn passthrough(name: &'static str) -> Self {
        Self::new(name, TransformChain::new())
    }
}

/// Shared handles a task run needs.
#[derive(Clone)]
pub struct TaskContext {
    /// Project root all path-table entries are relative to.
    pub root: PathBuf,
    pub fs: Arc<dyn FileSystem>,
    pub reporter: Arc<dyn Reporter>,
}

impl fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskContext")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

/// Result of one task run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskSummary {
    /// Input files considered (partials excluded).
    pub inputs: usize,
    /// Files written, relative to the project root.
    pub written: Vec<PathBuf>,
    /// Per-file failures that were reported and skipped.
    pub failures: usize,
}

struct FileOutcome {
    written: Vec<PathBuf>,
    failures: usize,
}

pub struct TransformTask {
    class: AssetClass,
    paths: ClassPaths,
    upstream: TransformChain,
    branches: Vec<Branch>,
    skip_partials: bool,
}

impl fmt::Debug for TransformTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformTask")
            .field("class", &self.class)
            .field("upstream", &self.upstream)
            .field("branches", &self.branches)
            .finish_non_exhaustive()
    }
}

impl TransformTask {
    pub fn new(paths: ClassPaths, upstream: TransformChain, branches: Vec<Branch>) -> Self {
        Self {
            class: paths.class(),
            paths,
            upstream,
            branches,
            skip_partials: false,
        }
    }

    /// Treat `_name` files and the contents of `_dir/` directories as
    /// partials that are only ever imported, never rendered on their own.
    pub fn skipping_partials(mut self) -> Self {
        self.skip_partials = true;
        self
    }

    pub fn class(&self) -> AssetClass {
        self.class
    }

    pub fn paths(&self) -> &ClassPaths {
        &self.paths
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    pub fn upstream_stage_names(&self) -> Vec<&'static str> {
        self.upstream.stage_names()
    }

    /// Run the task over every current input file.
    ///
    /// Files are processed concurrently on the blocking pool; each file's
    /// stages run in order. Stage failures are reported and skipped, while
    /// filesystem errors abort the run and are returned.
    pub async fn run(self: Arc<Self>, ctx: &TaskContext) -> Result<TaskSummary> {
        let files = {
            let task = Arc::clone(&self);
            let ctx = ctx.clone();
            tokio::task::spawn_blocking(move || task.entry_files(&ctx))
                .await
                .map_err(|e| anyhow!("file discovery panicked: {e}"))??
        };

        info!(class = %self.class, files = files.len(), "running transform task");

        let mut summary = TaskSummary {
            inputs: files.len(),
            ..TaskSummary::default()
        };

        let mut set = JoinSet::new();
        for file in files {
            let task = Arc::clone(&self);
            let ctx = ctx.clone();
            set.spawn_blocking(move || task.process_file(&ctx, &file));
        }

        while let Some(joined) = set.join_next().await {
            let outcome = joined.map_err(|e| anyhow!("transform worker panicked: {e}"))??;
            summary.written.extend(outcome.written);
            summary.failures += outcome.failures;
        }

        summary.written.sort();
        info!(
            class = %self.class,
            written = summary.written.len(),
            failures = summary.failures,
            "transform task settled"
        );
        Ok(summary)
    }

    fn entry_files(&self, ctx: &TaskContext) -> Result<Vec<PathBuf>> {
        let files = collect_matching_files(ctx.fs.as_ref(), &ctx.root, &self.paths)?;
        if !self.skip_partials {
            return Ok(files);
        }
        let base = ctx.root.join(self.paths.base());
        Ok(files
            .into_iter()
            .filter(|path| !is_partial(path.strip_prefix(&base).unwrap_or(path)))
            .collect())
    }

    fn process_file(&self, ctx: &TaskContext, path: &Path) -> Result<FileOutcome> {
        let contents = ctx.fs.read(path)?;
        let base = ctx.root.join(self.paths.base());
        let rel = path
            .strip_prefix(&base)
            .with_context(|| format!("{:?} is outside of {:?}", path, base))?;

        debug!(class = %self.class, file = ?path, "transforming");

        let artifact = Artifact::new(path, rel, contents);
        let upstream = match self.upstream.run(artifact) {
            Ok(a) => a,
            Err(failure) => {
                self.report(ctx, path, failure);
                return Ok(FileOutcome {
                    written: Vec::new(),
                    failures: 1,
                });
            }
        };

        let mut written = Vec::new();
        let mut failures = 0;
        for branch in &self.branches {
            match branch.chain.run(upstream.clone()) {
                Ok(out) => written.extend(self.write_artifact(ctx, &out)?),
                Err(failure) => {
                    debug!(class = %self.class, branch = branch.name, "branch failed");
                    self.report(ctx, path, failure);
                    failures += 1;
                }
            }
        }

        Ok(FileOutcome { written, failures })
    }

    fn write_artifact(&self, ctx: &TaskContext, artifact: &Artifact) -> Result<Vec<PathBuf>> {
        let out_dir = self.paths.output();
        let mut written = Vec::with_capacity(2);

        let target = out_dir.join(&artifact.rel_path);
        ctx.fs.write(&ctx.root.join(&target), &artifact.contents)?;
        written.push(target);

        if let Some(map) = &artifact.source_map {
            let target = out_dir.join(&map.rel_path);
            ctx.fs.write(&ctx.root.join(&target), map.json.as_bytes())?;
            written.push(target);
        }

        Ok(written)
    }

    fn report(&self, ctx: &TaskContext, path: &Path, failure: StageFailure) {
        let file = path.strip_prefix(&ctx.root).unwrap_or(path).to_path_buf();
        ctx.reporter.report(FailureReport {
            class: self.class,
            stage: failure.stage,
            file,
            kind: failure.error.kind,
            message: failure.error.message,
        });
    }
}

fn is_partial(rel: &Path) -> bool {
    rel.components().any(|c| c.as_os_str().to_string_lossy().starts_with('_'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::paths::PathEntry;
    use crate::fs::mock::MockFileSystem;
    use crate::pipeline::tests::{FailOnBang, Tag};
    use crate::transforms::rename::Rename;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording(Mutex<Vec<FailureReport>>);

    impl Reporter for Recording {
        fn report(&self, report: FailureReport) {
            self.0.lock().unwrap().push(report);
        }
    }

    fn context(fs: &MockFileSystem, reporter: Arc<Recording>) -> TaskContext {
        TaskContext {
            root: PathBuf::from("."),
            fs: Arc::new(fs.clone()),
            reporter,
        }
    }

    fn script_like_task() -> Arc<TransformTask> {
        let paths = ClassPaths::compile(
            AssetClass::Script,
            &PathEntry::new("src/js/**/*.js", "dist/js"),
        )
        .unwrap();
        Arc::new(TransformTask::new(
            paths,
            TransformChain::new().then(FailOnBang),
            vec![
                Branch::passthrough("plain"),
                Branch::new(
                    "min",
                    TransformChain::new().then(Tag("-min")).then(Rename::extname(".min.js")),
                ),
            ],
        ))
    }

    #[test]
    fn partial_detection_looks_at_every_component() {
        assert!(is_partial(Path::new("_reset.scss")));
        assert!(is_partial(Path::new("_layouts/base.pug")));
        assert!(!is_partial(Path::new("pages/index.pug")));
    }

    #[tokio::test]
    async fn writes_every_branch_and_keeps_relative_paths() {
        let fs = MockFileSystem::new();
        fs.add_file("./src/js/main.js", b"let a;");
        fs.add_file("./src/js/lib/util.js", b"let b;");
        let reporter = Arc::new(Recording::default());

        let summary = script_like_task()
            .run(&context(&fs, reporter.clone()))
            .await
            .unwrap();

        assert_eq!(summary.inputs, 2);
        assert_eq!(summary.failures, 0);
        assert_eq!(summary.written.len(), 4);
        assert_eq!(fs.contents("./dist/js/lib/util.js").unwrap(), b"let b;");
        assert_eq!(fs.contents("./dist/js/lib/util.min.js").unwrap(), b"let b;-min");
        assert!(reporter.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn stage_failure_is_reported_and_other_files_continue() {
        let fs = MockFileSystem::new();
        fs.add_file("./src/js/bad.js", b"oops!");
        fs.add_file("./src/js/good.js", b"fine");
        let reporter = Arc::new(Recording::default());

        let summary = script_like_task()
            .run(&context(&fs, reporter.clone()))
            .await
            .unwrap();

        assert_eq!(summary.failures, 1);
        assert!(fs.contents("./dist/js/good.js").is_some());
        assert!(fs.contents("./dist/js/bad.js").is_none());

        let reports = reporter.0.lock().unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].stage, "bang");
        assert_eq!(reports[0].file, PathBuf::from("src/js/bad.js"));
    }

    #[tokio::test]
    async fn partials_are_skipped_only_when_requested() {
        let fs = MockFileSystem::new();
        fs.add_file("./src/js/_shared.js", b"x");
        fs.add_file("./src/js/main.js", b"y");
        let reporter = Arc::new(Recording::default());

        let plain = script_like_task().run(&context(&fs, reporter.clone())).await.unwrap();
        assert_eq!(plain.inputs, 2);

        let paths = ClassPaths::compile(
            AssetClass::Style,
            &PathEntry::new("src/js/**/*.js", "dist/partials"),
        )
        .unwrap();
        let skipping = Arc::new(
            TransformTask::new(paths, TransformChain::new(), vec![Branch::passthrough("out")])
                .skipping_partials(),
        );
        let summary = skipping.run(&context(&fs, reporter)).await.unwrap();
        assert_eq!(summary.inputs, 1);
        assert_eq!(summary.written, vec![PathBuf::from("dist/partials/main.js")]);
    }

    #[tokio::test]
    async fn write_errors_propagate() {
        let fs = MockFileSystem::new();
        fs.add_file("./src/js/main.js", b"let a;");
        fs.fail_writes();

        let result = script_like_task()
            .run(&context(&fs, Arc::new(Recording::default())))
            .await;
        assert!(result.is_err());
    }
}
