// src/pipeline/mod.rs

//! Transform chains and the tasks built from them.
//!
//! - [`Artifact`] is one file flowing through a chain.
//! - [`Transform`] is a single pure stage; [`TransformChain`] runs stages in
//!   order and stops at the first failing stage.
//! - [`task`] combines a shared upstream chain with named output branches
//!   and runs it over every input file of an asset class.
//! - [`report`] is the side channel per-file failures are surfaced through.
//! - [`registry`] assembles the four stock tasks from the configuration.

pub mod registry;
pub mod report;
pub mod task;

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub use registry::{Pipeline, TaskBackend};
pub use report::{ConsoleReporter, FailureReport, Reporter};
pub use task::{Branch, TaskContext, TaskSummary, TransformTask};

/// A source-map sidecar travelling with its artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMapSidecar {
    /// Path relative to the task output directory, e.g. `maps/base.css.map`.
    pub rel_path: PathBuf,
    pub json: String,
}

/// One file flowing through a transform chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Source file on disk (for diagnostics and relative resolution).
    pub source: PathBuf,
    /// Output path relative to the task's output directory.
    pub rel_path: PathBuf,
    pub contents: Vec<u8>,
    pub source_map: Option<SourceMapSidecar>,
}

impl Artifact {
    pub fn new(source: impl Into<PathBuf>, rel_path: impl Into<PathBuf>, contents: Vec<u8>) -> Self {
        Self {
            source: source.into(),
            rel_path: rel_path.into(),
            contents,
            source_map: None,
        }
    }

    /// Contents as UTF-8 text.
    pub fn text(&self) -> Result<&str, TransformError> {
        std::str::from_utf8(&self.contents)
            .map_err(|e| TransformError::syntax(format!("input is not valid UTF-8: {e}")))
    }

    /// Directory of the source file, used for resolving relative imports.
    pub fn source_dir(&self) -> &Path {
        self.source.parent().unwrap_or_else(|| Path::new("."))
    }

    /// File stem of the output path (`base` for `base.css`).
    pub fn stem(&self) -> String {
        self.rel_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Broad category of a per-file failure, as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input could not be parsed or compiled.
    Syntax,
    /// An external tool failed to run or exited unsuccessfully.
    Tool,
    /// Image decoding or encoding failed.
    Codec,
    /// The input is of a kind the stage cannot handle.
    Unsupported,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Syntax => "syntax",
            ErrorKind::Tool => "tool",
            ErrorKind::Codec => "codec",
            ErrorKind::Unsupported => "unsupported",
        };
        f.write_str(s)
    }
}

/// Per-file failure of a single stage. Never fatal to the task.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} error: {message}")]
pub struct TransformError {
    pub kind: ErrorKind,
    pub message: String,
}

impl TransformError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Syntax, message)
    }

    pub fn tool(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Tool, message)
    }

    pub fn codec(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Codec, message)
    }
}

/// A single pure stage of a transform chain.
pub trait Transform: Send + Sync {
    /// Stage name used in logs and failure reports (e.g. `"sass"`).
    fn name(&self) -> &'static str;

    fn apply(&self, artifact: Artifact) -> Result<Artifact, TransformError>;
}

/// A stage failure, tagged with the stage it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageFailure {
    pub stage: &'static str,
    pub error: TransformError,
}

/// Ordered sequence of stages.
#[derive(Default)]
pub struct TransformChain {
    stages: Vec<Box<dyn Transform>>,
}

impl fmt::Debug for TransformChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.stages.iter().map(|s| s.name()))
            .finish()
    }
}

impl TransformChain {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Append a stage; stages run in insertion order.
    pub fn then(mut self, stage: impl Transform + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn run(&self, mut artifact: Artifact) -> Result<Artifact, StageFailure> {
        for stage in &self.stages {
            artifact = stage.apply(artifact).map_err(|error| StageFailure {
                stage: stage.name(),
                error,
            })?;
        }
        Ok(artifact)
    }
}
