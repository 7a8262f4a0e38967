// src/pipeline/report.rs

//! Side channel for per-file failures.
//!
//! Compile errors never abort a task; they are handed to a [`Reporter`] and
//! the task moves on to the next file.

use std::path::{Path, PathBuf};

use tracing::error;

use crate::pipeline::ErrorKind;
use crate::types::AssetClass;

/// One per-file failure, as delivered to a [`Reporter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReport {
    pub class: AssetClass,
    pub stage: &'static str,
    pub file: PathBuf,
    pub kind: ErrorKind,
    pub message: String,
}

/// Injectable failure notification capability.
pub trait Reporter: Send + Sync {
    fn report(&self, report: FailureReport);
}

/// Production reporter: a one-line user-facing message on stderr plus a
/// structured log event.
#[derive(Debug, Clone, Default)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn report(&self, report: FailureReport) {
        eprintln!(
            "[assetflow] {} error in {}: {}",
            report.stage,
            display_path(&report.file),
            report.message
        );
        error!(
            class = %report.class,
            stage = report.stage,
            file = ?report.file,
            kind = %report.kind,
            message = %report.message,
            "transform failed; file skipped"
        );
    }
}

fn display_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
