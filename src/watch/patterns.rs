// src/watch/patterns.rs

use std::fmt;

use anyhow::{Context, Result};
use globset::GlobSet;

use crate::config::paths::{PathTable, build_globset};
use crate::types::AssetClass;

/// Compiled watch globs for one asset class.
///
/// Patterns are relative to the project root; the watcher passes relative
/// paths (e.g. `"src/views/index.pug"`) into [`WatchBinding::matches`].
#[derive(Clone)]
pub struct WatchBinding {
    class: AssetClass,
    patterns: Vec<String>,
    watch_set: GlobSet,
}

impl fmt::Debug for WatchBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchBinding")
            .field("class", &self.class)
            .field("patterns", &self.patterns)
            .finish_non_exhaustive()
    }
}

impl WatchBinding {
    pub fn new(class: AssetClass, patterns: Vec<String>) -> Result<Self> {
        let watch_set = build_globset(&patterns)
            .with_context(|| format!("building watch globset for {class}"))?;
        Ok(Self {
            class,
            patterns,
            watch_set,
        })
    }

    pub fn class(&self) -> AssetClass {
        self.class
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn matches(&self, rel_path: &str) -> bool {
        self.watch_set.is_match(rel_path)
    }
}

/// One binding per class, from the effective watch patterns of the table.
pub fn build_bindings(table: &PathTable) -> Result<Vec<WatchBinding>> {
    table
        .iter()
        .map(|paths| WatchBinding::new(paths.class(), paths.watch_patterns().to_vec()))
        .collect()
}
