#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use assetflow::config::{ConfigFile, PathEntry, RawConfigFile};
use assetflow::fs::RealFileSystem;
use assetflow::pipeline::{Pipeline, Reporter, TaskContext};
use assetflow::types::AssetClass;

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts from the built-in layout with transpilation disabled, so tests
/// never depend on a node toolchain being installed.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        let mut config = RawConfigFile::default();
        config.script.transpile = String::new();
        Self { config }
    }

    pub fn with_paths(mut self, class: AssetClass, input: &str, output: &str) -> Self {
        *self.entry_mut(class) = PathEntry::new(input, output);
        self
    }

    pub fn with_watch(mut self, class: AssetClass, pattern: &str) -> Self {
        self.entry_mut(class)
            .watch
            .get_or_insert_with(Vec::new)
            .push(pattern.to_string());
        self
    }

    pub fn transpile(mut self, cmd: &str) -> Self {
        self.config.script.transpile = cmd.to_string();
        self
    }

    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.image.jpeg_quality = quality;
        self
    }

    pub fn png_colors(mut self, colors: usize) -> Self {
        self.config.image.png_colors = colors;
        self
    }

    pub fn source_maps(mut self, enabled: bool) -> Self {
        self.config.style.source_maps = enabled;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }

    fn entry_mut(&mut self, class: AssetClass) -> &mut PathEntry {
        let paths = &mut self.config.paths;
        match class {
            AssetClass::Style => &mut paths.style,
            AssetClass::Script => &mut paths.script,
            AssetClass::Image => &mut paths.image,
            AssetClass::Template => &mut paths.template,
        }
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A throwaway project directory on disk.
pub struct Project {
    dir: TempDir,
}

impl Project {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("creating temp project dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    /// Write `contents` to `rel`, creating parent directories.
    pub fn write(&self, rel: &str, contents: impl AsRef<[u8]>) -> &Self {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("creating fixture dir");
        }
        std::fs::write(&path, contents).expect("writing fixture");
        self
    }

    pub fn read(&self, rel: &str) -> Option<Vec<u8>> {
        std::fs::read(self.path(rel)).ok()
    }

    pub fn read_string(&self, rel: &str) -> Option<String> {
        std::fs::read_to_string(self.path(rel)).ok()
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.path(rel).exists()
    }

    /// The four stock tasks over this directory with the real filesystem.
    pub fn pipeline(&self, cfg: &ConfigFile, reporter: Arc<dyn Reporter>) -> Pipeline {
        let ctx = TaskContext {
            root: self.root().to_path_buf(),
            fs: Arc::new(RealFileSystem),
            reporter,
        };
        Pipeline::new(cfg, ctx).expect("building pipeline")
    }
}

impl Default for Project {
    fn default() -> Self {
        Self::new()
    }
}
