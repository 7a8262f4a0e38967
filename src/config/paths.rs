// src/config/paths.rs

//! The path table: one (input glob, output directory) pair per asset class.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};
use serde::Deserialize;

use crate::fs::FileSystem;
use crate::types::AssetClass;

/// Raw `[paths.<class>]` entry.
///
/// ```toml
/// [paths.template]
/// input = "src/views/**/*.pug"
/// watch = ["src/**/*.pug"]
/// output = "dist"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathEntry {
    /// Glob selecting the files the task consumes, relative to the project root.
    pub input: String,

    /// Directory outputs are written to, relative to the project root.
    pub output: String,

    /// Globs that re-trigger the task in watch mode. Defaults to `[input]`.
    #[serde(default)]
    pub watch: Option<Vec<String>>,
}

impl PathEntry {
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            watch: None,
        }
    }

    /// Effective watch patterns for this entry.
    pub fn watch_patterns(&self) -> Vec<String> {
        match &self.watch {
            Some(list) if !list.is_empty() => list.clone(),
            _ => vec![self.input.clone()],
        }
    }
}

/// Compiled form of a [`PathEntry`].
#[derive(Clone)]
pub struct ClassPaths {
    class: AssetClass,
    input: String,
    input_matcher: GlobMatcher,
    base: PathBuf,
    output: PathBuf,
    watch_patterns: Vec<String>,
}

impl fmt::Debug for ClassPaths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassPaths")
            .field("class", &self.class)
            .field("input", &self.input)
            .field("output", &self.output)
            .finish_non_exhaustive()
    }
}

impl ClassPaths {
    pub fn compile(class: AssetClass, entry: &PathEntry) -> Result<Self> {
        let input_matcher = compile_glob(&entry.input)
            .with_context(|| format!("building input glob for {class}"))?
            .compile_matcher();

        // Validate the watch globs up front; the watcher compiles its own set.
        build_globset(&entry.watch_patterns())
            .with_context(|| format!("building watch globset for {class}"))?;

        Ok(Self {
            class,
            input: entry.input.clone(),
            input_matcher,
            base: glob_base(&entry.input),
            output: PathBuf::from(&entry.output),
            watch_patterns: entry.watch_patterns(),
        })
    }

    pub fn class(&self) -> AssetClass {
        self.class
    }

    /// The raw input glob.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Literal directory prefix of the input glob; outputs keep their path
    /// relative to this directory.
    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn watch_patterns(&self) -> &[String] {
        &self.watch_patterns
    }

    /// Whether `rel_path` (relative to the project root, forward slashes)
    /// is an input of this class.
    pub fn matches_input(&self, rel_path: &str) -> bool {
        self.input_matcher.is_match(rel_path)
    }
}

/// Static mapping from asset class to its compiled paths.
#[derive(Debug, Clone)]
pub struct PathTable {
    entries: BTreeMap<AssetClass, ClassPaths>,
}

impl PathTable {
    pub fn new(entries: BTreeMap<AssetClass, ClassPaths>) -> Self {
        Self { entries }
    }

    /// Paths for `class`.
    ///
    /// The table is built from a section that always carries all four
    /// classes, so this never misses.
    pub fn get(&self, class: AssetClass) -> &ClassPaths {
        &self.entries[&class]
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassPaths> {
        self.entries.values()
    }
}

/// Compile a single pattern the way every glob in the table is compiled:
/// `*` stops at `/`, `**` crosses directories.
pub fn compile_glob(pattern: &str) -> Result<Glob> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .with_context(|| format!("invalid glob pattern: {pattern}"))
}

/// Build a GlobSet from simple string patterns.
pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        builder.add(compile_glob(pat)?);
    }
    Ok(builder.build()?)
}

/// Longest leading run of path components that contain no glob syntax.
///
/// `src/assets/scss/**/*.scss` -> `src/assets/scss`, `*.js` -> `` (empty).
pub fn glob_base(pattern: &str) -> PathBuf {
    let mut base = PathBuf::new();
    let components: Vec<&str> = pattern.split('/').collect();
    // The last component names files, never the base directory.
    let dirs = &components[..components.len().saturating_sub(1)];
    for part in dirs {
        if part.chars().any(|c| matches!(c, '*' | '?' | '[' | '{')) {
            break;
        }
        if !part.is_empty() {
            base.push(part);
        }
    }
    base
}

/// Collect all files under `root` that are inputs of `paths`.
///
/// Only the glob base directory is walked. Results are sorted so task runs
/// are reproducible.
pub fn collect_matching_files(
    fs: &dyn FileSystem,
    root: &Path,
    paths: &ClassPaths,
) -> Result<Vec<PathBuf>> {
    let start = root.join(paths.base());
    let mut files = Vec::new();
    if !fs.is_dir(&start) {
        return Ok(files);
    }

    let mut stack = vec![start];
    while let Some(dir) = stack.pop() {
        for path in fs.read_dir(&dir)? {
            if fs.is_dir(&path) {
                stack.push(path);
            } else if fs.is_file(&path) {
                if let Ok(rel) = path.strip_prefix(root) {
                    let rel_str = rel.to_string_lossy().replace('\\', "/");
                    if paths.matches_input(&rel_str) {
                        files.push(path);
                    }
                }
            }
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn glob_base_stops_at_first_wildcard() {
        assert_eq!(glob_base("src/assets/scss/**/*.scss"), PathBuf::from("src/assets/scss"));
        assert_eq!(glob_base("src/assets/js/*.js"), PathBuf::from("src/assets/js"));
        assert_eq!(glob_base("src/views/**/*.pug"), PathBuf::from("src/views"));
        assert_eq!(glob_base("*.js"), PathBuf::new());
        assert_eq!(glob_base("src/{a,b}/x.css"), PathBuf::from("src"));
    }

    #[test]
    fn single_star_does_not_cross_directories() {
        let paths =
            ClassPaths::compile(AssetClass::Script, &PathEntry::new("src/assets/js/*.js", "dist/assets/js"))
                .unwrap();
        assert!(paths.matches_input("src/assets/js/main.js"));
        assert!(!paths.matches_input("src/assets/js/vendor/lib.js"));
    }

    #[test]
    fn watch_patterns_default_to_input() {
        let entry = PathEntry::new("src/assets/js/*.js", "dist/assets/js");
        assert_eq!(entry.watch_patterns(), vec!["src/assets/js/*.js".to_string()]);
    }

    #[test]
    fn collects_only_matching_files_under_base() {
        let fs = MockFileSystem::new();
        fs.add_file("./src/assets/scss/base.scss", b".a{color:red}");
        fs.add_file("./src/assets/scss/parts/_reset.scss", b"");
        fs.add_file("./src/assets/scss/notes.txt", b"hi");
        fs.add_file("./src/assets/js/main.js", b"let a = 1;");

        let paths = ClassPaths::compile(
            AssetClass::Style,
            &PathEntry::new("src/assets/scss/**/*.scss", "dist/assets/css"),
        )
        .unwrap();

        let files = collect_matching_files(&fs, Path::new("."), &paths).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(
            names,
            vec!["./src/assets/scss/base.scss", "./src/assets/scss/parts/_reset.scss"]
        );
    }

    #[test]
    fn missing_base_directory_yields_no_files() {
        let fs = MockFileSystem::new();
        let paths = ClassPaths::compile(
            AssetClass::Image,
            &PathEntry::new("src/assets/images/**/*", "dist/assets/images"),
        )
        .unwrap();
        assert!(collect_matching_files(&fs, Path::new("."), &paths).unwrap().is_empty());
    }
}
