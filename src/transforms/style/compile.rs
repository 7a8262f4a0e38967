// src/transforms/style/compile.rs

use std::path::PathBuf;

use crate::pipeline::{Artifact, Transform, TransformError};
use crate::types::SassOutputStyle;

/// SCSS -> CSS via `grass`.
///
/// Imports resolve against the importing file's directory first, then the
/// configured load paths in order.
#[derive(Debug, Clone)]
pub struct SassCompile {
    style: SassOutputStyle,
    load_paths: Vec<PathBuf>,
}

impl SassCompile {
    pub fn new(style: SassOutputStyle, load_paths: Vec<PathBuf>) -> Self {
        Self { style, load_paths }
    }
}

impl Transform for SassCompile {
    fn name(&self) -> &'static str {
        "sass"
    }

    fn apply(&self, mut artifact: Artifact) -> Result<Artifact, TransformError> {
        let style = match self.style {
            SassOutputStyle::Expanded => grass::OutputStyle::Expanded,
            SassOutputStyle::Compressed => grass::OutputStyle::Compressed,
        };
        let options = grass::Options::default()
            .style(style)
            .load_path(artifact.source_dir())
            .load_paths(&self.load_paths);

        let css = grass::from_string(artifact.text()?.to_owned(), &options)
            .map_err(|e| TransformError::syntax(e.to_string()))?;

        artifact.contents = css.into_bytes();
        artifact.rel_path = artifact.rel_path.with_extension("css");
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ErrorKind;
    use std::fs;

    fn compile(dir: &std::path::Path, scss: &str) -> Result<String, TransformError> {
        let stage = SassCompile::new(SassOutputStyle::Expanded, Vec::new());
        let out = stage.apply(Artifact::new(
            dir.join("base.scss"),
            "base.scss",
            scss.as_bytes().to_vec(),
        ))?;
        assert_eq!(out.rel_path, PathBuf::from("base.css"));
        Ok(String::from_utf8(out.contents).unwrap())
    }

    #[test]
    fn compiles_nesting_and_variables() {
        let dir = tempfile::tempdir().unwrap();
        let css = compile(dir.path(), "$c: red;\n.a { .b { color: $c; } }").unwrap();
        assert!(css.contains(".a .b {"));
        assert!(css.contains("color: red;"));
    }

    #[test]
    fn resolves_partials_next_to_the_source() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("_vars.scss"), "$gap: 4px;").unwrap();
        let css = compile(dir.path(), "@import \"vars\";\n.a { margin: $gap; }").unwrap();
        assert!(css.contains("margin: 4px;"));
    }

    #[test]
    fn syntax_errors_are_per_file_failures() {
        let dir = tempfile::tempdir().unwrap();
        let err = compile(dir.path(), ".a { color: red; ").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Syntax);
        assert!(!err.message.is_empty());
    }
}
