// src/transforms/style/sass_glob.rs

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::pipeline::{Artifact, Transform, TransformError};

static GLOB_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"@import\s+["']([^"']*[*?\[][^"']*)["']\s*;"#).expect("valid glob import regex")
});

/// Expand `@import "dir/**/*.scss";` into one `@import` per matching file.
///
/// Patterns are resolved relative to the importing file; matches are sorted
/// so the expansion is stable. A pattern with no matches expands to nothing;
/// a directory that cannot be read while matching fails the file.
#[derive(Debug, Clone, Default)]
pub struct SassGlob;

impl Transform for SassGlob {
    fn name(&self) -> &'static str {
        "sass-glob"
    }

    fn apply(&self, mut artifact: Artifact) -> Result<Artifact, TransformError> {
        let source = artifact.text()?;
        if !GLOB_IMPORT.is_match(source) {
            return Ok(artifact);
        }

        let dir = artifact.source_dir();
        let mut out = String::with_capacity(source.len());
        let mut last = 0;
        for caps in GLOB_IMPORT.captures_iter(source) {
            let whole = caps.get(0).expect("capture 0 always present");
            out.push_str(&source[last..whole.start()]);
            out.push_str(&expand_import(dir, &caps[1])?);
            last = whole.end();
        }
        out.push_str(&source[last..]);

        artifact.contents = out.into_bytes();
        Ok(artifact)
    }
}

fn expand_import(dir: &Path, pattern: &str) -> Result<String, TransformError> {
    let full = dir.join(pattern);
    let full = full.to_string_lossy();
    let entries = glob::glob(&full)
        .map_err(|e| TransformError::syntax(format!("invalid import glob `{pattern}`: {e}")))?;

    let mut imports = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| {
            TransformError::tool(format!(
                "import glob `{pattern}` could not read {}: {}",
                e.path().display(),
                e.error()
            ))
        })?;
        if !path.is_file() {
            continue;
        }
        if let Ok(rel) = path.strip_prefix(dir) {
            imports.push(rel.to_string_lossy().replace('\\', "/"));
        }
    }
    imports.sort();

    Ok(imports
        .iter()
        .map(|rel| format!("@import \"{rel}\";"))
        .collect::<Vec<_>>()
        .join("\n"))
}
