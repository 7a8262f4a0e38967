// src/transforms/template/format.rs

use crate::pipeline::{Artifact, Transform, TransformError};

/// Canonical whitespace pass over rendered markup.
///
/// Normalizes line endings to `\n`, strips trailing whitespace, collapses
/// runs of blank lines into one, drops leading blank lines and ends the file
/// with exactly one newline. Applying it twice changes nothing.
#[derive(Debug, Clone, Default)]
pub struct FormatHtml;

impl Transform for FormatHtml {
    fn name(&self) -> &'static str {
        "format"
    }

    fn apply(&self, mut artifact: Artifact) -> Result<Artifact, TransformError> {
        artifact.contents = format_markup(artifact.text()?).into_bytes();
        Ok(artifact)
    }
}

pub fn format_markup(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 1);
    let mut blank_run = false;

    for line in input.split('\n') {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run = !out.is_empty();
            continue;
        }
        if blank_run {
            out.push('\n');
            blank_run = false;
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}
