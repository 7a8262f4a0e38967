// src/transforms/rename.rs

use std::path::PathBuf;

use crate::pipeline::{Artifact, Transform, TransformError};

/// Replace the extension of the output path, e.g. `base.css` -> `base.min.css`.
///
/// `extname` is the full replacement including the leading dot. Only the
/// last extension is replaced, so `app.bundle.js` becomes `app.bundle.min.js`.
#[derive(Debug, Clone)]
pub struct Rename {
    extname: String,
}

impl Rename {
    pub fn extname(extname: impl Into<String>) -> Self {
        Self {
            extname: extname.into(),
        }
    }
}

impl Transform for Rename {
    fn name(&self) -> &'static str {
        "rename"
    }

    fn apply(&self, mut artifact: Artifact) -> Result<Artifact, TransformError> {
        let file_name = format!("{}{}", artifact.stem(), self.extname);
        let renamed = match artifact.rel_path.parent() {
            Some(parent) => parent.join(file_name),
            None => PathBuf::from(file_name),
        };
        artifact.rel_path = renamed;
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_only_the_last_extension() {
        let rename = Rename::extname(".min.js");
        let out = rename
            .apply(Artifact::new("src/app.bundle.js", "lib/app.bundle.js", Vec::new()))
            .unwrap();
        assert_eq!(out.rel_path, PathBuf::from("lib/app.bundle.min.js"));
    }

    #[test]
    fn keeps_contents_untouched() {
        let out = Rename::extname(".min.css")
            .apply(Artifact::new("base.css", "base.css", b".a{}".to_vec()))
            .unwrap();
        assert_eq!(out.rel_path, PathBuf::from("base.min.css"));
        assert_eq!(out.contents, b".a{}");
    }
}
