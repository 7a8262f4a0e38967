// src/transforms/template/mod.rs

//! Pug -> HTML.
//!
//! Supported: `doctype`, tags with `#id`/`.class` shorthand and attribute
//! lists, inline/piped/block text, `tag: child` expansion, comments,
//! `include`, and `extends` with `block`/`append`/`prepend`. Code,
//! interpolation, conditionals, loops and mixins are rejected as syntax
//! errors.

pub mod format;
pub mod loader;
pub mod parser;
pub mod render;

use std::path::PathBuf;

pub use format::FormatHtml;

use crate::pipeline::{Artifact, Transform, TransformError};

#[derive(Debug, Clone)]
pub struct PugRender {
    basedir: PathBuf,
    pretty: bool,
}

impl PugRender {
    /// `basedir` is where `/`-rooted includes and layouts resolve.
    pub fn new(basedir: impl Into<PathBuf>, pretty: bool) -> Self {
        Self {
            basedir: basedir.into(),
            pretty,
        }
    }
}

impl Transform for PugRender {
    fn name(&self) -> &'static str {
        "pug"
    }

    fn apply(&self, mut artifact: Artifact) -> Result<Artifact, TransformError> {
        let nodes = loader::load(&artifact.source, artifact.text()?, &self.basedir)?;
        artifact.contents = render::render(&nodes, self.pretty).into_bytes();
        artifact.rel_path = artifact.rel_path.with_extension("html");
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{ErrorKind, TransformChain};
    use crate::transforms::template::format::format_markup;
    use proptest::prelude::*;
    use std::fs;
    use std::path::Path;

    fn chain(basedir: &Path) -> TransformChain {
        TransformChain::new()
            .then(PugRender::new(basedir, true))
            .then(FormatHtml)
    }

    #[test]
    fn renders_to_html_next_to_relative_path() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("about/index.pug");
        fs::create_dir_all(source.parent().unwrap()).unwrap();
        let pug = "doctype html\nhtml\n  body\n    h1#title About";
        fs::write(&source, pug).unwrap();

        let out = chain(dir.path())
            .run(Artifact::new(&source, "about/index.pug", pug.as_bytes().to_vec()))
            .unwrap();
        assert_eq!(out.rel_path, PathBuf::from("about/index.html"));
        assert_eq!(
            String::from_utf8(out.contents).unwrap(),
            "<!DOCTYPE html>\n<html>\n  <body>\n    <h1 id=\"title\">About</h1>\n  </body>\n</html>\n"
        );
    }

    #[test]
    fn rendering_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let pug = "ul\n  li.a(data-k=\"1\") one\n  li: a(href=\"#\") two\n  //- hidden\n  // kept";
        let render = || {
            chain(dir.path())
                .run(Artifact::new(dir.path().join("x.pug"), "x.pug", pug.as_bytes().to_vec()))
                .unwrap()
                .contents
        };
        assert_eq!(render(), render());
    }

    #[test]
    fn syntax_errors_name_the_file_and_line() {
        let dir = tempfile::tempdir().unwrap();
        let failure = chain(dir.path())
            .run(Artifact::new(
                dir.path().join("broken.pug"),
                "broken.pug",
                b"div\n    p\n  span".to_vec(),
            ))
            .unwrap_err();
        assert_eq!(failure.stage, "pug");
        assert_eq!(failure.error.kind, ErrorKind::Syntax);
        assert!(failure.error.message.contains("broken.pug:line 3"));
    }

    /// Well-indented documents of nested elements with optional class and text.
    fn pug_document() -> impl Strategy<Value = String> {
        let line = (
            0usize..4,
            prop::sample::select(vec!["div", "p", "span", "section", "li"]),
            prop::option::of("[a-z]{1,6}"),
            prop::option::of("[a-z]{1,8}( [a-z]{1,8})?"),
        );
        prop::collection::vec(line, 1..12).prop_map(|lines| {
            let mut depth = 0;
            let mut out = String::new();
            for (i, (wanted, tag, class, text)) in lines.into_iter().enumerate() {
                depth = if i == 0 { 0 } else { wanted.min(depth + 1) };
                out.push_str(&"  ".repeat(depth));
                out.push_str(tag);
                if let Some(class) = class {
                    out.push('.');
                    out.push_str(&class);
                }
                if let Some(text) = text {
                    out.push(' ');
                    out.push_str(&text);
                }
                out.push('\n');
            }
            out
        })
    }

    proptest! {
        #[test]
        fn full_render_is_idempotent(pug in pug_document()) {
            let dir = tempfile::tempdir().unwrap();
            let render = || {
                chain(dir.path())
                    .run(Artifact::new(dir.path().join("page.pug"), "page.pug", pug.as_bytes().to_vec()))
                    .map(|out| String::from_utf8(out.contents).unwrap())
            };
            let first = render().map_err(|f| TestCaseError::fail(f.error.message))?;
            prop_assert_eq!(render().map_err(|f| TestCaseError::fail(f.error.message))?, first.clone());
            prop_assert_eq!(format_markup(&first), first);
        }
    }
}
