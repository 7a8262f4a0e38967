// src/transforms/style/postcss.rs

//! Browser-compatibility post-processing and minification on top of
//! `lightningcss`.

use std::path::{Component, Path, PathBuf};

use lightningcss::rules::media::MediaRule;
use lightningcss::rules::{CssRule, CssRuleList};
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use lightningcss::traits::ToCss;
use parcel_sourcemap::SourceMap;

use crate::pipeline::{Artifact, SourceMapSidecar, Transform, TransformError};

/// Resolve browserslist queries into `lightningcss` targets.
pub fn browser_targets(queries: &[String]) -> anyhow::Result<Targets> {
    if queries.is_empty() {
        return Ok(Targets::default());
    }
    let browsers = Browsers::from_browserslist(queries.iter().map(String::as_str))
        .map_err(|e| anyhow::anyhow!("invalid browserslist query {queries:?}: {e}"))?;
    Ok(Targets {
        browsers,
        ..Targets::default()
    })
}

/// Vendor prefixing, future-syntax lowering and `@media` grouping.
///
/// Output stays readable (not minified). Duplicate top-level `@media` blocks
/// with the same query text are merged and moved after all other rules.
#[derive(Debug, Clone)]
pub struct PostCss {
    targets: Targets,
}

impl PostCss {
    pub fn new(targets: Targets) -> Self {
        Self { targets }
    }
}

impl Transform for PostCss {
    fn name(&self) -> &'static str {
        "postcss"
    }

    fn apply(&self, mut artifact: Artifact) -> Result<Artifact, TransformError> {
        let css = artifact.text()?.to_owned();
        let filename = artifact.rel_path.to_string_lossy().into_owned();

        let options = ParserOptions {
            filename,
            ..ParserOptions::default()
        };
        let mut sheet = StyleSheet::parse(&css, options)
            .map_err(|e| TransformError::syntax(e.to_string()))?;

        group_media_queries(&mut sheet.rules)?;

        sheet
            .minify(MinifyOptions {
                targets: self.targets.clone(),
                ..MinifyOptions::default()
            })
            .map_err(|e| TransformError::syntax(e.to_string()))?;

        let printed = sheet
            .to_css(PrinterOptions {
                targets: self.targets.clone(),
                ..PrinterOptions::default()
            })
            .map_err(|e| TransformError::syntax(e.to_string()))?;

        artifact.contents = printed.code.into_bytes();
        Ok(artifact)
    }
}

/// Merge top-level `@media` rules sharing a query and move them to the end.
fn group_media_queries(rules: &mut CssRuleList<'_>) -> Result<(), TransformError> {
    let mut plain = Vec::with_capacity(rules.0.len());
    let mut media: Vec<(String, MediaRule<'_>)> = Vec::new();

    for rule in std::mem::take(&mut rules.0) {
        match rule {
            CssRule::Media(rule) => {
                let key = rule
                    .query
                    .to_css_string(PrinterOptions::default())
                    .map_err(|e| TransformError::syntax(e.to_string()))?;
                match media.iter_mut().find(|(k, _)| *k == key) {
                    Some((_, existing)) => existing.rules.0.extend(rule.rules.0),
                    None => media.push((key, rule)),
                }
            }
            other => plain.push(other),
        }
    }

    plain.extend(media.into_iter().map(|(_, rule)| CssRule::Media(rule)));
    rules.0 = plain;
    Ok(())
}

/// Minified output plus an optional source-map sidecar.
///
/// A stylesheet at `pages/home.css` gets `maps/pages/home.css.map` in the
/// output directory, and its trailer points there relative to the CSS file
/// (`../maps/pages/home.css.map`). The map relates the minified output to
/// the compiled CSS, which is embedded as `sourcesContent`.
#[derive(Debug, Clone)]
pub struct CleanCss {
    targets: Targets,
    source_maps: bool,
}

impl CleanCss {
    pub fn new(targets: Targets, source_maps: bool) -> Self {
        Self {
            targets,
            source_maps,
        }
    }
}

impl Transform for CleanCss {
    fn name(&self) -> &'static str {
        "clean-css"
    }

    fn apply(&self, mut artifact: Artifact) -> Result<Artifact, TransformError> {
        let css = artifact.text()?.to_owned();
        let source_name = artifact.rel_path.to_string_lossy().replace('\\', "/");

        let mut sheet = StyleSheet::parse(
            &css,
            ParserOptions {
                filename: source_name.clone(),
                ..ParserOptions::default()
            },
        )
        .map_err(|e| TransformError::syntax(e.to_string()))?;

        sheet
            .minify(MinifyOptions {
                targets: self.targets.clone(),
                ..MinifyOptions::default()
            })
            .map_err(|e| TransformError::syntax(e.to_string()))?;

        let mut source_map = if self.source_maps {
            let mut map = SourceMap::new("/");
            map.add_source(&source_name);
            map.set_source_content(0, &css)
                .map_err(|e| TransformError::tool(format!("source map: {e:?}")))?;
            Some(map)
        } else {
            None
        };

        let printed = sheet
            .to_css(PrinterOptions {
                minify: true,
                source_map: source_map.as_mut(),
                targets: self.targets.clone(),
                ..PrinterOptions::default()
            })
            .map_err(|e| TransformError::syntax(e.to_string()))?;

        let mut code = printed.code;
        if let Some(mut map) = source_map {
            let rel_path = map_path(&artifact.rel_path);
            let json = map
                .to_json(None)
                .map_err(|e| TransformError::tool(format!("source map: {e:?}")))?;
            code.push_str(&format!(
                "\n/*# sourceMappingURL={} */",
                map_url(&artifact.rel_path, &rel_path)
            ));
            artifact.source_map = Some(SourceMapSidecar { rel_path, json });
        }

        artifact.contents = code.into_bytes();
        Ok(artifact)
    }
}

/// `maps/<dir>/<stem>.css.map` for a stylesheet at `<dir>/<stem>.css`.
fn map_path(css: &Path) -> PathBuf {
    let stem = css.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    let mut path = PathBuf::from("maps");
    if let Some(dir) = css.parent() {
        path.push(dir);
    }
    path.push(format!("{stem}.css.map"));
    path
}

/// URL of `map` as seen from the directory `css` is written to.
fn map_url(css: &Path, map: &Path) -> String {
    let depth = css
        .parent()
        .map(|dir| dir.components().filter(|c| matches!(c, Component::Normal(_))).count())
        .unwrap_or(0);
    let mut url = "../".repeat(depth);
    url.push_str(&map.to_string_lossy().replace('\\', "/"));
    url
}
