// src/transforms/template/loader.rs

//! Resolves `include` and `extends` into a single node tree.

use std::fs;
use std::path::{Path, PathBuf};

use super::parser::{BlockMode, Node, parse};
use crate::pipeline::TransformError;

/// Includes and layouts deeper than this are assumed to be cyclic.
const MAX_NESTING: usize = 32;

/// Parse `source` (the contents of `path`) and splice in every include and
/// layout it references.
///
/// Relative paths resolve against the including file's directory, paths
/// starting with `/` against `basedir`. A path without extension gets
/// `.pug`; included files of any other type are inlined verbatim.
pub fn load(path: &Path, source: &str, basedir: &Path) -> Result<Vec<Node>, TransformError> {
    load_nested(path, source, basedir, 0)
}

fn load_nested(
    path: &Path,
    source: &str,
    basedir: &Path,
    depth: usize,
) -> Result<Vec<Node>, TransformError> {
    if depth > MAX_NESTING {
        return Err(TransformError::syntax(format!(
            "{}: include/extends nesting is too deep (cycle?)",
            path.display()
        )));
    }

    let doc = parse(source)
        .map_err(|e| TransformError::syntax(format!("{}:{}", path.display(), e)))?;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let nodes = resolve_includes(doc.nodes, path, dir, basedir, depth)?;

    let Some((target, line)) = doc.extends else {
        return Ok(nodes);
    };

    let layout_path = resolve_path(&target, dir, basedir);
    let layout_source = fs::read_to_string(&layout_path).map_err(|e| {
        TransformError::syntax(format!(
            "{}:line {line}: cannot extend `{target}` ({}): {e}",
            path.display(),
            layout_path.display()
        ))
    })?;
    let layout = load_nested(&layout_path, &layout_source, basedir, depth + 1)?;
    Ok(apply_overrides(layout, &collect_blocks(nodes)))
}

fn resolve_includes(
    nodes: Vec<Node>,
    path: &Path,
    dir: &Path,
    basedir: &Path,
    depth: usize,
) -> Result<Vec<Node>, TransformError> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            Node::Include { path: target, line } => {
                let resolved = resolve_path(&target, dir, basedir);
                let contents = fs::read_to_string(&resolved).map_err(|e| {
                    TransformError::syntax(format!(
                        "{}:line {line}: cannot include `{target}` ({}): {e}",
                        path.display(),
                        resolved.display()
                    ))
                })?;
                if resolved.extension().is_some_and(|ext| ext == "pug") {
                    out.extend(load_nested(&resolved, &contents, basedir, depth + 1)?);
                } else {
                    out.push(Node::Text(contents.trim_end().to_string()));
                }
            }
            Node::Element(mut el) => {
                el.children = resolve_includes(el.children, path, dir, basedir, depth)?;
                out.push(Node::Element(el));
            }
            Node::Block {
                name,
                mode,
                children,
            } => out.push(Node::Block {
                name,
                mode,
                children: resolve_includes(children, path, dir, basedir, depth)?,
            }),
            other => out.push(other),
        }
    }
    Ok(out)
}

fn resolve_path(target: &str, dir: &Path, basedir: &Path) -> PathBuf {
    let path = match target.strip_prefix('/') {
        Some(rooted) => basedir.join(rooted),
        None => dir.join(target),
    };
    if path.extension().is_none() {
        path.with_extension("pug")
    } else {
        path
    }
}

struct Override {
    name: String,
    mode: BlockMode,
    children: Vec<Node>,
}

/// Top-level blocks of a child template; anything else is ignored.
fn collect_blocks(nodes: Vec<Node>) -> Vec<Override> {
    nodes
        .into_iter()
        .filter_map(|node| match node {
            Node::Block {
                name,
                mode,
                children,
            } => Some(Override {
                name,
                mode,
                children,
            }),
            _ => None,
        })
        .collect()
}

fn apply_overrides(nodes: Vec<Node>, overrides: &[Override]) -> Vec<Node> {
    nodes
        .into_iter()
        .map(|node| match node {
            Node::Block {
                name,
                mode,
                children,
            } => {
                let mut children = apply_overrides(children, overrides);
                for ov in overrides.iter().filter(|ov| ov.name == name) {
                    match ov.mode {
                        BlockMode::Replace => children = ov.children.clone(),
                        BlockMode::Append => children.extend(ov.children.iter().cloned()),
                        BlockMode::Prepend => {
                            let mut merged = ov.children.clone();
                            merged.append(&mut children);
                            children = merged;
                        }
                    }
                }
                Node::Block {
                    name,
                    mode,
                    children,
                }
            }
            Node::Element(mut el) => {
                el.children = apply_overrides(el.children, overrides);
                Node::Element(el)
            }
            other => other,
        })
        .collect()
}
