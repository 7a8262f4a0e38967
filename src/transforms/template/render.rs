// src/transforms/template/render.rs

//! HTML serialization of a resolved template tree.

use super::parser::{AttrValue, Element, Node};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Render resolved nodes (no `include` left) to HTML.
///
/// In pretty mode every element starts on its own line, nested two spaces
/// per level, and elements holding a single line of text stay on one line.
pub fn render(nodes: &[Node], pretty: bool) -> String {
    let mut renderer = Renderer {
        pretty,
        out: String::new(),
    };
    renderer.nodes(nodes, 0);
    renderer.out
}

struct Renderer {
    pretty: bool,
    out: String,
}

impl Renderer {
    fn nodes(&mut self, nodes: &[Node], depth: usize) {
        let mut previous_text = false;
        for node in nodes {
            let is_text = matches!(node, Node::Text(_));
            if is_text && previous_text && !self.pretty {
                self.out.push('\n');
            }
            self.node(node, depth);
            previous_text = is_text;
        }
    }

    fn node(&mut self, node: &Node, depth: usize) {
        match node {
            Node::Doctype(value) => self.line(depth, &doctype(value)),
            Node::Text(text) => {
                if self.pretty {
                    for line in text.lines() {
                        self.line(depth, line);
                    }
                } else {
                    self.out.push_str(text);
                }
            }
            Node::Comment(text) => self.line(depth, &format!("<!--{text}-->")),
            Node::Block { children, .. } => self.nodes(children, depth),
            Node::Element(el) => self.element(el, depth),
            // Spliced in by the loader before rendering.
            Node::Include { .. } => {}
        }
    }

    fn element(&mut self, el: &Element, depth: usize) {
        let open = open_tag(el);
        if el.self_closing {
            self.line(depth, &format!("{}/>", &open[..open.len() - 1]));
            return;
        }
        if VOID_ELEMENTS.contains(&el.tag.as_str()) && el.children.is_empty() {
            self.line(depth, &open);
            return;
        }

        let close = format!("</{}>", el.tag);
        if let Some(text) = single_line_text(&el.children) {
            self.line(depth, &format!("{open}{text}{close}"));
            return;
        }

        if self.pretty {
            self.line(depth, &open);
            self.nodes(&el.children, depth + 1);
            self.line(depth, &close);
        } else {
            self.out.push_str(&open);
            self.nodes(&el.children, depth + 1);
            self.out.push_str(&close);
        }
    }

    fn line(&mut self, depth: usize, text: &str) {
        if self.pretty {
            for _ in 0..depth {
                self.out.push_str("  ");
            }
            self.out.push_str(text);
            self.out.push('\n');
        } else {
            self.out.push_str(text);
        }
    }
}

/// The children as one line of text, when they are nothing but that.
fn single_line_text(children: &[Node]) -> Option<String> {
    let mut flat = Vec::new();
    flatten_blocks(children, &mut flat);
    match flat.as_slice() {
        [] => Some(String::new()),
        [Node::Text(text)] if !text.contains('\n') => Some(text.clone()),
        _ => None,
    }
}

fn flatten_blocks<'n>(nodes: &'n [Node], out: &mut Vec<&'n Node>) {
    for node in nodes {
        match node {
            Node::Block { children, .. } => flatten_blocks(children, out),
            other => out.push(other),
        }
    }
}

fn open_tag(el: &Element) -> String {
    let mut tag = format!("<{}", el.tag);
    for (name, value) in &el.attrs {
        match value {
            AttrValue::Flag => {
                tag.push(' ');
                tag.push_str(name);
            }
            AttrValue::Text(text) => {
                tag.push_str(&format!(" {name}=\"{}\"", escape_attr(text)));
            }
        }
    }
    tag.push('>');
    tag
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
    out
}

fn doctype(value: &str) -> String {
    match value {
        "html" => "<!DOCTYPE html>".to_string(),
        "xml" => r#"<?xml version="1.0" encoding="utf-8" ?>"#.to_string(),
        "transitional" => r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Transitional//EN" "http://www.w3.org/TR/xhtml1/DTD/xhtml1-transitional.dtd">"#.to_string(),
        "strict" => r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Strict//EN" "http://www.w3.org/TR/xhtml1/DTD/xhtml1-strict.dtd">"#.to_string(),
        "frameset" => r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Frameset//EN" "http://www.w3.org/TR/xhtml1/DTD/xhtml1-frameset.dtd">"#.to_string(),
        "1.1" => r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.1//EN" "http://www.w3.org/TR/xhtml11/DTD/xhtml11.dtd">"#.to_string(),
        other => format!("<!DOCTYPE {other}>"),
    }
}
