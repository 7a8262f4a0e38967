// src/transforms/template/parser.rs

//! Indentation-based parser for the supported Pug subset.
//!
//! The parser is line oriented: every non-blank line is one statement, and
//! lines indented deeper than a statement are its children. Includes and
//! `extends` are recorded here and resolved by the loader.

use std::fmt;

/// An attribute value. `Flag` renders as a bare boolean attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    Flag,
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<(String, AttrValue)>,
    /// Written as `tag/`; rendered as `<tag/>` and never has children.
    pub self_closing: bool,
    pub children: Vec<Node>,
}

impl Element {
    fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            self_closing: false,
            children: Vec::new(),
        }
    }

    /// Add an attribute; repeated `class` values are merged in order.
    fn push_attr(&mut self, name: &str, value: AttrValue) {
        if name == "class" {
            if let AttrValue::Text(extra) = &value {
                if let Some((_, AttrValue::Text(existing))) =
                    self.attrs.iter_mut().find(|(n, _)| n == "class")
                {
                    existing.push(' ');
                    existing.push_str(extra);
                    return;
                }
            }
        }
        self.attrs.push((name.to_string(), value));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockMode {
    Replace,
    Append,
    Prepend,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Doctype(String),
    Element(Element),
    /// Literal text; may span several lines.
    Text(String),
    /// A buffered `//` comment, emitted as `<!--text-->`.
    Comment(String),
    Include {
        path: String,
        line: usize,
    },
    Block {
        name: String,
        mode: BlockMode,
        children: Vec<Node>,
    },
}

/// A parsed template file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// `extends` target and the line it appeared on.
    pub extends: Option<(String, usize)>,
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

impl ParseError {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ParseError {}

/// Statements that need a JavaScript runtime.
const UNSUPPORTED_KEYWORDS: &[&str] = &[
    "mixin", "if", "else", "unless", "each", "for", "while", "case", "when", "default", "yield",
];

pub fn parse(source: &str) -> Result<Document, ParseError> {
    let lines = split_lines(source)?;
    let mut parser = Parser {
        lines,
        pos: 0,
        extends: None,
    };
    let nodes = parser.children(None)?;
    Ok(Document {
        extends: parser.extends,
        nodes,
    })
}

#[derive(Debug, Clone, Copy)]
struct Line<'a> {
    number: usize,
    indent: usize,
    text: &'a str,
}

fn split_lines(source: &str) -> Result<Vec<Line<'_>>, ParseError> {
    let mut lines = Vec::new();
    for (idx, raw) in source.lines().enumerate() {
        let number = idx + 1;
        let raw = raw.trim_end();
        if raw.is_empty() {
            continue;
        }
        let text = raw.trim_start();
        let lead = &raw[..raw.len() - text.len()];
        if lead.contains('\t') && lead.contains(' ') {
            return Err(ParseError::new(number, "mixed tabs and spaces in indentation"));
        }
        lines.push(Line {
            number,
            indent: lead.chars().count(),
            text,
        });
    }
    Ok(lines)
}

enum Statement {
    Node(Node),
    Extends(String, usize),
    Silent,
}

enum Tail<'a> {
    Nothing,
    Inline(&'a str),
    TextBlock,
    Expansion(&'a str),
}

struct Parser<'a> {
    lines: Vec<Line<'a>>,
    pos: usize,
    extends: Option<(String, usize)>,
}

impl<'a> Parser<'a> {
    /// Parse all statements indented deeper than `parent`.
    fn children(&mut self, parent: Option<usize>) -> Result<Vec<Node>, ParseError> {
        let mut nodes = Vec::new();
        let mut level = None;

        while let Some(&line) = self.lines.get(self.pos) {
            if parent.is_some_and(|p| line.indent <= p) {
                break;
            }
            match level {
                None => level = Some(line.indent),
                Some(l) if l != line.indent => {
                    return Err(ParseError::new(line.number, "inconsistent indentation"));
                }
                Some(_) => {}
            }

            match self.statement()? {
                Statement::Node(node) => nodes.push(node),
                Statement::Silent => {}
                Statement::Extends(target, number) => {
                    if parent.is_some() || !nodes.is_empty() || self.extends.is_some() {
                        return Err(ParseError::new(
                            number,
                            "`extends` must be the first statement of the file",
                        ));
                    }
                    self.extends = Some((target, number));
                }
            }
        }
        Ok(nodes)
    }

    fn statement(&mut self) -> Result<Statement, ParseError> {
        let line = self.lines[self.pos];
        self.pos += 1;
        let text = line.text;

        if text.starts_with("//-") {
            self.skip_nested(line.indent);
            return Ok(Statement::Silent);
        }
        if let Some(body) = text.strip_prefix("//") {
            let mut comment = body.to_string();
            for nested in self.text_block(line.indent) {
                comment.push('\n');
                comment.push_str(&nested);
            }
            return Ok(Statement::Node(Node::Comment(comment)));
        }
        if let Some(piped) = text.strip_prefix('|') {
            self.no_children(line)?;
            let piped = piped.strip_prefix(' ').unwrap_or(piped);
            return Ok(Statement::Node(Node::Text(piped.to_string())));
        }
        if text.starts_with('<') {
            self.no_children(line)?;
            return Ok(Statement::Node(Node::Text(text.to_string())));
        }
        if text.starts_with(['-', '=', '+']) || text.starts_with("!=") {
            return Err(ParseError::new(
                line.number,
                "code, expressions and mixin calls are not supported",
            ));
        }

        let (word, rest) = match text.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (text, ""),
        };
        match word {
            "doctype" => {
                self.no_children(line)?;
                let value = if rest.is_empty() { "html" } else { rest };
                Ok(Statement::Node(Node::Doctype(value.to_string())))
            }
            "include" => {
                self.no_children(line)?;
                if rest.is_empty() {
                    return Err(ParseError::new(line.number, "`include` needs a path"));
                }
                Ok(Statement::Node(Node::Include {
                    path: rest.to_string(),
                    line: line.number,
                }))
            }
            "extends" | "extend" => {
                self.no_children(line)?;
                if rest.is_empty() {
                    return Err(ParseError::new(line.number, "`extends` needs a path"));
                }
                Ok(Statement::Extends(rest.to_string(), line.number))
            }
            "block" => {
                let (mode, name) = match rest.split_once(char::is_whitespace) {
                    Some(("append", name)) => (BlockMode::Append, name.trim()),
                    Some(("prepend", name)) => (BlockMode::Prepend, name.trim()),
                    _ => (BlockMode::Replace, rest),
                };
                self.block(line, mode, name)
            }
            "append" => self.block(line, BlockMode::Append, rest),
            "prepend" => self.block(line, BlockMode::Prepend, rest),
            kw if UNSUPPORTED_KEYWORDS.contains(&kw) => Err(ParseError::new(
                line.number,
                format!("`{kw}` is not supported"),
            )),
            _ => Ok(Statement::Node(Node::Element(self.element(text, line)?))),
        }
    }

    fn block(&mut self, line: Line<'a>, mode: BlockMode, name: &str) -> Result<Statement, ParseError> {
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(ParseError::new(line.number, "block needs a single name"));
        }
        let children = self.children(Some(line.indent))?;
        Ok(Statement::Node(Node::Block {
            name: name.to_string(),
            mode,
            children,
        }))
    }

    /// Parse an element statement; `text` may be the right-hand side of a
    /// `tag: child` expansion, in which case only the innermost element
    /// takes the nested lines.
    fn element(&mut self, text: &'a str, line: Line<'a>) -> Result<Element, ParseError> {
        let (mut element, tail) = parse_element_head(text, line.number)?;

        match tail {
            Tail::Nothing => {
                element.children = self.children(Some(line.indent))?;
            }
            Tail::Inline(inline) => {
                element.children.push(Node::Text(inline.to_string()));
                element.children.extend(self.children(Some(line.indent))?);
            }
            Tail::TextBlock => {
                let body = self.text_block(line.indent);
                if !body.is_empty() {
                    element.children.push(Node::Text(body.join("\n")));
                }
            }
            Tail::Expansion(child) => {
                let child = self.element(child, line)?;
                element.children.push(Node::Element(child));
            }
        }

        if element.self_closing && !element.children.is_empty() {
            return Err(ParseError::new(
                line.number,
                format!("self-closing `{}` cannot have content", element.tag),
            ));
        }
        Ok(element)
    }

    /// Consume every line nested under `indent` as raw text, keeping the
    /// indentation relative to the first nested line.
    fn text_block(&mut self, indent: usize) -> Vec<String> {
        let mut out = Vec::new();
        let mut base = None;
        while let Some(&line) = self.lines.get(self.pos) {
            if line.indent <= indent {
                break;
            }
            let base = *base.get_or_insert(line.indent);
            out.push(format!("{}{}", " ".repeat(line.indent.saturating_sub(base)), line.text));
            self.pos += 1;
        }
        out
    }

    fn skip_nested(&mut self, indent: usize) {
        while self.lines.get(self.pos).is_some_and(|l| l.indent > indent) {
            self.pos += 1;
        }
    }

    fn no_children(&self, line: Line<'_>) -> Result<(), ParseError> {
        match self.lines.get(self.pos) {
            Some(next) if next.indent > line.indent => Err(ParseError::new(
                next.number,
                "unexpected nested content",
            )),
            _ => Ok(()),
        }
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn take_name(text: &str) -> (&str, &str) {
    let end = text.find(|c: char| !is_name_char(c)).unwrap_or(text.len());
    text.split_at(end)
}

fn parse_element_head(text: &str, number: usize) -> Result<(Element, Tail<'_>), ParseError> {
    let (tag, mut rest) = take_name(text);
    let mut element = if tag.is_empty() {
        if !rest.starts_with(['#', '.']) {
            let c = rest.chars().next().unwrap_or(' ');
            return Err(ParseError::new(number, format!("unexpected character `{c}`")));
        }
        Element::new("div")
    } else {
        Element::new(tag)
    };

    loop {
        if let Some(after) = rest.strip_prefix('#') {
            let (id, after) = take_name(after);
            if id.is_empty() {
                return Err(ParseError::new(number, "empty `#id` shorthand"));
            }
            element.push_attr("id", AttrValue::Text(id.to_string()));
            rest = after;
        } else if let Some(after) = rest.strip_prefix('.') {
            let (class, after) = take_name(after);
            if class.is_empty() {
                break;
            }
            element.push_attr("class", AttrValue::Text(class.to_string()));
            rest = after;
        } else if let Some(after) = rest.strip_prefix('(') {
            rest = parse_attrs(after, &mut element, number)?;
        } else {
            break;
        }
    }

    let tail = if rest.is_empty() {
        Tail::Nothing
    } else if rest == "." {
        Tail::TextBlock
    } else if rest.trim_end() == "/" {
        element.self_closing = true;
        Tail::Nothing
    } else if let Some(child) = rest.strip_prefix(':') {
        let child = child.trim_start();
        if child.is_empty() {
            return Err(ParseError::new(number, "expected an element after `:`"));
        }
        Tail::Expansion(child)
    } else if let Some(inline) = rest.strip_prefix(' ') {
        Tail::Inline(inline)
    } else if rest.starts_with('=') || rest.starts_with("!=") {
        return Err(ParseError::new(number, "buffered code is not supported"));
    } else {
        return Err(ParseError::new(number, format!("unexpected `{rest}`")));
    };

    Ok((element, tail))
}

/// Parse `name=value, flag)` after the opening parenthesis and return the
/// remainder after the closing one.
fn parse_attrs<'t>(mut rest: &'t str, element: &mut Element, number: usize) -> Result<&'t str, ParseError> {
    let unterminated = || ParseError::new(number, "unterminated attribute list");
    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == ',');
        if rest.is_empty() {
            return Err(unterminated());
        }
        if let Some(after) = rest.strip_prefix(')') {
            return Ok(after);
        }

        let end = rest
            .find(|c: char| c.is_whitespace() || matches!(c, '=' | ',' | ')'))
            .ok_or_else(unterminated)?;
        let (name, after) = rest.split_at(end);
        if name.is_empty() {
            return Err(ParseError::new(number, "expected an attribute name"));
        }
        rest = after.trim_start();

        let Some(after_eq) = rest.strip_prefix('=') else {
            element.push_attr(name, AttrValue::Flag);
            continue;
        };
        rest = after_eq.trim_start();

        let value = match rest.chars().next() {
            Some(quote @ ('"' | '\'' | '`')) => {
                let (value, after) = quoted(&rest[1..], quote)
                    .ok_or_else(|| ParseError::new(number, "unterminated attribute string"))?;
                rest = after;
                Some(AttrValue::Text(value))
            }
            Some(_) => {
                let end = rest
                    .find(|c: char| c.is_whitespace() || matches!(c, ',' | ')'))
                    .ok_or_else(unterminated)?;
                let (token, after) = rest.split_at(end);
                rest = after;
                match token {
                    "true" => Some(AttrValue::Flag),
                    "false" | "null" | "undefined" => None,
                    other => Some(AttrValue::Text(other.to_string())),
                }
            }
            None => return Err(unterminated()),
        };
        if let Some(value) = value {
            element.push_attr(name, value);
        }
    }
}

/// Read a quoted string body; `text` starts after the opening quote.
fn quoted(text: &str, quote: char) -> Option<(String, &str)> {
    let mut value = String::new();
    let mut chars = text.char_indices();
    while let Some((idx, c)) = chars.next() {
        match c {
            '\\' => {
                if let Some((_, escaped)) = chars.next() {
                    value.push(escaped);
                }
            }
            c if c == quote => return Some((value, &text[idx + c.len_utf8()..])),
            c => value.push(c),
        }
    }
    None
}
