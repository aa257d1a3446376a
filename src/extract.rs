// src/extract.rs
//! Field-path extraction over JSON event payloads.
//!
//! Supports the JSONPath subset hosts actually configure: `$` root, dotted
//! members (`$.a.b`), bracketed members (`$['a b']`), indices (`$.items[0]`),
//! wildcards (`$.items[*]`, `$.*`) and recursive descent (`$..text`).
//! Only scalar leaves are returned; objects, arrays and nulls are skipped.

use std::fmt;

use serde_json::Value;

/// One step of a parsed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Field(String),
    Index(usize),
    Wildcard,
    /// `..name`: every member called `name` at any depth below the current node.
    Descendant(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("path expression is empty")]
    Empty,
    #[error("unexpected character {found:?} at offset {offset} in {path:?}")]
    Unexpected {
        path: String,
        offset: usize,
        found: char,
    },
    #[error("unterminated bracket in {0:?}")]
    Unterminated(String),
}

/// A parsed path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    pub raw: String,
    pub segments: Vec<PathSegment>,
}

impl FieldPath {
    /// Parse a JSONPath-like expression. A leading `$` is optional.
    pub fn parse(path: &str) -> Result<Self, PathError> {
        let raw = path.trim();
        if raw.is_empty() {
            return Err(PathError::Empty);
        }

        let chars: Vec<char> = raw.chars().collect();
        let mut segments = Vec::new();
        let mut i = if chars[0] == '$' {
            1
        } else {
            // bare `a.b` is treated as `$.a.b`
            let (name, next) = read_name(&chars, 0);
            if name.is_empty() {
                return Err(unexpected(raw, 0, chars[0]));
            }
            segments.push(name_segment(name));
            next
        };

        while i < chars.len() {
            match chars[i] {
                '.' if chars.get(i + 1) == Some(&'.') => {
                    let (name, next) = read_name(&chars, i + 2);
                    if name.is_empty() {
                        return Err(unexpected(raw, i + 2, *chars.get(i + 2).unwrap_or(&'.')));
                    }
                    segments.push(PathSegment::Descendant(name));
                    i = next;
                }
                '.' => {
                    let (name, next) = read_name(&chars, i + 1);
                    if name.is_empty() {
                        return Err(unexpected(raw, i + 1, *chars.get(i + 1).unwrap_or(&'.')));
                    }
                    segments.push(name_segment(name));
                    i = next;
                }
                '[' => {
                    let close = chars[i..]
                        .iter()
                        .position(|c| *c == ']')
                        .map(|p| p + i)
                        .ok_or_else(|| PathError::Unterminated(raw.to_string()))?;
                    let inner: String = chars[i + 1..close].iter().collect();
                    segments.push(bracket_segment(raw, i, inner.trim())?);
                    i = close + 1;
                }
                other => return Err(unexpected(raw, i, other)),
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// Resolve the path against `payload`, yielding scalar leaves as text in
    /// document order.
    pub fn values_at<'a>(&'a self, payload: &'a Value) -> impl Iterator<Item = String> + 'a {
        let mut nodes: Vec<&Value> = vec![payload];
        for seg in &self.segments {
            nodes = nodes.into_iter().flat_map(|n| step(n, seg)).collect();
        }
        nodes.into_iter().filter_map(scalar_text)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Resolves a configured path against an event payload.
///
/// The worker only depends on this trait, so hosts with their own path
/// dialect can plug it in.
pub trait FieldExtractor: Send + Sync {
    fn values_at(&self, payload: &Value, path: &FieldPath) -> Vec<String>;
}

/// Default extractor backed by [`FieldPath::values_at`].
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonPathExtractor;

impl FieldExtractor for JsonPathExtractor {
    fn values_at(&self, payload: &Value, path: &FieldPath) -> Vec<String> {
        path.values_at(payload).collect()
    }
}

fn step<'a>(node: &'a Value, seg: &PathSegment) -> Vec<&'a Value> {
    match seg {
        PathSegment::Field(name) => node.get(name.as_str()).into_iter().collect(),
        PathSegment::Index(idx) => node.get(*idx).into_iter().collect(),
        PathSegment::Wildcard => match node {
            Value::Object(map) => map.values().collect(),
            Value::Array(items) => items.iter().collect(),
            _ => Vec::new(),
        },
        PathSegment::Descendant(name) => {
            let mut out = Vec::new();
            collect_descendants(node, name, &mut out);
            out
        }
    }
}

fn collect_descendants<'a>(node: &'a Value, name: &str, out: &mut Vec<&'a Value>) {
    match node {
        Value::Object(map) => {
            for (k, v) in map {
                if k == name {
                    out.push(v);
                }
                collect_descendants(v, name, out);
            }
        }
        Value::Array(items) => {
            for v in items {
                collect_descendants(v, name, out);
            }
        }
        _ => {}
    }
}

fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn read_name(chars: &[char], start: usize) -> (String, usize) {
    let mut end = start;
    while end < chars.len() && chars[end] != '.' && chars[end] != '[' {
        end += 1;
    }
    (chars[start..end].iter().collect(), end)
}

fn name_segment(name: String) -> PathSegment {
    if name == "*" {
        PathSegment::Wildcard
    } else {
        PathSegment::Field(name)
    }
}

fn bracket_segment(raw: &str, offset: usize, inner: &str) -> Result<PathSegment, PathError> {
    if inner == "*" {
        return Ok(PathSegment::Wildcard);
    }
    if let Ok(idx) = inner.parse::<usize>() {
        return Ok(PathSegment::Index(idx));
    }
    let quoted = inner.len() >= 2
        && ((inner.starts_with('\'') && inner.ends_with('\''))
            || (inner.starts_with('"') && inner.ends_with('"')));
    if quoted {
        return Ok(PathSegment::Field(inner[1..inner.len() - 1].to_string()));
    }
    let found = inner.chars().next().unwrap_or(']');
    Err(unexpected(raw, offset + 1, found))
}

fn unexpected(path: &str, offset: usize, found: char) -> PathError {
    PathError::Unexpected {
        path: path.to_string(),
        offset,
        found,
    }
}
