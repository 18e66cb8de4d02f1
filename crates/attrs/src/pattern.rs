//! Compiled path patterns: matching and wildcard expansion.

use std::fmt;

use regex::Regex;
use tracing::trace;

use crate::{
    PathError, PathPattern, Segment, Value,
    path::{self, SEPARATOR},
    tree,
};

/// One index captured by a wildcard-like segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    /// Segment position in the pattern.
    pub position: usize,
    /// Capture name for `(name)` segments.
    pub name: Option<String>,
    /// True when captured by a `^` pin.
    pub pinned: bool,
    /// Captured index.
    pub index: usize,
}

/// Indices captured while matching or expanding a pattern, in segment order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captures {
    /// Captured indices in segment order.
    entries: Vec<Capture>,
}

impl Captures {
    /// Index captured under `name`.
    pub fn get(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|c| c.name.as_deref() == Some(name))
            .map(|c| c.index)
    }

    /// Index captured at segment `position`.
    pub fn at(&self, position: usize) -> Option<usize> {
        self.entries
            .iter()
            .find(|c| c.position == position)
            .map(|c| c.index)
    }

    /// All captured indices in segment order.
    pub fn indices(&self) -> Vec<usize> {
        self.entries.iter().map(|c| c.index).collect()
    }

    /// Iterate over captures in segment order.
    pub fn iter(&self) -> impl Iterator<Item = &Capture> {
        self.entries.iter()
    }

    /// True when nothing was captured.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record a capture.
    fn push(&mut self, capture: Capture) {
        self.entries.push(capture);
    }

    /// Drop the most recent capture.
    fn pop(&mut self) {
        self.entries.pop();
    }
}

/// A concrete path produced by [`CompiledPattern::expand`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedPath {
    /// Concrete dotted path.
    pub path: String,
    /// Indices bound to each wildcard on the way.
    pub captures: Captures,
}

/// A [`PathPattern`] compiled once into an anchored matcher.
///
/// Literal segments are escaped, every wildcard-like segment becomes one numeric
/// capturing group.
#[derive(Clone)]
pub struct CompiledPattern {
    /// Source pattern.
    pattern: PathPattern,
    /// Anchored matcher, one group per wildcard-like segment.
    regex: Regex,
}

impl fmt::Debug for CompiledPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CompiledPattern")
            .field(&self.pattern.as_str())
            .finish()
    }
}

impl PartialEq for CompiledPattern {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}

impl CompiledPattern {
    /// Compile `pattern` into a matcher.
    pub fn compile(pattern: PathPattern) -> Result<Self, PathError> {
        let body = pattern
            .segments()
            .iter()
            .map(|seg| match seg {
                Segment::Key(k) => regex::escape(k),
                Segment::Index(i) => i.to_string(),
                Segment::Wildcard | Segment::Capture(_) | Segment::Pin => {
                    r"(0|[1-9]\d*)".to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(&regex::escape(&SEPARATOR.to_string()));
        let regex = Regex::new(&format!("^{body}$")).map_err(|e| PathError::Compile {
            pattern: pattern.as_str().to_string(),
            message: e.to_string(),
        })?;
        Ok(Self { pattern, regex })
    }

    /// Parse and compile a rule-table pattern.
    pub fn parse(source: &str) -> Result<Self, PathError> {
        Self::compile(PathPattern::parse(source)?)
    }

    /// The source pattern.
    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    /// Textual form of the source pattern.
    pub fn as_str(&self) -> &str {
        self.pattern.as_str()
    }

    /// Match a concrete path, returning the captured indices.
    pub fn matches(&self, path: &str) -> Option<Captures> {
        let caps = self.regex.captures(path)?;
        let mut captures = Captures::default();
        let wildcards = self
            .pattern
            .segments()
            .iter()
            .enumerate()
            .filter(|(_, seg)| seg.is_wildcard());
        for (group, (position, seg)) in wildcards.enumerate() {
            let index = caps.get(group + 1)?.as_str().parse().ok()?;
            captures.push(Capture {
                position,
                name: match seg {
                    Segment::Capture(name) => Some(name.clone()),
                    _ => None,
                },
                pinned: matches!(seg, Segment::Pin),
                index,
            });
        }
        Some(captures)
    }

    /// Match a concrete path, rejecting captures that index past the current length
    /// of their collection in `tree`.
    ///
    /// Literal segments are not checked: a literal rule applies to its path whether or
    /// not the node exists.
    pub fn matches_within(&self, path: &str, tree: &Value) -> Option<Captures> {
        let captures = self.matches(path)?;
        let raw = path::split(path);
        for capture in captures.iter() {
            let len = tree::get_segments(tree, &raw[..capture.position])
                .and_then(Value::as_list)
                .map_or(0, <[Value]>::len);
            if capture.index >= len {
                trace!(pattern = %self.pattern, path, index = capture.index, len, "capture out of range");
                return None;
            }
        }
        Some(captures)
    }

    /// Enumerate every concrete path this pattern denotes in `tree`; see [`expand`].
    pub fn expand(&self, tree: &Value) -> Vec<ExpandedPath> {
        expand(&self.pattern, tree)
    }
}

/// Enumerate every concrete path `pattern` denotes in `tree`.
///
/// Each wildcard visits the indices of the list currently at its position, so no path
/// past the end of a collection is produced; a wildcard over a missing node or a
/// non-list yields nothing. Literal segments need not exist. A pattern without
/// wildcards expands to itself.
pub fn expand(pattern: &PathPattern, tree: &Value) -> Vec<ExpandedPath> {
    let mut out = Vec::new();
    let mut prefix = Vec::new();
    let mut captures = Captures::default();
    expand_into(
        Some(tree),
        pattern.segments(),
        0,
        &mut prefix,
        &mut captures,
        &mut out,
    );
    out
}

/// Recursive worker for [`expand`].
fn expand_into(
    node: Option<&Value>,
    segments: &[Segment],
    position: usize,
    prefix: &mut Vec<String>,
    captures: &mut Captures,
    out: &mut Vec<ExpandedPath>,
) {
    let Some((head, rest)) = segments.split_first() else {
        out.push(ExpandedPath {
            path: prefix.join("."),
            captures: captures.clone(),
        });
        return;
    };
    if head.is_wildcard() {
        let Some(items) = node.and_then(Value::as_list) else {
            return;
        };
        for (index, item) in items.iter().enumerate() {
            prefix.push(index.to_string());
            captures.push(Capture {
                position,
                name: match head {
                    Segment::Capture(name) => Some(name.clone()),
                    _ => None,
                },
                pinned: matches!(head, Segment::Pin),
                index,
            });
            expand_into(Some(item), rest, position + 1, prefix, captures, out);
            captures.pop();
            prefix.pop();
        }
    } else {
        let raw = head.to_string();
        let next = node.and_then(|n| tree::child(n, &raw));
        prefix.push(raw);
        expand_into(next, rest, position + 1, prefix, captures, out);
        prefix.pop();
    }
}

/// Parse, compile and match `pattern` against a concrete path in one step.
pub fn match_path(pattern: &str, path: &str) -> Result<Option<Captures>, PathError> {
    Ok(CompiledPattern::compile(PathPattern::parse_dependency(pattern)?)?.matches(path))
}
