//! Path grammar: `segment ("." segment)*`.
//!
//! A concrete path only contains names and decimal indices. A pattern may also use
//! `*` (anonymous wildcard) and `(name)` (named capture); a dependency declaration may
//! additionally use `^`, which pins the index of the path that triggered it.

use std::fmt;

use crate::PathError;

/// Separator between path segments.
pub const SEPARATOR: char = '.';

/// One segment of a [`PathPattern`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Literal mapping key.
    Key(String),
    /// Literal sequence index.
    Index(usize),
    /// `*`: any existing index.
    Wildcard,
    /// `(name)`: any existing index, captured under `name`.
    Capture(String),
    /// `^`: the index captured from the triggering path.
    Pin,
}

impl Segment {
    /// True for `*`, `(name)` and `^`.
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Self::Wildcard | Self::Capture(_) | Self::Pin)
    }

    /// True when this segment matches the concrete path segment `raw`.
    pub fn accepts(&self, raw: &str) -> bool {
        match self {
            Self::Key(k) => k == raw,
            Self::Index(i) => parse_index(raw) == Some(*i),
            Self::Wildcard | Self::Capture(_) | Self::Pin => parse_index(raw).is_some(),
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(k) => f.write_str(k),
            Self::Index(i) => write!(f, "{i}"),
            Self::Wildcard => f.write_str("*"),
            Self::Capture(name) => write!(f, "({name})"),
            Self::Pin => f.write_str("^"),
        }
    }
}

/// A parsed path or path pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathPattern {
    /// Canonical textual form.
    source: String,
    /// Parsed segments.
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Parse a rule-table pattern. Pins are rejected.
    pub fn parse(source: &str) -> Result<Self, PathError> {
        let pattern = Self::parse_dependency(source)?;
        if pattern.segments.contains(&Segment::Pin) {
            return Err(PathError::PinOutsideDependency {
                pattern: source.to_string(),
            });
        }
        Ok(pattern)
    }

    /// Parse a dependency declaration, which may contain pins.
    pub fn parse_dependency(source: &str) -> Result<Self, PathError> {
        if source.is_empty() {
            return Err(PathError::Empty);
        }
        let segments = source
            .split(SEPARATOR)
            .map(|raw| parse_segment(source, raw))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    /// Build a pattern from segments, deriving its canonical source.
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        let source = segments
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".");
        Self { source, segments }
    }

    /// Textual form of this pattern.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Parsed segments.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// True when any segment is a wildcard, capture or pin.
    pub fn is_wildcarded(&self) -> bool {
        self.segments.iter().any(Segment::is_wildcard)
    }

    /// Number of wildcard-like segments.
    pub fn arity(&self) -> usize {
        self.segments.iter().filter(|s| s.is_wildcard()).count()
    }

    /// Return this pattern scoped under `prefix`.
    pub fn prefixed(&self, prefix: &Self) -> Self {
        let mut segments = prefix.segments.clone();
        segments.extend(self.segments.iter().cloned());
        Self::from_segments(segments)
    }

    /// Specialize this pattern to a concrete ancestor path.
    ///
    /// Returns a pattern strictly below `ancestor` whose leading segments are replaced by
    /// the concrete segments of `ancestor`, or `None` when this pattern does not extend
    /// `ancestor`. `items.*.tags.*` specialized to `items.2.tags` is `items.2.tags.*`.
    pub fn specialize(&self, ancestor: &str) -> Option<Self> {
        let raw = split(ancestor);
        if raw.len() >= self.segments.len() {
            return None;
        }
        let mut segments = Vec::with_capacity(self.segments.len());
        for (seg, part) in self.segments.iter().zip(&raw) {
            if !seg.accepts(part) {
                return None;
            }
            segments.push(concrete_segment(part));
        }
        segments.extend(self.segments[raw.len()..].iter().cloned());
        Some(Self::from_segments(segments))
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Parse a decimal index segment.
///
/// Only canonical indices count: `01` is a key, so one node never has two paths.
pub fn parse_index(raw: &str) -> Option<usize> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if raw.len() > 1 && raw.starts_with('0') {
        return None;
    }
    raw.parse().ok()
}

/// Split a concrete path into its raw segments. The empty path has no segments.
pub fn split(path: &str) -> Vec<&str> {
    if path.is_empty() {
        Vec::new()
    } else {
        path.split(SEPARATOR).collect()
    }
}

/// Join `key` under `prefix`; either side may be empty.
pub fn join(prefix: &str, key: &str) -> String {
    match (prefix.is_empty(), key.is_empty()) {
        (true, _) => key.to_string(),
        (_, true) => prefix.to_string(),
        _ => format!("{prefix}{SEPARATOR}{key}"),
    }
}

/// True when `path` lies strictly below `ancestor`.
pub fn is_descendant(path: &str, ancestor: &str) -> bool {
    path.len() > ancestor.len()
        && path.starts_with(ancestor)
        && path[ancestor.len()..].starts_with(SEPARATOR)
}

/// Literal segment for a concrete path component.
fn concrete_segment(raw: &str) -> Segment {
    parse_index(raw).map_or_else(|| Segment::Key(raw.to_string()), Segment::Index)
}

/// Parse one segment of `pattern`.
fn parse_segment(pattern: &str, raw: &str) -> Result<Segment, PathError> {
    match raw {
        "" => Err(PathError::EmptySegment {
            pattern: pattern.to_string(),
        }),
        "*" => Ok(Segment::Wildcard),
        "^" => Ok(Segment::Pin),
        _ => {
            if let Some(name) = raw.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
                if !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_') {
                    return Ok(Segment::Capture(name.to_string()));
                }
            }
            if raw.contains(['(', ')', '*', '^']) {
                return Err(PathError::InvalidSegment {
                    pattern: pattern.to_string(),
                    segment: raw.to_string(),
                });
            }
            Ok(concrete_segment(raw))
        }
    }
}
