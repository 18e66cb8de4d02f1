//! Error types for configuration loading and resolution.

use std::{
    cmp::{max, min},
    fmt::Write as _,
    path::{Path, PathBuf},
};

use attrs::PathError;
use thiserror::Error;

/// Convenience alias for results returned by this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Errors produced while loading, parsing, or resolving a configuration.
///
/// All of these are fatal configuration defects, reported when the config is resolved
/// rather than on first use.
pub enum Error {
    #[error("{message}")]
    /// I/O or filesystem read error.
    Read {
        /// Optional path associated with the read error.
        path: Option<PathBuf>,
        /// Human-readable error message.
        message: String,
    },
    #[error("{message}")]
    /// Syntax or shape error in a config source.
    Parse {
        /// Optional path associated with the parse error.
        path: Option<PathBuf>,
        /// Optional 1-based line number.
        line: Option<usize>,
        /// Optional 1-based column number.
        col: Option<usize>,
        /// Human-readable error message.
        message: String,
        /// Optional excerpt including a caret at the error location.
        excerpt: Option<String>,
    },
    #[error("unknown onChangeStrategy: {name}")]
    /// An on-change strategy name is not recognized.
    UnknownStrategy {
        /// Strategy name as written.
        name: String,
    },
    #[error("rule {rule}: deps are only allowed on a top-level rule entry")]
    /// A `{rules, deps}` wrapper appeared inside another spec.
    NestedDeps {
        /// Rule pattern containing the nested wrapper.
        rule: String,
    },
    #[error(transparent)]
    /// Unknown rule or async strategy.
    Rules(rules::Error),
    #[error(transparent)]
    /// Malformed pattern or misaligned pin.
    Path(#[from] PathError),
}

/// Pattern errors surface as [`Error::Path`] whichever layer reported them.
impl From<rules::Error> for Error {
    fn from(e: rules::Error) -> Self {
        match e {
            rules::Error::Path(p) => Self::Path(p),
            other => Self::Rules(other),
        }
    }
}

impl Error {
    /// Render a human-friendly error message including location and an excerpt when available.
    pub fn pretty(&self) -> String {
        match self {
            Self::Read { path, message } => match path {
                Some(p) => format!("Read error at {}: {}", p.display(), message),
                None => format!("Read error: {}", message),
            },
            Self::Parse {
                path,
                line,
                col,
                message,
                excerpt,
            } => {
                let loc = match (line, col) {
                    (Some(l), Some(c)) => format!("{}:{}", l, c),
                    (Some(l), None) => format!("{}", l),
                    _ => String::new(),
                };
                let head = match (path, loc.is_empty()) {
                    (Some(p), false) => format!("Config parse error at {}:{}", p.display(), loc),
                    (Some(p), true) => format!("Config parse error at {}", p.display()),
                    (None, false) => format!("Config parse error at {}", loc),
                    (None, true) => "Config parse error".to_string(),
                };
                match excerpt {
                    Some(ex) => format!("{}\n{}\n{}", head, message, ex),
                    None => format!("{}\n{}", head, message),
                }
            }
            other => format!("Config error: {}", other),
        }
    }

    /// Access the optional path attached to this error.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Read { path, .. } | Self::Parse { path, .. } => path.as_deref(),
            _ => None,
        }
    }

    /// Attach a source path to read and parse errors that lack one.
    pub fn with_path(self, source: &Path) -> Self {
        match self {
            Self::Read { path: None, message } => Self::Read {
                path: Some(source.to_path_buf()),
                message,
            },
            Self::Parse {
                path: None,
                line,
                col,
                message,
                excerpt,
            } => Self::Parse {
                path: Some(source.to_path_buf()),
                line,
                col,
                message,
                excerpt,
            },
            other => other,
        }
    }
}

/// Build a small 2–3 line excerpt with a caret at `(line_no, col_no)`.
pub fn excerpt_at(source: &str, line_no: usize, col_no: usize) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let total = lines.len();
    let start = max(1usize, line_no.saturating_sub(2));
    let end = min(total, line_no + 1);

    let mut out = String::new();
    for n in start..=end {
        let text = lines.get(n - 1).copied().unwrap_or("");
        let _ignored = writeln!(out, " {:>4} | {}", n, text);
        if n == line_no {
            let prefix = format!(" {:>4} | ", n);
            let _ignored = writeln!(
                out,
                "{}{}^",
                " ".repeat(prefix.len()),
                " ".repeat(col_no.saturating_sub(1))
            );
        }
    }
    out
}
