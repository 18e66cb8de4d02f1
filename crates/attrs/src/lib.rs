//! Path-addressed attribute trees.
//!
//! This crate holds the data side of the form engine:
//! - [`Value`]: a JSON-like tree whose containers are shared between snapshots
//! - [`get`], [`update`], [`update_many`]: dotted-path reads and copy-on-path writes
//! - [`PathPattern`] and [`CompiledPattern`]: rule paths with `*`, `(name)` and `^`
//!   segments, matched against concrete paths and expanded against a tree
//! - [`DependencyEntry`] and [`resolve_dependents`]: dependency declarations and pin
//!   substitution

mod depends;
mod error;
pub mod path;
mod pattern;
mod tree;
mod value;

#[cfg(test)]
mod test_pattern;

pub use depends::{DependencyEntry, resolve_dependents};
pub use error::PathError;
pub use path::{PathPattern, Segment};
pub use pattern::{Capture, Captures, CompiledPattern, ExpandedPath, expand, match_path};
pub use tree::{MAX_LIST_GAP, get, get_segments, update, update_many};
pub use value::{Map, Value};
