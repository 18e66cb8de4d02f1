use thiserror::Error;

/// Errors produced while parsing or compiling path patterns.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    /// The pattern has no segments.
    #[error("Empty path pattern")]
    Empty,

    /// Two separators with nothing in between.
    #[error("Empty segment in path pattern '{pattern}'")]
    EmptySegment {
        /// Offending pattern.
        pattern: String,
    },

    /// A segment that is neither a name, an index, `*`, `^` nor a `(name)` capture.
    #[error("Invalid segment '{segment}' in path pattern '{pattern}'")]
    InvalidSegment {
        /// Offending pattern.
        pattern: String,
        /// Offending segment.
        segment: String,
    },

    /// A `^` pin outside a dependency declaration.
    #[error("Pin '^' is only allowed in dependency declarations: '{pattern}'")]
    PinOutsideDependency {
        /// Offending pattern.
        pattern: String,
    },

    /// A pin whose position is not a wildcard in the dependent rule pattern.
    #[error("Pin in dependency '{dep}' has no wildcard at the same position in '{rule}'")]
    MisalignedPin {
        /// Dependency declaration.
        dep: String,
        /// Dependent rule pattern.
        rule: String,
    },

    /// The generated matcher failed to compile.
    #[error("Failed to compile path pattern '{pattern}': {message}")]
    Compile {
        /// Offending pattern.
        pattern: String,
        /// Underlying regex error.
        message: String,
    },

    /// A write would pad a list further than [`MAX_LIST_GAP`](crate::MAX_LIST_GAP)
    /// past its end.
    #[error("Index {index} in '{path}' is too far past the end of a list of length {len}")]
    IndexOutOfRange {
        /// Path being written.
        path: String,
        /// Requested index.
        index: usize,
        /// Length of the list at that point.
        len: usize,
    },
}
