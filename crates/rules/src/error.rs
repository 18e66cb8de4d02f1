//! Error types for rule resolution.

use attrs::PathError;
use thiserror::Error;

/// Convenience alias for results returned by this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Configuration errors raised while resolving validator specs.
///
/// These are programming errors in the rule set and are reported eagerly; failing
/// validations are never errors of this type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A spec names a rule that is not registered.
    #[error("unknown validation rule: {name}")]
    UnknownRule {
        /// Rule name as written.
        name: String,
    },

    /// An async aggregation strategy name is not recognized.
    #[error("unknown async errors strategy: {name}")]
    UnknownAsyncStrategy {
        /// Strategy name as written.
        name: String,
    },

    /// A rule pattern is malformed.
    #[error(transparent)]
    Path(#[from] PathError),
}
