//! Error types for form state transitions.

use attrs::PathError;
use config::ConfigId;
use thiserror::Error;

/// Convenience alias for results returned by this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while applying an action.
///
/// Failing validations are not errors: they land in the error map.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The config could not be resolved or names unknown rules.
    #[error(transparent)]
    Config(#[from] config::Error),

    /// Rule resolution failed while validating.
    #[error(transparent)]
    Rules(#[from] rules::Error),

    /// A path passed to the engine is malformed.
    #[error(transparent)]
    Path(#[from] PathError),

    /// The action refers to a config that is not on the stack.
    #[error("no config {id} on the stack")]
    UnknownConfig {
        /// Identity that was not found.
        id: ConfigId,
    },

    /// The session has been closed.
    #[error("form session is closed")]
    Closed,
}
