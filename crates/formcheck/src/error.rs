//! Errors surfaced by the `formcheck` command.

use std::path::PathBuf;

use thiserror::Error;

/// Anything that stops a check from producing a verdict.
#[derive(Debug, Error)]
pub enum Error {
    /// The rule file could not be loaded.
    #[error("{}", .0.pretty())]
    Config(#[from] config::Error),

    /// The form engine refused an operation.
    #[error(transparent)]
    Form(#[from] formstate::Error),

    /// The attribute file could not be read or parsed.
    #[error("attrs {}: {message}", path.display())]
    Attrs {
        /// File that failed.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },

    /// A `--set` argument is not `PATH=JSON`.
    #[error("invalid assignment {raw:?}: {message}")]
    Assignment {
        /// Argument as given.
        raw: String,
        /// What went wrong.
        message: String,
    },
}
