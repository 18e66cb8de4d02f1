//! Actions accepted by [`crate::EngineState::apply`] and the responses they produce.

use std::{collections::BTreeSet, fmt};

use attrs::Value;
use config::{Config, ConfigId};
use rules::{AsyncPass, AsyncStrategy, ErrorMap, ErrorPatch};

use crate::Validation;

/// Computes a patch from the current (sub)tree.
pub type Updater = Box<dyn FnOnce(&Value) -> Vec<(String, Value)> + Send>;

/// Computes a replacement tree from the current one.
pub type Rebuild = Box<dyn FnOnce(&Value) -> Value + Send>;

/// Writes of a batch update.
pub enum Patch {
    /// Relative path and value pairs.
    Entries(Vec<(String, Value)>),
    /// Called with the subtree at the prefix, or the root without one.
    Updater(Updater),
}

/// What a reset restores.
pub enum ResetTo {
    /// The current initial snapshot.
    Initial,
    /// A new tree, which also becomes the initial snapshot.
    Tree(Value),
    /// A tree computed from the current attributes; it also becomes the initial
    /// snapshot.
    With(Rebuild),
}

/// One state transition.
pub enum Action {
    /// Store `value` at `path`.
    SetAttr {
        /// Concrete dotted path.
        path: String,
        /// New value.
        value: Value,
    },
    /// Apply a batch of writes in one transition.
    SetAttrs {
        /// The writes.
        patch: Patch,
        /// Optional path every key is resolved under.
        prefix: Option<String>,
    },
    /// Replace the whole tree.
    SetFullAttrs {
        /// New tree.
        attrs: Value,
        /// Revalidate everything when the on-change policy allows.
        validate: bool,
    },
    /// Run synchronous rules on one path, or on every rule when `None`.
    Validate {
        /// Optional path or pattern.
        path: Option<String>,
    },
    /// Collect the checks of an asynchronous pass.
    StartAsync {
        /// Optional target path.
        path: Option<String>,
        /// Paths left out, usually those already failing synchronously.
        skip: BTreeSet<String>,
    },
    /// Merge the verdicts of a settled asynchronous pass.
    SettleAsync {
        /// Pass identity returned by [`Response::AsyncStarted`].
        pass: u64,
        /// Per-path verdicts.
        patch: ErrorPatch,
    },
    /// Set or clear one error.
    SetError {
        /// Concrete path.
        path: String,
        /// Message, or `None` to clear.
        error: Option<String>,
    },
    /// Replace the error map.
    SetErrors(ErrorMap),
    /// Remove one error.
    DropError(String),
    /// Restore attributes and clear errors and flags.
    Reset(ResetTo),
    /// Push a config layer.
    AddConfig(Config),
    /// Remove a config layer pushed earlier.
    RemoveConfig(ConfigId),
    /// Replace the base config.
    AmendConfig(Config),
}

impl Action {
    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SetAttr { .. } => "set_attr",
            Self::SetAttrs { .. } => "set_attrs",
            Self::SetFullAttrs { .. } => "set_full_attrs",
            Self::Validate { .. } => "validate",
            Self::StartAsync { .. } => "start_async",
            Self::SettleAsync { .. } => "settle_async",
            Self::SetError { .. } => "set_error",
            Self::SetErrors(_) => "set_errors",
            Self::DropError(_) => "drop_error",
            Self::Reset(_) => "reset",
            Self::AddConfig(_) => "add_config",
            Self::RemoveConfig(_) => "remove_config",
            Self::AmendConfig(_) => "amend_config",
        }
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetAttr { path, value } => f
                .debug_struct("SetAttr")
                .field("path", path)
                .field("value", value)
                .finish(),
            Self::SetAttrs { prefix, .. } => {
                f.debug_struct("SetAttrs").field("prefix", prefix).finish()
            }
            Self::Validate { path } | Self::StartAsync { path, .. } => f
                .debug_struct(self.kind())
                .field("path", path)
                .finish(),
            Self::SetError { path, error } => f
                .debug_struct("SetError")
                .field("path", path)
                .field("error", error)
                .finish(),
            Self::DropError(path) => f.debug_tuple("DropError").field(path).finish(),
            Self::RemoveConfig(id) => f.debug_tuple("RemoveConfig").field(id).finish(),
            other => f.write_str(other.kind()),
        }
    }
}

/// Result of applying an action.
pub enum Response {
    /// Nothing further to report.
    Applied,
    /// A synchronous validate ran.
    Validated(Validation),
    /// An asynchronous pass was collected and must be settled by the caller.
    AsyncStarted {
        /// Identity to pass back in [`Action::SettleAsync`].
        pass: u64,
        /// Checks to await.
        checks: AsyncPass,
        /// How rejections are aggregated.
        strategy: AsyncStrategy,
    },
    /// A config layer was pushed.
    ConfigAdded(ConfigId),
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Applied => f.write_str("Applied"),
            Self::Validated(v) => f.debug_tuple("Validated").field(v).finish(),
            Self::AsyncStarted { pass, checks, .. } => f
                .debug_struct("AsyncStarted")
                .field("pass", pass)
                .field("paths", &checks.paths())
                .finish(),
            Self::ConfigAdded(id) => f.debug_tuple("ConfigAdded").field(id).finish(),
        }
    }
}
