//! Validation rules and the executors that run them.
//!
//! A [`RuleTable`] pairs path patterns with [`ValidatorSpec`]s. Specs name rules held
//! in a [`RuleRegistry`], which is passed explicitly to every [`Executor`] rather than
//! living in a global. The executor validates single paths, wildcard fan-outs, or whole
//! tables; [`Executor::start_async`] collects deferred checks into an [`AsyncPass`]
//! that settles into an [`ErrorPatch`] under an [`AsyncStrategy`].

mod builtins;
mod deferred;
mod error;
mod exec;
mod regex_cache;
mod registry;
mod spec;
mod table;

#[cfg(test)]
mod test_exec;

pub use builtins::is_blank;
pub use deferred::{AggregateFn, AsyncPass, AsyncStrategy, JOIN_SEPARATOR};
pub use error::{Error, Result};
pub use exec::{ErrorMap, ErrorPatch, Executor, apply_patch, patch_errors};
pub use registry::RuleRegistry;
pub use spec::{Context, Deferred, Options, Outcome, ValidatorFn, ValidatorSpec};
pub use table::{RuleEntry, RuleTable};
