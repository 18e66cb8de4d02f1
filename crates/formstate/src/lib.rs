//! Form engine state.
//!
//! [`EngineState`] holds attributes, errors, the config stack and the session flags;
//! it changes only through [`EngineState::apply`], one [`Action`] at a time. Which
//! errors a write recomputes is decided by the merged config's on-change strategy.
//!
//! [`Form`] wraps one state in a shareable session: typed operations for a binding
//! layer, asynchronous validation passes, controlled mode, and a liveness flag so
//! verdicts arriving after [`Form::close`] are discarded.

mod action;
mod error;
mod form;
mod state;
mod validation;

#[cfg(test)]
mod test_state;

pub use action::{Action, Patch, Rebuild, ResetTo, Response, Updater};
pub use error::{Error, Result};
pub use form::{Form, FormScope, Input, OnChange};
pub use state::{EngineState, Validating};
pub use validation::Validation;
