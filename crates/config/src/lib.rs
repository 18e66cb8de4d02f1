//! Validation configs: the rules, dependencies, options and strategies a form runs with.
//!
//! Configs are read from RON or JSON ([`load_from_path`]) or built in code
//! ([`Config::builder`]), then layered on a [`ConfigStack`] whose merged view drives
//! validation.

mod deps;
mod error;
mod helpers;
mod loader;
pub mod raw;
mod stack;
mod strategy;
mod types;

#[cfg(test)]
mod test_merge;

pub use deps::DependencyGraph;
pub use error::{Error, Result, excerpt_at};
pub use helpers::{Helper, HelperScope, eval_helpers};
pub use loader::{Format, load_from_path, load_from_str};
pub use stack::{ConfigId, ConfigStack};
pub use strategy::OnChangeStrategy;
pub use types::{Config, ConfigBuilder};
