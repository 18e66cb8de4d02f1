//! Named validator table and spec dispatch.

use std::{collections::HashMap, sync::Arc};

use attrs::Value;
use parking_lot::RwLock;
use tracing::{debug, trace, warn};

use crate::{
    Context, Error, Outcome, Result, ValidatorFn, ValidatorSpec, builtins, spec::Options,
};

/// Table of named validators shared by every engine built from it.
///
/// The registry is an explicit value rather than a process global: sessions that
/// should see the same rules share one `Arc<RuleRegistry>`. Names form one flat
/// namespace and the last definition of a name wins, so register everything before
/// the first validation that needs it.
#[derive(Default)]
pub struct RuleRegistry {
    /// Validators keyed by rule name.
    rules: RwLock<HashMap<String, ValidatorFn>>,
}

impl RuleRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated with the built-in rules (`presence`, `numericality`,
    /// `format`, `length`).
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        builtins::install(&registry);
        registry
    }

    /// Register `f` under `name`, replacing any previous definition.
    pub fn define<F>(&self, name: impl Into<String>, f: F)
    where
        F: Fn(&Value, &Context<'_>) -> Outcome + Send + Sync + 'static,
    {
        let name = name.into();
        if self.rules.write().insert(name.clone(), Arc::new(f)).is_some() {
            debug!(rule = %name, "validation rule redefined");
        }
    }

    /// True when `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.rules.read().contains_key(name)
    }

    /// Fetch the validator registered under `name`.
    pub fn lookup(&self, name: &str) -> Result<ValidatorFn> {
        self.rules
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownRule {
                name: name.to_string(),
            })
    }

    /// Check that every named rule in `spec` is registered.
    pub fn check(&self, spec: &ValidatorSpec) -> Result<()> {
        for name in spec.rule_names() {
            if !self.contains(name) {
                return Err(Error::UnknownRule {
                    name: name.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Evaluate `spec` synchronously and return the first error.
    ///
    /// A deferred outcome has no synchronous verdict and counts as valid here; async
    /// checks belong in the async rule table.
    pub fn resolve(
        &self,
        spec: &ValidatorSpec,
        value: &Value,
        ctx: &Context<'_>,
    ) -> Result<Option<String>> {
        match spec {
            ValidatorSpec::Named { rule, options } => {
                self.resolve_named(rule, options, value, ctx)
            }
            ValidatorSpec::Sequence(items) => {
                for item in items {
                    if let Some(err) = self.resolve(item, value, ctx)? {
                        return Ok(Some(err));
                    }
                }
                Ok(None)
            }
            ValidatorSpec::Map(entries) => {
                for (rule, options) in entries {
                    if let Some(err) = self.resolve_named(rule, options, value, ctx)? {
                        return Ok(Some(err));
                    }
                }
                Ok(None)
            }
            ValidatorSpec::Fn(f) => Ok(sync_verdict(f(value, ctx), ctx.path)),
        }
    }

    /// Evaluate every part of `spec` without short-circuiting.
    ///
    /// Returns all non-valid outcomes in declaration order; used by the async executor
    /// so every deferred check of a sequence runs.
    pub fn resolve_all(
        &self,
        spec: &ValidatorSpec,
        value: &Value,
        ctx: &Context<'_>,
    ) -> Result<Vec<Outcome>> {
        let mut out = Vec::new();
        self.collect(spec, value, ctx, &mut out)?;
        out.retain(|o| match o {
            Outcome::Valid => false,
            Outcome::Invalid(msg) => !msg.is_empty(),
            Outcome::Deferred(_) => true,
        });
        Ok(out)
    }

    /// Worker for [`Self::resolve_all`].
    fn collect(
        &self,
        spec: &ValidatorSpec,
        value: &Value,
        ctx: &Context<'_>,
        out: &mut Vec<Outcome>,
    ) -> Result<()> {
        match spec {
            ValidatorSpec::Named { rule, options } => {
                out.push(self.call_named(rule, options, value, ctx)?);
            }
            ValidatorSpec::Sequence(items) => {
                for item in items {
                    self.collect(item, value, ctx, out)?;
                }
            }
            ValidatorSpec::Map(entries) => {
                for (rule, options) in entries {
                    out.push(self.call_named(rule, options, value, ctx)?);
                }
            }
            ValidatorSpec::Fn(f) => out.push(f(value, ctx)),
        }
        Ok(())
    }

    /// Run a named rule synchronously.
    fn resolve_named(
        &self,
        rule: &str,
        options: &Options,
        value: &Value,
        ctx: &Context<'_>,
    ) -> Result<Option<String>> {
        let outcome = self.call_named(rule, options, value, ctx)?;
        Ok(sync_verdict(outcome, ctx.path))
    }

    /// Look up `rule` and call it with `options` merged over the context's options.
    fn call_named(
        &self,
        rule: &str,
        options: &Options,
        value: &Value,
        ctx: &Context<'_>,
    ) -> Result<Outcome> {
        let f = self.lookup(rule)?;
        trace!(rule, path = ctx.path, "resolve");
        if options.is_empty() {
            return Ok(f(value, ctx));
        }
        let merged = ctx.options.merged(options);
        Ok(f(value, &ctx.with_options(&merged)))
    }
}

/// Synchronous reading of an outcome.
fn sync_verdict(outcome: Outcome, path: &str) -> Option<String> {
    match outcome {
        Outcome::Valid => None,
        Outcome::Invalid(msg) => Some(msg).filter(|m| !m.is_empty()),
        Outcome::Deferred(_) => {
            warn!(path, "deferred check in a synchronous rule table ignored");
            None
        }
    }
}
