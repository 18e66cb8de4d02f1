//! Resolved validation configs and their merge algebra.

use attrs::{Map, PathPattern, Value};
use rules::{AsyncStrategy, ErrorMap, Options, RuleRegistry, RuleTable, ValidatorSpec};
use tracing::debug;

use crate::{
    DependencyGraph, Error, Helper, HelperScope, OnChangeStrategy, Result,
    helpers::eval_helpers,
    raw::{self, RawConfig},
};

/// A resolved validation config.
///
/// Configs compose: [`Config::merge`] unions rule tables (colliding patterns apply both
/// specs), concatenates dependencies and helpers, merges default options (right wins)
/// and takes the right-hand strategy when it sets one.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Synchronous rules.
    rules: RuleTable,
    /// Dependency declarations.
    deps: DependencyGraph,
    /// Default options passed to every validator.
    options: Options,
    /// On-change strategy, if this config sets one.
    strategy: Option<OnChangeStrategy>,
    /// Rules run only by asynchronous passes.
    async_rules: RuleTable,
    /// Async aggregation strategy, if this config sets one.
    async_strategy: Option<AsyncStrategy>,
    /// Helper factories in declaration order.
    helpers: Vec<Helper>,
}

impl Config {
    /// An empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start building a config in code.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Resolve a raw (deserialized) config.
    pub fn from_raw(raw: RawConfig) -> Result<Self> {
        raw::resolve(raw)
    }

    /// Parse and resolve a RON config.
    pub fn from_ron(source: &str) -> Result<Self> {
        Self::from_raw(raw::parse_ron(source)?)
    }

    /// Parse and resolve a JSON config.
    pub fn from_json(source: &str) -> Result<Self> {
        Self::from_raw(raw::parse_json(source)?)
    }

    /// Synchronous rule table.
    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// Asynchronous rule table.
    pub fn async_rules(&self) -> &RuleTable {
        &self.async_rules
    }

    /// Dependency graph.
    pub fn deps(&self) -> &DependencyGraph {
        &self.deps
    }

    /// Default validator options.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Effective on-change strategy.
    pub fn strategy(&self) -> OnChangeStrategy {
        self.strategy.unwrap_or_default()
    }

    /// Effective async aggregation strategy.
    pub fn async_strategy(&self) -> AsyncStrategy {
        self.async_strategy.clone().unwrap_or_default()
    }

    /// Helper factories.
    pub fn helpers(&self) -> &[Helper] {
        &self.helpers
    }

    /// Evaluate every helper against the given state.
    pub fn eval_helpers(&self, attrs: &Value, errors: &ErrorMap) -> Map {
        eval_helpers(&self.helpers, &HelperScope { attrs, errors })
    }

    /// Add a synchronous rule. An existing pattern gets the union of both specs.
    pub fn add_rule(&mut self, pattern: &str, spec: impl Into<ValidatorSpec>) -> Result<()> {
        Ok(self.rules.insert(pattern, spec)?)
    }

    /// Add an asynchronous rule.
    pub fn add_async_rule(&mut self, pattern: &str, spec: impl Into<ValidatorSpec>) -> Result<()> {
        Ok(self.async_rules.insert(pattern, spec)?)
    }

    /// Declare that `dependents` are revalidated when a path matching `on` changes.
    pub fn add_dependency<S: AsRef<str>>(&mut self, on: &str, dependents: &[S]) -> Result<()> {
        Ok(self.deps.add_patterns(on, dependents)?)
    }

    /// Merge `options` over the default options.
    pub fn set_options(&mut self, options: &Options) {
        self.options = self.options.merged(options);
    }

    /// Set the on-change strategy.
    pub fn set_strategy(&mut self, strategy: OnChangeStrategy) {
        self.strategy = Some(strategy);
    }

    /// Set the async aggregation strategy.
    pub fn set_async_strategy(&mut self, strategy: AsyncStrategy) {
        self.async_strategy = Some(strategy);
    }

    /// Append a helper.
    pub fn add_helper(&mut self, helper: Helper) {
        self.helpers.push(helper);
    }

    /// Fail when any spec names a rule `registry` does not know.
    pub fn check(&self, registry: &RuleRegistry) -> Result<()> {
        for entry in self.rules.entries().iter().chain(self.async_rules.entries()) {
            registry.check(entry.spec())?;
        }
        Ok(())
    }

    /// `self` followed by `other`.
    pub fn merge(&self, other: &Self) -> Self {
        let mut out = self.clone();
        out.rules.merge(&other.rules);
        out.async_rules.merge(&other.async_rules);
        out.deps.merge(&other.deps);
        out.options = self.options.merged(&other.options);
        if other.strategy.is_some() {
            out.strategy = other.strategy;
        }
        if other.async_strategy.is_some() {
            out.async_strategy.clone_from(&other.async_strategy);
        }
        out.helpers.extend(other.helpers.iter().cloned());
        out
    }

    /// This config with every rule and dependency scoped under `prefix`, for a sub-form
    /// editing one part of the tree.
    pub fn scoped(&self, prefix: &str) -> Result<Self> {
        let prefix = PathPattern::parse(prefix)?;
        debug!(prefix = %prefix, rules = self.rules.len(), "scoping config");
        Ok(Self {
            rules: self.rules.prefixed(&prefix)?,
            async_rules: self.async_rules.prefixed(&prefix)?,
            deps: self.deps.prefixed(&prefix)?,
            ..self.clone()
        })
    }
}

/// Builder for configs that need code: inline validators, custom async aggregation and
/// helpers. The first error is kept and returned by [`ConfigBuilder::build`].
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    /// Config under construction.
    config: Config,
    /// First error encountered.
    error: Option<Error>,
}

impl ConfigBuilder {
    /// Add a synchronous rule.
    pub fn rule(mut self, pattern: &str, spec: impl Into<ValidatorSpec>) -> Self {
        let r = self.config.add_rule(pattern, spec);
        self.record(r);
        self
    }

    /// Add a synchronous rule revalidated whenever a path matching one of `deps` changes.
    pub fn rule_with_deps(
        mut self,
        pattern: &str,
        spec: impl Into<ValidatorSpec>,
        deps: &[&str],
    ) -> Self {
        let r = self.config.add_rule(pattern, spec);
        self.record(r);
        for dep in deps {
            let r = self.config.add_dependency(dep, &[pattern]);
            self.record(r);
        }
        self
    }

    /// Add an asynchronous rule.
    pub fn async_rule(mut self, pattern: &str, spec: impl Into<ValidatorSpec>) -> Self {
        let r = self.config.add_async_rule(pattern, spec);
        self.record(r);
        self
    }

    /// Declare a dependency.
    pub fn dep(mut self, on: &str, dependents: &[&str]) -> Self {
        let r = self.config.add_dependency(on, dependents);
        self.record(r);
        self
    }

    /// Set one default option.
    pub fn option(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.config.options.insert(key, value);
        self
    }

    /// Set the on-change strategy.
    pub fn strategy(mut self, strategy: OnChangeStrategy) -> Self {
        self.config.set_strategy(strategy);
        self
    }

    /// Set the async aggregation strategy.
    pub fn async_strategy(mut self, strategy: AsyncStrategy) -> Self {
        self.config.set_async_strategy(strategy);
        self
    }

    /// Add a helper factory.
    pub fn helper<F>(mut self, f: F) -> Self
    where
        F: Fn(&HelperScope<'_>) -> Map + Send + Sync + 'static,
    {
        self.config.add_helper(Helper::new(f));
        self
    }

    /// Finish, returning the first error recorded.
    pub fn build(self) -> Result<Config> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.config),
        }
    }

    /// Keep the first error.
    fn record(&mut self, r: Result<()>) {
        if let Err(e) = r
            && self.error.is_none()
        {
            self.error = Some(e);
        }
    }
}
