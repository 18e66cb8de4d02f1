//! Engine state and its transition function.

use std::collections::{BTreeMap, BTreeSet};

use attrs::{
    PathPattern, Value, expand, get,
    path::{is_descendant, join},
    update, update_many,
};
use config::{Config, ConfigId, ConfigStack, OnChangeStrategy};
use rules::{ErrorMap, ErrorPatch, Executor, RuleRegistry, apply_patch, patch_errors};
use tracing::{debug, trace};

use crate::{
    Error, Result, Validation,
    action::{Action, Patch, ResetTo, Response},
};

/// An asynchronous pass that has been started and not yet settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validating {
    /// Pass identity; only the latest pass may settle.
    pub pass: u64,
    /// Pending checks per path.
    pub in_flight: BTreeMap<String, usize>,
}

/// Everything one form session knows.
///
/// The state only changes through [`EngineState::apply`]. Rule lookups go through the
/// registry passed to each call, so the state itself holds no shared resources.
#[derive(Debug, Clone)]
pub struct EngineState {
    /// Current attributes.
    attrs: Value,
    /// Snapshot restored by a plain reset.
    initial_attrs: Value,
    /// Current errors; never holds empty messages.
    errors: ErrorMap,
    /// Config layers and their merged view.
    configs: ConfigStack,
    /// No attribute write since creation or the last reset.
    is_pristine: bool,
    /// A validate has run since creation or the last reset.
    is_validated: bool,
    /// The pending asynchronous pass, if any.
    validating: Option<Validating>,
    /// Attributes the pending pass was collected against.
    pass_attrs: Value,
    /// Identity for the next asynchronous pass.
    next_pass: u64,
}

impl EngineState {
    /// Fresh state over `attrs` with `config` as the base layer.
    pub fn new(attrs: Value, config: Config) -> Self {
        Self {
            initial_attrs: attrs.clone(),
            attrs,
            errors: ErrorMap::new(),
            configs: ConfigStack::new(config),
            is_pristine: true,
            is_validated: false,
            validating: None,
            pass_attrs: Value::Null,
            next_pass: 1,
        }
    }

    /// Current attributes.
    pub fn attrs(&self) -> &Value {
        &self.attrs
    }

    /// Snapshot a plain reset restores.
    pub fn initial_attrs(&self) -> &Value {
        &self.initial_attrs
    }

    /// Current errors.
    pub fn errors(&self) -> &ErrorMap {
        &self.errors
    }

    /// Config layers.
    pub fn configs(&self) -> &ConfigStack {
        &self.configs
    }

    /// Merged view of every config layer.
    pub fn config(&self) -> &Config {
        self.configs.merged()
    }

    /// True when no error is present.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// No attribute write since creation or the last reset.
    pub fn is_pristine(&self) -> bool {
        self.is_pristine
    }

    /// A validate has run since creation or the last reset.
    pub fn is_validated(&self) -> bool {
        self.is_validated
    }

    /// The pending asynchronous pass.
    pub fn validating(&self) -> Option<&Validating> {
        self.validating.as_ref()
    }

    /// Active on-change strategy.
    pub fn strategy(&self) -> OnChangeStrategy {
        self.config().strategy()
    }

    /// Whether attribute writes currently recompute errors.
    pub fn should_validate_on_change(&self) -> bool {
        self.strategy()
            .should_validate_on_change(&self.errors, self.is_validated)
    }

    /// Apply one action.
    ///
    /// Either the whole transition applies or, on error, the state is left untouched.
    pub fn apply(&mut self, registry: &RuleRegistry, action: Action) -> Result<Response> {
        let kind = action.kind();
        let response = match action {
            Action::SetAttr { path, value } => {
                let next = update(&self.attrs, &path, value)?;
                self.write(registry, next, &[path])?;
                Response::Applied
            }
            Action::SetAttrs { patch, prefix } => {
                self.set_attrs(registry, patch, prefix.as_deref())?;
                Response::Applied
            }
            Action::SetFullAttrs { attrs, validate } => {
                if validate && self.should_validate_on_change() {
                    self.errors = self.executor(registry).validate_all(&attrs)?;
                }
                self.attrs = attrs;
                self.is_pristine = false;
                Response::Applied
            }
            Action::Validate { path } => {
                Response::Validated(self.validate(registry, path.as_deref())?)
            }
            Action::StartAsync { path, skip } => self.start_async(registry, path, &skip)?,
            Action::SettleAsync { pass, patch } => {
                if self.validating.as_ref().is_some_and(|v| v.pass == pass) {
                    let patch = self.settled(registry, patch)?;
                    apply_patch(&mut self.errors, patch);
                    self.validating = None;
                    self.pass_attrs = Value::Null;
                } else {
                    debug!(pass, "discarding stale async pass");
                }
                Response::Applied
            }
            Action::SetError { path, error } => {
                apply_patch(&mut self.errors, ErrorPatch::from([(path, error)]));
                Response::Applied
            }
            Action::SetErrors(errors) => {
                self.errors = errors.into_iter().filter(|(_, e)| !e.is_empty()).collect();
                Response::Applied
            }
            Action::DropError(path) => {
                self.errors.remove(&path);
                Response::Applied
            }
            Action::Reset(to) => {
                self.reset(to);
                Response::Applied
            }
            Action::AddConfig(config) => Response::ConfigAdded(self.add_config(registry, config)?),
            Action::RemoveConfig(id) => {
                self.remove_config(registry, id)?;
                Response::Applied
            }
            Action::AmendConfig(config) => {
                self.amend_config(registry, config)?;
                Response::Applied
            }
        };
        debug!(action = kind, errors = self.errors.len(), "applied");
        Ok(response)
    }

    /// Synchronous validate of one path or pattern, or of every rule.
    pub fn validate(&mut self, registry: &RuleRegistry, path: Option<&str>) -> Result<Validation> {
        let exec = self.executor(registry);
        let found = match path {
            None => {
                let errors = exec.validate_all(&self.attrs)?;
                self.errors = errors.clone();
                errors
            }
            Some(path) => {
                let mut patch = ErrorPatch::new();
                exec.validate_rule(&self.attrs, &PathPattern::parse(path)?, &mut patch)?;
                let found = patch_errors(&patch);
                apply_patch(&mut self.errors, patch);
                found
            }
        };
        self.is_validated = true;
        Ok(Validation::new(&self.attrs, found))
    }

    /// Push a config layer, recomputing errors when the on-change policy is active.
    pub fn add_config(&mut self, registry: &RuleRegistry, config: Config) -> Result<ConfigId> {
        config.check(registry)?;
        let revalidate = self.should_validate_on_change();
        let mut configs = self.configs.clone();
        let id = configs.push(config);
        self.replace_configs(registry, configs, revalidate)?;
        Ok(id)
    }

    /// Remove a config layer pushed earlier.
    pub fn remove_config(&mut self, registry: &RuleRegistry, id: ConfigId) -> Result<()> {
        let revalidate = self.should_validate_on_change();
        let mut configs = self.configs.clone();
        if configs.remove(id).is_none() {
            return Err(Error::UnknownConfig { id });
        }
        self.replace_configs(registry, configs, revalidate)
    }

    /// Replace the base config.
    pub fn amend_config(&mut self, registry: &RuleRegistry, config: Config) -> Result<()> {
        config.check(registry)?;
        let revalidate = self.should_validate_on_change();
        let mut configs = self.configs.clone();
        configs.amend(config);
        self.replace_configs(registry, configs, revalidate)
    }

    /// Batch write, resolving an updater against the subtree at `prefix`.
    fn set_attrs(
        &mut self,
        registry: &RuleRegistry,
        patch: Patch,
        prefix: Option<&str>,
    ) -> Result<()> {
        let entries = match patch {
            Patch::Entries(entries) => entries,
            Patch::Updater(f) => {
                let base = match prefix {
                    Some(p) => get(&self.attrs, p).cloned().unwrap_or_default(),
                    None => self.attrs.clone(),
                };
                f(&base)
            }
        };
        let changed: Vec<String> = entries
            .iter()
            .map(|(k, _)| join(prefix.unwrap_or(""), k))
            .collect();
        let next = update_many(&self.attrs, entries, prefix)?;
        self.write(registry, next, &changed)
    }

    /// Executor over the merged synchronous rules.
    fn executor<'a>(&'a self, registry: &'a RuleRegistry) -> Executor<'a> {
        let config = self.config();
        Executor::new(registry, config.rules(), config.options())
    }

    /// Commit `next` after writes to `changed`, recomputing or dropping the errors the
    /// writes touch according to the on-change policy.
    fn write(&mut self, registry: &RuleRegistry, next: Value, changed: &[String]) -> Result<()> {
        let strategy = self.strategy();
        let validate = self.should_validate_on_change();
        let drop = !validate && strategy.just_drop_error(self.is_validated);

        let mut patch = ErrorPatch::new();
        if validate || drop {
            for path in changed {
                for stale in self.errors.keys().filter(|k| is_descendant(k, path)) {
                    patch.insert(stale.clone(), None);
                }
            }
            let touched = self.touched(&next, changed)?;
            if validate {
                let exec = self.executor(registry);
                for pattern in &touched {
                    exec.validate_rule(&next, pattern, &mut patch)?;
                }
            } else {
                for path in touched.iter().flat_map(|p| concrete_paths(p, &next)) {
                    patch.insert(path, None);
                }
            }
        }
        trace!(changed = ?changed, validate, drop, verdicts = patch.len(), "write");

        self.attrs = next;
        self.is_pristine = false;
        apply_patch(&mut self.errors, patch);
        Ok(())
    }

    /// Rule patterns to revisit after writes to `changed`: the paths themselves, their
    /// dependents, and every rule below a path that now holds a collection.
    fn touched(&self, next: &Value, changed: &[String]) -> Result<Vec<PathPattern>> {
        let config = self.config();
        let mut out: Vec<PathPattern> = Vec::new();
        for path in changed {
            let mut found = vec![PathPattern::parse(path)?];
            found.extend(config.deps().dependents_of(path));
            if get(next, path).is_some_and(Value::is_collection) {
                found.extend(config.rules().below(path));
            }
            for pattern in found {
                if !out.contains(&pattern) {
                    out.push(pattern);
                }
            }
        }
        Ok(out)
    }

    /// Collect an asynchronous pass and mark it as the current one.
    fn start_async(
        &mut self,
        registry: &RuleRegistry,
        path: Option<String>,
        skip: &BTreeSet<String>,
    ) -> Result<Response> {
        let config = self.config();
        let checks = Executor::new(registry, config.async_rules(), config.options())
            .start_async(&self.attrs, path.as_deref(), skip)?;
        let strategy = config.async_strategy();

        let pass = self.next_pass;
        self.next_pass += 1;
        self.pass_attrs = self.attrs.clone();
        self.validating = Some(Validating {
            pass,
            in_flight: checks.in_flight(),
        });
        debug!(pass, paths = checks.paths().len(), "async pass collected");
        Ok(Response::AsyncStarted {
            pass,
            checks,
            strategy,
        })
    }

    /// Verdicts of a settled pass that still describe the current attributes.
    ///
    /// Paths whose value changed since the pass was collected keep their current error.
    /// A cleared verdict only removes an error the synchronous rules no longer report.
    fn settled(&self, registry: &RuleRegistry, patch: ErrorPatch) -> Result<ErrorPatch> {
        let exec = self.executor(registry);
        let mut out = ErrorPatch::new();
        for (path, verdict) in patch {
            if get(&self.pass_attrs, &path) != get(&self.attrs, &path) {
                trace!(path = %path, "written during async pass; verdict dropped");
                continue;
            }
            let verdict = match verdict {
                None if self.errors.contains_key(&path) => exec.validate_one(&self.attrs, &path)?,
                verdict => verdict,
            };
            out.insert(path, verdict);
        }
        Ok(out)
    }

    /// Restore attributes and clear errors and flags.
    fn reset(&mut self, to: ResetTo) {
        let attrs = match to {
            ResetTo::Initial => self.initial_attrs.clone(),
            ResetTo::Tree(tree) => tree,
            ResetTo::With(f) => f(&self.attrs),
        };
        self.initial_attrs = attrs.clone();
        self.attrs = attrs;
        self.errors.clear();
        self.is_pristine = true;
        self.is_validated = false;
        self.validating = None;
        self.pass_attrs = Value::Null;
    }

    /// Install a changed config stack, recomputing every error when `revalidate`.
    fn replace_configs(
        &mut self,
        registry: &RuleRegistry,
        configs: ConfigStack,
        revalidate: bool,
    ) -> Result<()> {
        if revalidate {
            let merged = configs.merged();
            self.errors = Executor::new(registry, merged.rules(), merged.options())
                .validate_all(&self.attrs)?;
        }
        self.configs = configs;
        Ok(())
    }
}

/// Concrete paths a pattern denotes in `tree`; a literal denotes itself.
fn concrete_paths(pattern: &PathPattern, tree: &Value) -> Vec<String> {
    if pattern.is_wildcarded() {
        expand(pattern, tree).into_iter().map(|e| e.path).collect()
    } else {
        vec![pattern.as_str().to_string()]
    }
}
