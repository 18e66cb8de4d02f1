//! Synchronous validation over a rule table.

use std::collections::{BTreeMap, BTreeSet};

use attrs::{PathPattern, Value, expand, get};
use tracing::trace;

use crate::{AsyncPass, Context, Options, Result, RuleRegistry, RuleTable};

/// Path → message. Never holds empty messages.
pub type ErrorMap = BTreeMap<String, String>;

/// Path → new verdict. `None` clears an existing error.
pub type ErrorPatch = BTreeMap<String, Option<String>>;

/// Value used for absent paths.
static NULL: Value = Value::Null;

/// Apply `patch` to `errors`, dropping cleared and empty entries.
pub fn apply_patch(errors: &mut ErrorMap, patch: ErrorPatch) {
    for (path, verdict) in patch {
        match verdict {
            Some(msg) if !msg.is_empty() => {
                errors.insert(path, msg);
            }
            _ => {
                errors.remove(&path);
            }
        }
    }
}

/// Collect the failing entries of a patch.
pub fn patch_errors(patch: &ErrorPatch) -> ErrorMap {
    patch
        .iter()
        .filter_map(|(path, verdict)| {
            verdict
                .as_ref()
                .filter(|m| !m.is_empty())
                .map(|m| (path.clone(), m.clone()))
        })
        .collect()
}

/// Runs one rule table against attribute trees.
#[derive(Clone, Copy)]
pub struct Executor<'a> {
    /// Named rule lookup.
    registry: &'a RuleRegistry,
    /// Rules to run.
    rules: &'a RuleTable,
    /// Default options passed to every validator.
    options: &'a Options,
}

impl<'a> Executor<'a> {
    /// Build an executor over `rules`.
    pub fn new(registry: &'a RuleRegistry, rules: &'a RuleTable, options: &'a Options) -> Self {
        Self {
            registry,
            rules,
            options,
        }
    }

    /// Validate one concrete path.
    ///
    /// Every entry whose pattern matches `path` applies, in table order, and the first
    /// error wins. Paths no entry covers are valid.
    pub fn validate_one(&self, attrs: &Value, path: &str) -> Result<Option<String>> {
        let value = get(attrs, path).unwrap_or(&NULL);
        for (entry, captures) in self.rules.matching(path, attrs) {
            let ctx = Context {
                attrs,
                path,
                captures: &captures,
                options: self.options,
            };
            if let Some(err) = self.registry.resolve(entry.spec(), value, &ctx)? {
                trace!(path, pattern = %entry.pattern().as_str(), error = %err, "invalid");
                return Ok(Some(err));
            }
        }
        Ok(None)
    }

    /// Validate every concrete path `pattern` denotes in `attrs`, recording a verdict
    /// per path in `out`.
    pub fn validate_rule(
        &self,
        attrs: &Value,
        pattern: &PathPattern,
        out: &mut ErrorPatch,
    ) -> Result<()> {
        if !pattern.is_wildcarded() {
            let verdict = self.validate_one(attrs, pattern.as_str())?;
            out.insert(pattern.as_str().to_string(), verdict);
            return Ok(());
        }
        for expanded in expand(pattern, attrs) {
            let verdict = self.validate_one(attrs, &expanded.path)?;
            out.insert(expanded.path, verdict);
        }
        Ok(())
    }

    /// Validate every rule in the table.
    pub fn validate_all(&self, attrs: &Value) -> Result<ErrorMap> {
        let mut patch = ErrorPatch::new();
        for entry in self.rules.entries() {
            self.validate_rule(attrs, entry.pattern().pattern(), &mut patch)?;
        }
        Ok(patch_errors(&patch))
    }

    /// Revalidate every rule below `ancestor` after a collection was assigned there.
    pub fn validate_below(&self, attrs: &Value, ancestor: &str, out: &mut ErrorPatch) -> Result<()> {
        for pattern in self.rules.below(ancestor) {
            self.validate_rule(attrs, &pattern, out)?;
        }
        Ok(())
    }

    /// Collect the checks of an asynchronous pass over `target`, or over every rule
    /// when `target` is `None`. A wildcarded target is expanded against `attrs`.
    ///
    /// Paths in `skip` are left out; callers pass the paths already failing
    /// synchronously. Every part of every matching spec runs, so each deferred check
    /// of a sequence is in flight at once.
    pub fn start_async(
        &self,
        attrs: &Value,
        target: Option<&str>,
        skip: &BTreeSet<String>,
    ) -> Result<AsyncPass> {
        let paths: Vec<String> = match target {
            Some(target) => {
                let pattern = PathPattern::parse(target)?;
                if pattern.is_wildcarded() {
                    expand(&pattern, attrs).into_iter().map(|e| e.path).collect()
                } else {
                    vec![target.to_string()]
                }
            }
            None => {
                let mut paths: Vec<String> = Vec::new();
                for entry in self.rules.entries() {
                    for expanded in entry.pattern().expand(attrs) {
                        if !paths.contains(&expanded.path) {
                            paths.push(expanded.path);
                        }
                    }
                }
                paths
            }
        };

        let mut pass = AsyncPass::default();
        for path in paths.iter().filter(|p| !skip.contains(*p)) {
            let value = get(attrs, path).unwrap_or(&NULL);
            for (entry, captures) in self.rules.matching(path, attrs) {
                pass.visit(path);
                let ctx = Context {
                    attrs,
                    path,
                    captures: &captures,
                    options: self.options,
                };
                for outcome in self.registry.resolve_all(entry.spec(), value, &ctx)? {
                    pass.push(path, outcome);
                }
            }
        }
        Ok(pass)
    }
}
