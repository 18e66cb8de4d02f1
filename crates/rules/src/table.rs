//! Rule tables: path patterns paired with validator specs.

use attrs::{Captures, CompiledPattern, PathPattern, Value};

use crate::{Result, ValidatorSpec};

/// One rule-table entry.
#[derive(Debug, Clone)]
pub struct RuleEntry {
    /// Compiled path pattern.
    pattern: CompiledPattern,
    /// Validator applied to matching paths.
    spec: ValidatorSpec,
}

impl RuleEntry {
    /// Compiled pattern of this entry.
    pub fn pattern(&self) -> &CompiledPattern {
        &self.pattern
    }

    /// Validator spec of this entry.
    pub fn spec(&self) -> &ValidatorSpec {
        &self.spec
    }
}

/// Ordered rule table.
///
/// Patterns are compiled once on insertion. Entries keep declaration order, which is
/// also evaluation order: when a literal and a wildcard entry both match a path, both
/// apply and the first error in table order wins.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    /// Entries in declaration order, one per distinct pattern.
    entries: Vec<RuleEntry>,
}

impl RuleTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule for `pattern`. A pattern already present keeps its position and
    /// gets the union of both specs.
    pub fn insert(&mut self, pattern: &str, spec: impl Into<ValidatorSpec>) -> Result<()> {
        self.insert_compiled(CompiledPattern::parse(pattern)?, spec.into());
        Ok(())
    }

    /// Add a rule with an already compiled pattern.
    pub fn insert_compiled(&mut self, pattern: CompiledPattern, spec: ValidatorSpec) {
        match self.entries.iter_mut().find(|e| e.pattern == pattern) {
            Some(existing) => {
                let current = existing.spec.clone();
                existing.spec = current.union(spec);
            }
            None => self.entries.push(RuleEntry { pattern, spec }),
        }
    }

    /// Union `other` into this table, keeping this table's entries first.
    pub fn merge(&mut self, other: &Self) {
        for entry in &other.entries {
            self.insert_compiled(entry.pattern.clone(), entry.spec.clone());
        }
    }

    /// This table with every pattern scoped under `prefix`.
    pub fn prefixed(&self, prefix: &PathPattern) -> Result<Self> {
        let mut out = Self::new();
        for entry in &self.entries {
            let pattern = CompiledPattern::compile(entry.pattern.pattern().prefixed(prefix))?;
            out.insert_compiled(pattern, entry.spec.clone());
        }
        Ok(out)
    }

    /// Entries in declaration order.
    pub fn entries(&self) -> &[RuleEntry] {
        &self.entries
    }

    /// Spec declared for exactly `pattern`.
    pub fn get(&self, pattern: &str) -> Option<&ValidatorSpec> {
        self.entries
            .iter()
            .find(|e| e.pattern.as_str() == pattern)
            .map(|e| &e.spec)
    }

    /// Number of distinct patterns.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the table has no rules.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries that apply to the concrete `path` in `tree`, with their captures.
    ///
    /// Wildcard entries only apply while their captured indices exist in `tree`.
    pub fn matching<'a>(
        &'a self,
        path: &'a str,
        tree: &'a Value,
    ) -> impl Iterator<Item = (&'a RuleEntry, Captures)> + 'a {
        self.entries
            .iter()
            .filter_map(move |e| e.pattern.matches_within(path, tree).map(|c| (e, c)))
    }

    /// Patterns strictly below `ancestor`, specialized to it.
    pub fn below(&self, ancestor: &str) -> Vec<PathPattern> {
        let mut out: Vec<PathPattern> = Vec::new();
        for entry in &self.entries {
            if let Some(p) = entry.pattern.pattern().specialize(ancestor) {
                if !out.contains(&p) {
                    out.push(p);
                }
            }
        }
        out
    }
}
