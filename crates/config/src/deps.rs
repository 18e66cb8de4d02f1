//! Dependency graph: which rule patterns to revalidate when a path changes.

use attrs::{DependencyEntry, PathError, PathPattern, resolve_dependents};

/// Dependency declarations keyed by trigger pattern, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DependencyGraph {
    /// One entry per distinct trigger pattern.
    entries: Vec<DependencyEntry>,
}

impl DependencyGraph {
    /// An empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare that `dependents` must be revalidated when a path matching `on` changes.
    pub fn add(&mut self, on: &str, dependents: Vec<PathPattern>) -> Result<(), PathError> {
        let entry = DependencyEntry::new(on, dependents)?;
        match self.entries.iter_mut().find(|e| e.on() == entry.on()) {
            Some(existing) => existing.extend(entry.dependents().to_vec()),
            None => {
                self.entries.push(entry);
                Ok(())
            }
        }
    }

    /// Parse and add `dependents` for `on`.
    pub fn add_patterns<S: AsRef<str>>(
        &mut self,
        on: &str,
        dependents: &[S],
    ) -> Result<(), PathError> {
        let dependents = dependents
            .iter()
            .map(|d| PathPattern::parse(d.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        self.add(on, dependents)
    }

    /// Concatenate another graph after this one.
    pub fn merge(&mut self, other: &Self) {
        self.entries.extend(other.entries.iter().cloned());
    }

    /// This graph with every trigger and dependent scoped under `prefix`.
    pub fn prefixed(&self, prefix: &PathPattern) -> Result<Self, PathError> {
        let entries = self
            .entries
            .iter()
            .map(|e| e.prefixed(prefix))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { entries })
    }

    /// Rule patterns to revalidate after `changed` changed, with pins substituted.
    pub fn dependents_of(&self, changed: &str) -> Vec<PathPattern> {
        resolve_dependents(&self.entries, changed)
    }

    /// Entries in declaration order.
    pub fn entries(&self) -> &[DependencyEntry] {
        &self.entries
    }

    /// True when nothing depends on anything.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
