//! Dependency declarations and pin resolution.
//!
//! A [`DependencyEntry`] says "when a path matching `on` changes, revalidate these rule
//! patterns". Indices captured from the changed path flow into the dependents:
//!
//! - a `^` pin substitutes the dependent's wildcard at the same segment position;
//! - a `(name)` capture substitutes every `(name)` capture in the dependent;
//! - a `*` substitutes nothing.
//!
//! Dependent wildcards left unsubstituted stay in the returned pattern and are expanded
//! against the tree by the caller.

use tracing::trace;

use crate::{CompiledPattern, PathError, PathPattern, Segment, pattern::Captures};

/// One declared dependency: a trigger pattern and the rule patterns it affects.
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyEntry {
    /// Trigger pattern, possibly pinned.
    on: CompiledPattern,
    /// Rule patterns to revalidate, in declaration order.
    dependents: Vec<PathPattern>,
}

impl DependencyEntry {
    /// Declare that `dependents` depend on paths matching `on`.
    ///
    /// Fails when `on` is malformed, or when a pin in `on` has no wildcard at the same
    /// position in some dependent.
    pub fn new(on: &str, dependents: Vec<PathPattern>) -> Result<Self, PathError> {
        let on = CompiledPattern::compile(PathPattern::parse_dependency(on)?)?;
        for dependent in &dependents {
            check_pins(on.pattern(), dependent)?;
        }
        Ok(Self { on, dependents })
    }

    /// The trigger pattern.
    pub fn on(&self) -> &PathPattern {
        self.on.pattern()
    }

    /// Dependent rule patterns.
    pub fn dependents(&self) -> &[PathPattern] {
        &self.dependents
    }

    /// Add more dependents to this entry.
    pub fn extend(&mut self, dependents: Vec<PathPattern>) -> Result<(), PathError> {
        for dependent in &dependents {
            check_pins(self.on.pattern(), dependent)?;
        }
        self.dependents.extend(dependents);
        Ok(())
    }

    /// Return this entry with the trigger and every dependent scoped under `prefix`.
    pub fn prefixed(&self, prefix: &PathPattern) -> Result<Self, PathError> {
        let on = CompiledPattern::compile(self.on.pattern().prefixed(prefix))?;
        Ok(Self {
            on,
            dependents: self.dependents.iter().map(|d| d.prefixed(prefix)).collect(),
        })
    }

    /// Dependents triggered by a change at `changed`, with captured indices
    /// substituted. `None` when `changed` does not match the trigger.
    pub fn resolve(&self, changed: &str) -> Option<Vec<PathPattern>> {
        let captures = self.on.matches(changed)?;
        Some(
            self.dependents
                .iter()
                .map(|dependent| substitute(dependent, &captures))
                .collect(),
        )
    }
}

/// Resolve every entry triggered by `changed`, keeping first occurrences only.
pub fn resolve_dependents(entries: &[DependencyEntry], changed: &str) -> Vec<PathPattern> {
    let mut out: Vec<PathPattern> = Vec::new();
    for entry in entries {
        let Some(resolved) = entry.resolve(changed) else {
            continue;
        };
        trace!(on = %entry.on(), changed, count = resolved.len(), "dependency triggered");
        for pattern in resolved {
            if !out.contains(&pattern) {
                out.push(pattern);
            }
        }
    }
    out
}

/// Verify that every pin in `on` lines up with a wildcard in `dependent`.
fn check_pins(on: &PathPattern, dependent: &PathPattern) -> Result<(), PathError> {
    for (position, seg) in on.segments().iter().enumerate() {
        if *seg != Segment::Pin {
            continue;
        }
        let aligned = matches!(
            dependent.segments().get(position),
            Some(Segment::Wildcard | Segment::Capture(_))
        );
        if !aligned {
            return Err(PathError::MisalignedPin {
                dep: on.as_str().to_string(),
                rule: dependent.as_str().to_string(),
            });
        }
    }
    Ok(())
}

/// Apply captured indices to `dependent`.
fn substitute(dependent: &PathPattern, captures: &Captures) -> PathPattern {
    let mut segments = dependent.segments().to_vec();
    for capture in captures.iter() {
        if capture.pinned {
            if let Some(seg) = segments.get_mut(capture.position) {
                if seg.is_wildcard() {
                    *seg = Segment::Index(capture.index);
                }
            }
        } else if let Some(name) = &capture.name {
            for seg in &mut segments {
                if *seg == Segment::Capture(name.clone()) {
                    *seg = Segment::Index(capture.index);
                }
            }
        }
    }
    PathPattern::from_segments(segments)
}
