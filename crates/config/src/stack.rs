//! Layered configs and their merged view.

use std::fmt;

use tracing::debug;

use crate::Config;

/// Identity of one layer in a [`ConfigStack`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConfigId(u64);

impl fmt::Display for ConfigId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Ordered config layers; index 0 is the base.
///
/// The merged view is the left fold of all layers and is recomputed on every mutation,
/// so readers never see a stale combination.
#[derive(Debug, Clone)]
pub struct ConfigStack {
    /// Layers in stack order.
    layers: Vec<(ConfigId, Config)>,
    /// Next identity to hand out.
    next: u64,
    /// Fold of `layers`.
    merged: Config,
}

impl Default for ConfigStack {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl ConfigStack {
    /// A stack holding only `base`.
    pub fn new(base: Config) -> Self {
        let mut stack = Self {
            layers: vec![(ConfigId(0), base)],
            next: 1,
            merged: Config::default(),
        };
        stack.refold();
        stack
    }

    /// Push a layer on top.
    pub fn push(&mut self, config: Config) -> ConfigId {
        let id = ConfigId(self.next);
        self.next += 1;
        self.layers.push((id, config));
        self.refold();
        debug!(id = %id, layers = self.layers.len(), "config added");
        id
    }

    /// Remove the layer `id`. Returns the removed config, or `None` when `id` is not on
    /// the stack.
    pub fn remove(&mut self, id: ConfigId) -> Option<Config> {
        let pos = self.layers.iter().position(|(i, _)| *i == id)?;
        let (_, config) = self.layers.remove(pos);
        self.refold();
        debug!(id = %id, layers = self.layers.len(), "config removed");
        Some(config)
    }

    /// Replace the base layer, keeping its identity.
    pub fn amend(&mut self, config: Config) -> ConfigId {
        let id = match self.layers.first_mut() {
            Some(base) => {
                base.1 = config;
                base.0
            }
            None => {
                let id = ConfigId(self.next);
                self.next += 1;
                self.layers.push((id, config));
                id
            }
        };
        self.refold();
        debug!(id = %id, "base config amended");
        id
    }

    /// True when `id` is on the stack.
    pub fn contains(&self, id: ConfigId) -> bool {
        self.layers.iter().any(|(i, _)| *i == id)
    }

    /// Identity of the base layer.
    pub fn base_id(&self) -> Option<ConfigId> {
        self.layers.first().map(|(id, _)| *id)
    }

    /// Layer `id`.
    pub fn get(&self, id: ConfigId) -> Option<&Config> {
        self.layers.iter().find(|(i, _)| *i == id).map(|(_, c)| c)
    }

    /// Number of layers.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// True when no layer is left.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// The effective config.
    pub fn merged(&self) -> &Config {
        &self.merged
    }

    /// Recompute the merged view.
    fn refold(&mut self) {
        self.merged = self
            .layers
            .iter()
            .fold(Config::default(), |acc, (_, layer)| acc.merge(layer));
    }
}
