//! Raw config shapes as written in RON or JSON files, and their normalization.
//!
//! Two top-level shapes are accepted:
//! - a bare rule map: `{"name": "presence", "items.*.qty": ["presence", "numericality"]}`
//! - a wrapper: `{"rules": {...}, "deps": {...}, "defaultOptions": {...},
//!   "onChangeStrategy": "onAfterValidate", "async": {"rules": {...}, "errorsStrategy": "join"}}`
//!
//! A map is a wrapper when it parses as one; any unknown key makes it a bare rule map.
//! Rule maps keep their declaration order, which is also evaluation order.

use std::{fmt, marker::PhantomData, result::Result as StdResult};

use rules::{AsyncStrategy, Options, ValidatorSpec};
use serde::{
    Deserialize, Deserializer,
    de::{MapAccess, Visitor},
};
use tracing::debug;

use crate::{Config, Error, OnChangeStrategy, Result, error::excerpt_at};

/// A string-keyed map that keeps source order.
#[derive(Debug, Clone, PartialEq)]
pub struct Ordered<V>(pub Vec<(String, V)>);

impl<V> Default for Ordered<V> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for Ordered<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> StdResult<Self, D::Error> {
        /// Visitor collecting map entries in order.
        struct OrderedVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedVisitor<V> {
            type Value = Ordered<V>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut map: A,
            ) -> StdResult<Self::Value, A::Error> {
                let mut out = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((k, v)) = map.next_entry::<String, V>()? {
                    out.push((k, v));
                }
                Ok(Ordered(out))
            }
        }

        deserializer.deserialize_map(OrderedVisitor(PhantomData))
    }
}

/// Top-level raw config.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawConfig {
    /// Wrapper with rules, deps, options and strategies.
    Full(RawFull),
    /// Bare pattern → spec map.
    Bare(Ordered<RawSpec>),
}

/// Wrapper form of a config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct RawFull {
    /// Synchronous rules.
    #[serde(default, alias = "validations")]
    pub rules: Option<Ordered<RawSpec>>,
    /// Trigger pattern → dependent rule patterns.
    #[serde(default)]
    pub deps: Option<Ordered<Vec<String>>>,
    /// Default validator options.
    #[serde(default)]
    pub default_options: Option<Options>,
    /// On-change strategy name.
    #[serde(default)]
    pub on_change_strategy: Option<String>,
    /// Asynchronous rules.
    #[serde(default, rename = "async")]
    pub async_rules: Option<RawAsync>,
}

/// `async` section of a wrapper config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct RawAsync {
    /// Asynchronous rules.
    #[serde(default)]
    pub rules: Option<Ordered<RawSpec>>,
    /// Aggregation strategy name.
    #[serde(default)]
    pub errors_strategy: Option<String>,
}

/// A validator spec as written.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawSpec {
    /// `"presence"`
    Name(String),
    /// `["presence", {"length": {"maximum": 3}}]`
    List(Vec<Self>),
    /// `{"rules": "presence", "deps": ["other"]}`
    Wrapped(RawWrapped),
    /// `{"presence": true, "format": {"pattern": "^a"}}`
    Map(Ordered<RawOptions>),
}

/// A rule spec with the patterns it depends on.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawWrapped {
    /// Rules the wrapper applies.
    pub rules: Box<RawSpec>,
    /// Trigger patterns that revalidate this rule.
    pub deps: Vec<String>,
}

/// Options of one entry in a rule map.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawOptions {
    /// `true` enables the rule without options; `false` leaves it out.
    Flag(bool),
    /// Options for the rule.
    Options(Options),
}

/// Parse a RON config source.
pub fn parse_ron(source: &str) -> Result<RawConfig> {
    ron::from_str(source).map_err(|e| {
        let (line, col) = (e.span.start.line.max(1), e.span.start.col.max(1));
        Error::Parse {
            path: None,
            line: Some(line),
            col: Some(col),
            message: e.code.to_string(),
            excerpt: Some(excerpt_at(source, line, col)),
        }
    })
}

/// Parse a JSON config source.
pub fn parse_json(source: &str) -> Result<RawConfig> {
    serde_json::from_str(source).map_err(|e| {
        let (line, col) = (e.line().max(1), e.column().max(1));
        Error::Parse {
            path: None,
            line: Some(line),
            col: Some(col),
            message: e.to_string(),
            excerpt: Some(excerpt_at(source, line, col)),
        }
    })
}

/// Normalize a raw config into a [`Config`].
pub fn resolve(raw: RawConfig) -> Result<Config> {
    let full = match raw {
        RawConfig::Full(full) => full,
        RawConfig::Bare(rules) => RawFull {
            rules: Some(rules),
            ..RawFull::default()
        },
    };

    let mut config = Config::new();
    if let Some(options) = &full.default_options {
        config.set_options(options);
    }
    if let Some(name) = &full.on_change_strategy {
        config.set_strategy(OnChangeStrategy::from_name(name)?);
    }
    for (pattern, spec) in full.rules.unwrap_or_default().0 {
        let (spec, deps) = normalize_entry(&pattern, spec)?;
        config.add_rule(&pattern, spec)?;
        for dep in deps {
            config.add_dependency(&dep, &[pattern.as_str()])?;
        }
    }
    for (on, dependents) in full.deps.unwrap_or_default().0 {
        config.add_dependency(&on, &dependents)?;
    }
    if let Some(section) = full.async_rules {
        if let Some(name) = &section.errors_strategy {
            config.set_async_strategy(AsyncStrategy::from_name(name)?);
        }
        for (pattern, spec) in section.rules.unwrap_or_default().0 {
            let (spec, deps) = normalize_entry(&pattern, spec)?;
            config.add_async_rule(&pattern, spec)?;
            for dep in deps {
                config.add_dependency(&dep, &[pattern.as_str()])?;
            }
        }
    }
    debug!(
        rules = config.rules().len(),
        async_rules = config.async_rules().len(),
        deps = config.deps().entries().len(),
        strategy = %config.strategy(),
        "config resolved"
    );
    Ok(config)
}

/// Normalize a top-level rule entry, splitting off its deps.
fn normalize_entry(rule: &str, spec: RawSpec) -> Result<(ValidatorSpec, Vec<String>)> {
    match spec {
        RawSpec::Wrapped(RawWrapped { rules, deps }) => Ok((normalize(rule, *rules)?, deps)),
        other => Ok((normalize(rule, other)?, Vec::new())),
    }
}

/// Normalize a nested spec.
fn normalize(rule: &str, spec: RawSpec) -> Result<ValidatorSpec> {
    Ok(match spec {
        RawSpec::Name(name) => ValidatorSpec::named(name),
        RawSpec::List(items) => ValidatorSpec::Sequence(
            items
                .into_iter()
                .map(|item| normalize(rule, item))
                .collect::<Result<_>>()?,
        ),
        RawSpec::Map(entries) => ValidatorSpec::Map(
            entries
                .0
                .into_iter()
                .filter_map(|(name, options)| match options {
                    RawOptions::Flag(false) => None,
                    RawOptions::Flag(true) => Some((name, Options::new())),
                    RawOptions::Options(options) => Some((name, options)),
                })
                .collect(),
        ),
        RawSpec::Wrapped(_) => {
            return Err(Error::NestedDeps {
                rule: rule.to_string(),
            });
        }
    })
}
