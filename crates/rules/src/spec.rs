//! Validator specs and the values passed to validator functions.

use std::{collections::BTreeMap, fmt, future::Future, sync::Arc};

use attrs::{Captures, Value, get};
use futures::{FutureExt, future::BoxFuture};
use serde::{Deserialize, Serialize};

/// A pending asynchronous check: resolves to `Err(message)` on failure.
pub type Deferred = BoxFuture<'static, Result<(), String>>;

/// Signature shared by registered rules and inline validator functions.
pub type ValidatorFn = Arc<dyn Fn(&Value, &Context<'_>) -> Outcome + Send + Sync>;

/// Options passed to a validator, e.g. `{lessThan: 10, message: "..."}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Options(BTreeMap<String, Value>);

impl Options {
    /// Empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Insert or replace one option.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Raw option value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String option; empty strings count as absent.
    pub fn str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
    }

    /// Numeric option.
    pub fn f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    /// Shallow merge: keys from `other` win.
    pub fn merged(&self, other: &Self) -> Self {
        let mut out = self.clone();
        out.0
            .extend(other.0.iter().map(|(k, v)| (k.clone(), v.clone())));
        out
    }

    /// True when no option is set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Options {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Everything a validator sees besides the value itself.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    /// The full current attribute tree.
    pub attrs: &'a Value,
    /// Concrete path being validated.
    pub path: &'a str,
    /// Indices captured by the matching rule pattern.
    pub captures: &'a Captures,
    /// Default options merged with the rule's own options.
    pub options: &'a Options,
}

impl<'a> Context<'a> {
    /// Caller-supplied message override.
    pub fn message(&self) -> Option<&'a str> {
        self.options.str("message")
    }

    /// Read another attribute, e.g. a sibling the rule compares against.
    pub fn get(&self, path: &str) -> Option<&'a Value> {
        get(self.attrs, path)
    }

    /// The same context with different options.
    pub fn with_options<'b>(&self, options: &'b Options) -> Context<'b>
    where
        'a: 'b,
    {
        Context {
            attrs: self.attrs,
            path: self.path,
            captures: self.captures,
            options,
        }
    }
}

/// Result of running one validator.
pub enum Outcome {
    /// The value is acceptable.
    Valid,
    /// The value fails with this message.
    Invalid(String),
    /// The verdict is pending on an asynchronous check.
    Deferred(Deferred),
}

impl Outcome {
    /// Failing outcome with `message`.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }

    /// Wrap an asynchronous check.
    pub fn deferred<F>(check: F) -> Self
    where
        F: Future<Output = Result<(), String>> + Send + 'static,
    {
        Self::Deferred(check.boxed())
    }

    /// Error message of a synchronous failure.
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Invalid(msg) => Some(msg),
            _ => None,
        }
    }
}

impl fmt::Debug for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Valid => f.write_str("Valid"),
            Self::Invalid(msg) => f.debug_tuple("Invalid").field(msg).finish(),
            Self::Deferred(_) => f.write_str("Deferred"),
        }
    }
}

/// Empty messages are not errors.
impl From<Option<String>> for Outcome {
    fn from(message: Option<String>) -> Self {
        match message {
            Some(msg) if !msg.is_empty() => Self::Invalid(msg),
            _ => Self::Valid,
        }
    }
}

/// How a rule-table entry validates its value.
#[derive(Clone)]
pub enum ValidatorSpec {
    /// A registered rule with its own options.
    Named {
        /// Registered rule name.
        rule: String,
        /// Options merged over the defaults for this rule only.
        options: Options,
    },
    /// Specs evaluated in order; the first error wins.
    Sequence(Vec<Self>),
    /// Named rules with options, evaluated in declaration order like a sequence.
    Map(Vec<(String, Options)>),
    /// An inline validator function.
    Fn(ValidatorFn),
}

impl ValidatorSpec {
    /// A registered rule without options.
    pub fn named(rule: impl Into<String>) -> Self {
        Self::Named {
            rule: rule.into(),
            options: Options::new(),
        }
    }

    /// A registered rule with options.
    pub fn with_options(rule: impl Into<String>, options: Options) -> Self {
        Self::Named {
            rule: rule.into(),
            options,
        }
    }

    /// An inline validator function.
    pub fn func<F>(f: F) -> Self
    where
        F: Fn(&Value, &Context<'_>) -> Outcome + Send + Sync + 'static,
    {
        Self::Fn(Arc::new(f))
    }

    /// Combine two specs so both apply, `self` first.
    pub fn union(self, other: Self) -> Self {
        let mut items = self.into_items();
        items.extend(other.into_items());
        Self::Sequence(items)
    }

    /// Every registered rule name this spec refers to, in order.
    pub fn rule_names(&self) -> Vec<&str> {
        match self {
            Self::Named { rule, .. } => vec![rule.as_str()],
            Self::Sequence(items) => items.iter().flat_map(Self::rule_names).collect(),
            Self::Map(entries) => entries.iter().map(|(name, _)| name.as_str()).collect(),
            Self::Fn(_) => Vec::new(),
        }
    }

    /// Flatten one level of sequence.
    fn into_items(self) -> Vec<Self> {
        match self {
            Self::Sequence(items) => items,
            other => vec![other],
        }
    }
}

impl fmt::Debug for ValidatorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named { rule, options } if options.is_empty() => write!(f, "{rule:?}"),
            Self::Named { rule, options } => f.debug_map().entry(rule, options).finish(),
            Self::Sequence(items) => f.debug_list().entries(items).finish(),
            Self::Map(entries) => f
                .debug_map()
                .entries(entries.iter().map(|(k, v)| (k, v)))
                .finish(),
            Self::Fn(_) => f.write_str("<fn>"),
        }
    }
}

impl From<&str> for ValidatorSpec {
    fn from(rule: &str) -> Self {
        Self::named(rule)
    }
}

impl From<Vec<Self>> for ValidatorSpec {
    fn from(items: Vec<Self>) -> Self {
        Self::Sequence(items)
    }
}
