//! A form session: shared engine state plus the operations a binding layer calls.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use attrs::{Map, Value, get, path::join};
use config::{Config, ConfigId};
use parking_lot::Mutex;
use rules::{ErrorMap, RuleRegistry, patch_errors};
use tracing::{debug, warn};

use crate::{
    Error, Result, Validation,
    action::{Action, Patch, ResetTo, Response},
    state::EngineState,
};

/// Called with the new attributes after every write, in controlled mode.
pub type OnChange = Arc<dyn Fn(&Value) + Send + Sync>;

/// Value, error and name of one field, as a binding layer needs them.
#[derive(Debug, Clone, PartialEq)]
pub struct Input {
    /// Full path of the field.
    pub name: String,
    /// Current value; null when absent.
    pub value: Value,
    /// Current error.
    pub error: Option<String>,
}

/// State shared by every handle of one session.
struct Shared {
    /// The engine state; locked only for the duration of one transition.
    state: Mutex<EngineState>,
    /// Rule lookup.
    registry: Arc<RuleRegistry>,
    /// Cleared by [`Form::close`].
    alive: AtomicBool,
    /// Controlled-mode change notification.
    on_change: Option<OnChange>,
}

/// Handle to one form session. Clones share the session.
///
/// Transitions are applied one at a time under a lock. Asynchronous validation awaits
/// outside the lock and merges its verdicts only while the session is alive and the
/// pass is still the latest one.
#[derive(Clone)]
pub struct Form {
    /// Session state.
    shared: Arc<Shared>,
}

impl Form {
    /// Start a session over `attrs` with `config` as the base layer.
    pub fn new(attrs: Value, config: Config, registry: Arc<RuleRegistry>) -> Result<Self> {
        Self::build(attrs, config, registry, None)
    }

    /// Start a session whose attribute tree is owned elsewhere.
    ///
    /// `on_change` receives the new tree after every write made through this session.
    /// The owner pushes its tree back with [`Form::sync_attrs`].
    pub fn controlled<F>(
        attrs: Value,
        config: Config,
        registry: Arc<RuleRegistry>,
        on_change: F,
    ) -> Result<Self>
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        Self::build(attrs, config, registry, Some(Arc::new(on_change)))
    }

    /// Shared constructor.
    fn build(
        attrs: Value,
        config: Config,
        registry: Arc<RuleRegistry>,
        on_change: Option<OnChange>,
    ) -> Result<Self> {
        config.check(&registry)?;
        Ok(Self {
            shared: Arc::new(Shared {
                state: Mutex::new(EngineState::new(attrs, config)),
                registry,
                alive: AtomicBool::new(true),
                on_change,
            }),
        })
    }

    /// Apply one action.
    ///
    /// Fails with [`Error::Closed`] once the session has been closed.
    pub fn dispatch(&self, action: Action) -> Result<Response> {
        if !self.is_alive() {
            return Err(Error::Closed);
        }
        let notify = self.shared.on_change.is_some()
            && matches!(
                action,
                Action::SetAttr { .. } | Action::SetAttrs { .. } | Action::Reset(_)
            );
        let (response, changed) = {
            let mut state = self.shared.state.lock();
            let response = state.apply(&self.shared.registry, action)?;
            (response, notify.then(|| state.attrs().clone()))
        };
        if let (Some(on_change), Some(attrs)) = (&self.shared.on_change, changed) {
            on_change(&attrs);
        }
        Ok(response)
    }

    /// Run a typed transition on a live session.
    fn guarded<R>(
        &self,
        f: impl FnOnce(&mut EngineState, &RuleRegistry) -> Result<R>,
    ) -> Result<R> {
        if !self.is_alive() {
            return Err(Error::Closed);
        }
        let mut state = self.shared.state.lock();
        f(&mut *state, self.shared.registry.as_ref())
    }

    /// Run `f` against the current state.
    pub fn with_state<R>(&self, f: impl FnOnce(&EngineState) -> R) -> R {
        let state = self.shared.state.lock();
        f(&*state)
    }

    /// Current attributes.
    pub fn attrs(&self) -> Value {
        self.with_state(|s| s.attrs().clone())
    }

    /// Current errors.
    pub fn errors(&self) -> ErrorMap {
        self.with_state(|s| s.errors().clone())
    }

    /// Value at `path`.
    pub fn get(&self, path: &str) -> Option<Value> {
        self.with_state(|s| get(s.attrs(), path).cloned())
    }

    /// Error at `path`.
    pub fn error(&self, path: &str) -> Option<String> {
        self.with_state(|s| s.errors().get(path).cloned())
    }

    /// True when no error is present.
    pub fn is_valid(&self) -> bool {
        self.with_state(EngineState::is_valid)
    }

    /// No write since creation or the last reset.
    pub fn is_pristine(&self) -> bool {
        self.with_state(EngineState::is_pristine)
    }

    /// A validate has run since creation or the last reset.
    pub fn is_validated(&self) -> bool {
        self.with_state(EngineState::is_validated)
    }

    /// Pending asynchronous checks per path, while a pass is in flight.
    pub fn validating(&self) -> Option<BTreeMap<String, usize>> {
        self.with_state(|s| s.validating().map(|v| v.in_flight.clone()))
    }

    /// Field triple for a binding layer.
    pub fn input(&self, path: &str) -> Input {
        self.with_state(|s| Input {
            name: path.to_string(),
            value: get(s.attrs(), path).cloned().unwrap_or_default(),
            error: s.errors().get(path).cloned(),
        })
    }

    /// Outputs of every helper, later keys winning.
    pub fn helpers(&self) -> Map {
        self.with_state(|s| s.config().eval_helpers(s.attrs(), s.errors()))
    }

    /// View of this session relative to `prefix`.
    pub fn scoped(&self, prefix: &str) -> FormScope {
        FormScope {
            form: self.clone(),
            prefix: prefix.to_string(),
        }
    }

    /// Store `value` at `path`.
    pub fn set(&self, path: &str, value: impl Into<Value>) -> Result<()> {
        self.dispatch(Action::SetAttr {
            path: path.to_string(),
            value: value.into(),
        })
        .map(drop)
    }

    /// Store several values in one transition, each key resolved under `prefix`.
    pub fn set_many<I, K>(&self, entries: I, prefix: Option<&str>) -> Result<()>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let entries = entries.into_iter().map(|(k, v)| (k.into(), v)).collect();
        self.dispatch(Action::SetAttrs {
            patch: Patch::Entries(entries),
            prefix: prefix.map(str::to_string),
        })
        .map(drop)
    }

    /// Compute a patch from the subtree at `prefix` (or the root) and apply it in one
    /// transition.
    pub fn update<F>(&self, prefix: Option<&str>, f: F) -> Result<()>
    where
        F: FnOnce(&Value) -> Vec<(String, Value)> + Send + 'static,
    {
        self.dispatch(Action::SetAttrs {
            patch: Patch::Updater(Box::new(f)),
            prefix: prefix.map(str::to_string),
        })
        .map(drop)
    }

    /// Replace the tree with one owned elsewhere, revalidating when the policy allows.
    ///
    /// A tree identical to the current one is ignored.
    pub fn sync_attrs(&self, attrs: Value) -> Result<()> {
        if self.with_state(|s| s.attrs().same_node(&attrs)) {
            return Ok(());
        }
        self.dispatch(Action::SetFullAttrs {
            attrs,
            validate: true,
        })
        .map(drop)
    }

    /// Synchronously validate `path`, or every rule when `None`.
    pub fn validate(&self, path: Option<&str>) -> Result<Validation> {
        self.guarded(|state, registry| state.validate(registry, path))
    }

    /// Validate synchronously, then run the asynchronous rules and wait for all of
    /// them to settle.
    ///
    /// Paths failing synchronously are not checked asynchronously. While the pass is
    /// in flight [`Form::validating`] reports it. If the session is closed before the
    /// pass settles, its verdicts are dropped and [`Error::Closed`] is returned.
    pub async fn validate_async(&self, path: Option<&str>) -> Result<Validation> {
        let sync = self.validate(path)?;
        let skip: BTreeSet<String> = sync
            .errors()
            .map(|e| e.keys().cloned().collect())
            .unwrap_or_default();

        let Response::AsyncStarted {
            pass,
            checks,
            strategy,
        } = self.dispatch(Action::StartAsync {
            path: path.map(str::to_string),
            skip,
        })?
        else {
            return Ok(sync);
        };

        let patch = checks.settle(&strategy).await;
        if !self.is_alive() {
            warn!(pass, "session closed during async validation; dropping verdicts");
            return Err(Error::Closed);
        }

        let mut found = sync.errors().cloned().unwrap_or_default();
        found.extend(patch_errors(&patch));
        self.dispatch(Action::SettleAsync { pass, patch })?;
        Ok(Validation::new(&self.attrs(), found))
    }

    /// Set or clear the error at `path`.
    pub fn set_error(&self, path: &str, error: Option<&str>) -> Result<()> {
        self.dispatch(Action::SetError {
            path: path.to_string(),
            error: error.map(str::to_string),
        })
        .map(drop)
    }

    /// Replace every error.
    pub fn set_errors(&self, errors: ErrorMap) -> Result<()> {
        self.dispatch(Action::SetErrors(errors)).map(drop)
    }

    /// Remove the error at `path`.
    pub fn drop_error(&self, path: &str) -> Result<()> {
        self.dispatch(Action::DropError(path.to_string())).map(drop)
    }

    /// Restore the initial snapshot.
    pub fn reset(&self) -> Result<()> {
        self.dispatch(Action::Reset(ResetTo::Initial)).map(drop)
    }

    /// Restore `attrs`, which becomes the new initial snapshot.
    pub fn reset_to(&self, attrs: Value) -> Result<()> {
        self.dispatch(Action::Reset(ResetTo::Tree(attrs))).map(drop)
    }

    /// Restore a tree computed from the current one.
    pub fn reset_with<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&Value) -> Value + Send + 'static,
    {
        self.dispatch(Action::Reset(ResetTo::With(Box::new(f))))
            .map(drop)
    }

    /// Push a config layer.
    pub fn add_config(&self, config: Config) -> Result<ConfigId> {
        match self.dispatch(Action::AddConfig(config))? {
            Response::ConfigAdded(id) => Ok(id),
            other => unreachable!("AddConfig answered {other:?}"),
        }
    }

    /// Remove a config layer pushed earlier.
    pub fn remove_config(&self, id: ConfigId) -> Result<()> {
        self.dispatch(Action::RemoveConfig(id)).map(drop)
    }

    /// Replace the base config.
    pub fn amend_config(&self, config: Config) -> Result<()> {
        self.dispatch(Action::AmendConfig(config)).map(drop)
    }

    /// End the session. Pending asynchronous verdicts are discarded and later
    /// operations fail.
    pub fn close(&self) {
        if self.shared.alive.swap(false, Ordering::SeqCst) {
            debug!("form session closed");
        }
    }

    /// False once [`Form::close`] has been called.
    pub fn is_alive(&self) -> bool {
        self.shared.alive.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Form")
            .field("alive", &self.is_alive())
            .field("controlled", &self.shared.on_change.is_some())
            .finish()
    }
}

/// A session view whose paths are relative to a prefix, e.g. one collection item.
#[derive(Debug, Clone)]
pub struct FormScope {
    /// The session.
    form: Form,
    /// Path every key is resolved under.
    prefix: String,
}

impl FormScope {
    /// Full path of `key`.
    pub fn path(&self, key: &str) -> String {
        join(&self.prefix, key)
    }

    /// Value at `key`.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.form.get(&self.path(key))
    }

    /// Error at `key`.
    pub fn error(&self, key: &str) -> Option<String> {
        self.form.error(&self.path(key))
    }

    /// Field triple for `key`, named by its full path.
    pub fn input(&self, key: &str) -> Input {
        self.form.input(&self.path(key))
    }

    /// Store `value` at `key`.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        self.form.set(&self.path(key), value)
    }

    /// Store several values below the prefix in one transition.
    pub fn set_many<I, K>(&self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        self.form.set_many(entries, Some(&self.prefix))
    }

    /// Push `config` with every pattern moved under the prefix.
    pub fn add_config(&self, config: &Config) -> Result<ConfigId> {
        self.form.add_config(config.scoped(&self.prefix)?)
    }
}
