//! Helper factories: derived values computed from the current form state.

use std::{fmt, sync::Arc};

use attrs::{Map, Value, get};
use rules::ErrorMap;

/// What a helper sees.
#[derive(Debug, Clone, Copy)]
pub struct HelperScope<'a> {
    /// Current attributes.
    pub attrs: &'a Value,
    /// Current errors.
    pub errors: &'a ErrorMap,
}

impl<'a> HelperScope<'a> {
    /// Read an attribute.
    pub fn get(&self, path: &str) -> Option<&'a Value> {
        get(self.attrs, path)
    }

    /// Error currently shown for `path`.
    pub fn error(&self, path: &str) -> Option<&'a str> {
        self.errors.get(path).map(String::as_str)
    }
}

/// A named bundle of derived values, e.g. `isFreeDelivery`.
#[derive(Clone)]
pub struct Helper(Arc<dyn Fn(&HelperScope<'_>) -> Map + Send + Sync>);

impl Helper {
    /// Wrap a helper function.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&HelperScope<'_>) -> Map + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Evaluate the helper.
    pub fn call(&self, scope: &HelperScope<'_>) -> Map {
        (self.0)(scope)
    }
}

impl fmt::Debug for Helper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Helper(<fn>)")
    }
}

/// Evaluate helpers in order and merge their outputs; later keys win.
pub fn eval_helpers(helpers: &[Helper], scope: &HelperScope<'_>) -> Map {
    let mut out = Map::new();
    for helper in helpers {
        out.extend(helper.call(scope));
    }
    out
}
