//! Outcome of a validate call.

use attrs::Value;
use rules::ErrorMap;

/// Either the validated attributes or the errors that failed them.
#[derive(Debug, Clone, PartialEq)]
pub struct Validation(Result<Value, ErrorMap>);

impl Validation {
    /// Success when `errors` is empty.
    pub fn new(attrs: &Value, errors: ErrorMap) -> Self {
        if errors.is_empty() {
            Self(Ok(attrs.clone()))
        } else {
            Self(Err(errors))
        }
    }

    /// True when nothing failed.
    pub fn is_valid(&self) -> bool {
        self.0.is_ok()
    }

    /// Validated attributes.
    pub fn attrs(&self) -> Option<&Value> {
        self.0.as_ref().ok()
    }

    /// Errors found.
    pub fn errors(&self) -> Option<&ErrorMap> {
        self.0.as_ref().err()
    }

    /// Run `f` with the attributes when valid.
    pub fn on_success(self, f: impl FnOnce(&Value)) -> Self {
        if let Ok(attrs) = &self.0 {
            f(attrs);
        }
        self
    }

    /// Run `f` with the errors when invalid.
    pub fn on_failure(self, f: impl FnOnce(&ErrorMap)) -> Self {
        if let Err(errors) = &self.0 {
            f(errors);
        }
        self
    }

    /// Unwrap into a standard result.
    pub fn into_result(self) -> Result<Value, ErrorMap> {
        self.0
    }
}

impl From<Validation> for Result<Value, ErrorMap> {
    fn from(v: Validation) -> Self {
        v.0
    }
}
