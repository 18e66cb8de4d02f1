//! On-change revalidation policy.

use std::{fmt, str::FromStr};

use rules::ErrorMap;
use serde::{Deserialize, Serialize};

use crate::Error;

/// When attribute changes revalidate the changed paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OnChangeStrategy {
    /// Revalidate on change once any error is showing.
    #[default]
    #[serde(rename = "onAnyError")]
    OnAnyError,
    /// Revalidate on change once a validation has run since the last reset; before that,
    /// changes clear the errors of the paths they touch.
    #[serde(rename = "onAfterValidate")]
    OnAfterValidate,
    /// Never revalidate on change; changes clear the errors of the paths they touch.
    #[serde(rename = "none")]
    Never,
}

impl OnChangeStrategy {
    /// Resolve a strategy name as written in config files.
    pub fn from_name(name: &str) -> Result<Self, Error> {
        match name {
            "onAnyError" => Ok(Self::OnAnyError),
            "onAfterValidate" => Ok(Self::OnAfterValidate),
            "none" => Ok(Self::Never),
            _ => Err(Error::UnknownStrategy {
                name: name.to_string(),
            }),
        }
    }

    /// Config-file name of this strategy.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OnAnyError => "onAnyError",
            Self::OnAfterValidate => "onAfterValidate",
            Self::Never => "none",
        }
    }

    /// Whether a change should revalidate the paths it touches.
    pub fn should_validate_on_change(self, errors: &ErrorMap, validated: bool) -> bool {
        match self {
            Self::OnAnyError => errors.values().any(|e| !e.is_empty()),
            Self::OnAfterValidate => validated,
            Self::Never => false,
        }
    }

    /// Whether a change that does not revalidate should still clear stale errors.
    pub fn just_drop_error(self, validated: bool) -> bool {
        match self {
            Self::OnAnyError => false,
            Self::OnAfterValidate => !validated,
            Self::Never => true,
        }
    }
}

impl FromStr for OnChangeStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

impl fmt::Display for OnChangeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
