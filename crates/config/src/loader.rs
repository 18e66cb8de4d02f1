//! Load configs from disk.

use std::{ffi::OsStr, fs, path::Path};

use tracing::debug;

use crate::{Config, Error};

/// Source formats accepted by [`load_from_path`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Rusty Object Notation.
    Ron,
    /// JSON.
    Json,
}

impl Format {
    /// Pick a format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(OsStr::to_str) {
            Some("ron") => Some(Self::Ron),
            Some("json") => Some(Self::Json),
            _ => None,
        }
    }
}

/// Parse and resolve a config from a string.
pub fn load_from_str(source: &str, format: Format) -> Result<Config, Error> {
    match format {
        Format::Ron => Config::from_ron(source),
        Format::Json => Config::from_json(source),
    }
}

/// Load a config file, choosing the format by extension.
pub fn load_from_path(path: &Path) -> Result<Config, Error> {
    let Some(format) = Format::from_path(path) else {
        return Err(Error::Read {
            path: Some(path.to_path_buf()),
            message: "Unsupported config format (expected a .ron or .json file)".to_string(),
        });
    };
    let source = fs::read_to_string(path).map_err(|e| Error::Read {
        path: Some(path.to_path_buf()),
        message: e.to_string(),
    })?;
    debug!(path = %path.display(), ?format, "loading config");
    load_from_str(&source, format).map_err(|e| e.with_path(path))
}
