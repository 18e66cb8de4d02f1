//! Check an attribute file against a rule file.
//!
//! The binary is a thin shell over [`run`]: load the config, start a form session over
//! the attributes, apply any `--set` writes, validate, and render the verdict.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use attrs::Value;
use clap::Parser;
use formstate::{Form, Validation};
use rules::RuleRegistry;
use tracing::debug;

mod error;

#[cfg(test)]
mod test_run;

pub use error::Error;

#[derive(Parser, Debug)]
#[command(
    name = "formcheck",
    about = "Validate attributes against form rules",
    version
)]
/// Command-line interface for the `formcheck` binary.
pub struct Cli {
    /// Rule file (.ron or .json)
    #[arg(long, value_name = "PATH")]
    pub config: PathBuf,

    /// Attribute file (JSON); an empty map when omitted
    #[arg(long, value_name = "PATH")]
    pub attrs: Option<PathBuf>,

    /// Validate only this path or pattern
    #[arg(long, value_name = "PATH")]
    pub path: Option<String>,

    /// Write a value before validating, e.g. --set 'items.0.name="x"'
    #[arg(long = "set", value_name = "PATH=JSON")]
    pub sets: Vec<String>,

    /// Also run asynchronous rules
    #[arg(long = "async")]
    pub run_async: bool,

    /// Print the verdict as JSON
    #[arg(long)]
    pub json: bool,

    /// Logging controls
    #[command(flatten)]
    pub log: logging::LogArgs,
}

/// Split `PATH=JSON`. A value that is not valid JSON is taken as a string.
pub fn parse_assignment(raw: &str) -> Result<(String, Value), Error> {
    let Some((path, value)) = raw.split_once('=') else {
        return Err(Error::Assignment {
            raw: raw.to_string(),
            message: "expected PATH=JSON".into(),
        });
    };
    if path.is_empty() {
        return Err(Error::Assignment {
            raw: raw.to_string(),
            message: "empty path".into(),
        });
    }
    let value = serde_json::from_str::<serde_json::Value>(value)
        .map_or_else(|_| Value::from(value), Value::from);
    Ok((path.to_string(), value))
}

/// Read a JSON attribute file.
pub fn load_attrs(path: &Path) -> Result<Value, Error> {
    let fail = |message: String| Error::Attrs {
        path: path.to_path_buf(),
        message,
    };
    let source = fs::read_to_string(path).map_err(|e| fail(e.to_string()))?;
    let json: serde_json::Value = serde_json::from_str(&source).map_err(|e| fail(e.to_string()))?;
    Ok(Value::from(json))
}

/// Run one check.
pub async fn run(cli: &Cli) -> Result<Validation, Error> {
    let config = config::load_from_path(&cli.config)?;
    let attrs = match &cli.attrs {
        Some(path) => load_attrs(path)?,
        None => Value::empty_map(),
    };
    let assignments = cli
        .sets
        .iter()
        .map(|raw| parse_assignment(raw))
        .collect::<Result<Vec<_>, _>>()?;

    let form = Form::new(attrs, config, Arc::new(RuleRegistry::with_builtins()))?;
    if !assignments.is_empty() {
        debug!(count = assignments.len(), "applying assignments");
        form.set_many(assignments, None)?;
    }
    let path = cli.path.as_deref();
    let verdict = if cli.run_async {
        form.validate_async(path).await?
    } else {
        form.validate(path)?
    };
    Ok(verdict)
}

/// Render a verdict for the terminal, or as JSON.
pub fn render(verdict: &Validation, json: bool) -> String {
    if json {
        let errors = verdict.errors().cloned().unwrap_or_default();
        return serde_json::json!({
            "valid": verdict.is_valid(),
            "errors": errors,
        })
        .to_string();
    }
    match verdict.errors() {
        None => "OK".to_string(),
        Some(errors) => errors
            .iter()
            .map(|(path, message)| format!("{path}: {message}"))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}
