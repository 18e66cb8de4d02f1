//! Built-in validation rules.
//!
//! Every message can be replaced with the `message` option; numeric and length rules
//! also accept a per-check override (`lessThanMessage`, `tooShortMessage`, ...).
//! Apart from `presence`, rules skip blank values so optional fields stay optional.

use std::sync::Arc;

use attrs::Value;
use tracing::warn;

use crate::{Context, Outcome, RuleRegistry, regex_cache::RegexCache};

/// Register the built-in rules on `registry`.
pub fn install(registry: &RuleRegistry) {
    registry.define("presence", presence);
    registry.define("numericality", numericality);
    registry.define("length", length);
    let cache = Arc::new(RegexCache::new());
    registry.define("format", move |value: &Value, ctx: &Context<'_>| {
        format(&cache, value, ctx)
    });
}

/// Null, `false`, the empty string and empty containers.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::List(items) => items.is_empty(),
        Value::Map(map) => map.is_empty(),
        Value::Number(_) => false,
    }
}

/// Pick the specific override, then the generic one, then the default text.
fn message(ctx: &Context<'_>, specific: &str, default: impl FnOnce() -> String) -> Outcome {
    let msg = ctx
        .options
        .str(specific)
        .or_else(|| ctx.message())
        .map_or_else(default, str::to_string);
    Outcome::Invalid(msg)
}

/// Value must not be blank.
fn presence(value: &Value, ctx: &Context<'_>) -> Outcome {
    if is_blank(value) {
        message(ctx, "message", || "Can't be empty".to_string())
    } else {
        Outcome::Valid
    }
}

/// Value must be numeric and satisfy the configured bounds.
fn numericality(value: &Value, ctx: &Context<'_>) -> Outcome {
    if is_blank(value) {
        return Outcome::Valid;
    }
    let Some(n) = value.as_f64() else {
        return message(ctx, "notANumberMessage", || "Should be a number".to_string());
    };
    let opts = ctx.options;
    let checks: [(&str, &str, fn(f64, f64) -> bool, &str); 4] = [
        ("lessThan", "lessThanMessage", |n, b| n < b, "less than"),
        ("greaterThan", "greaterThanMessage", |n, b| n > b, "greater than"),
        (
            "lessThanOrEqualTo",
            "lessThanOrEqualToMessage",
            |n, b| n <= b,
            "less than or equal to",
        ),
        (
            "greaterThanOrEqualTo",
            "greaterThanOrEqualToMessage",
            |n, b| n >= b,
            "greater than or equal to",
        ),
    ];
    for (key, msg_key, ok, text) in checks {
        let Some(bound) = opts.f64(key) else {
            continue;
        };
        if !ok(n, bound) {
            let shown = opts.get(key).map(ToString::to_string).unwrap_or_default();
            return message(ctx, msg_key, || format!("Should be {text} {shown}"));
        }
    }
    Outcome::Valid
}

/// String (in characters) or list length within `minimum`/`maximum`.
fn length(value: &Value, ctx: &Context<'_>) -> Outcome {
    if is_blank(value) {
        return Outcome::Valid;
    }
    let (len, unit) = match value {
        Value::String(s) => (s.chars().count(), "characters"),
        Value::List(items) => (items.len(), "items"),
        _ => return Outcome::Valid,
    };
    let opts = ctx.options;
    if let Some(min) = opts.f64("minimum") {
        if (len as f64) < min {
            return message(ctx, "tooShortMessage", || {
                format!("Should have at least {min} {unit}")
            });
        }
    }
    if let Some(max) = opts.f64("maximum") {
        if (len as f64) > max {
            return message(ctx, "tooLongMessage", || {
                format!("Should have at most {max} {unit}")
            });
        }
    }
    Outcome::Valid
}

/// String must match the `pattern` option.
fn format(cache: &RegexCache, value: &Value, ctx: &Context<'_>) -> Outcome {
    if is_blank(value) {
        return Outcome::Valid;
    }
    let Some(pattern) = ctx.options.str("pattern") else {
        warn!(path = ctx.path, "format rule without a pattern option");
        return Outcome::Valid;
    };
    let text = value.to_string();
    match cache.get_or_compile(pattern) {
        Ok(re) if re.is_match(&text) => Outcome::Valid,
        Ok(_) => message(ctx, "message", || "Has invalid format".to_string()),
        Err(e) => {
            warn!(path = ctx.path, pattern, error = %e, "invalid format pattern");
            message(ctx, "message", || "Has invalid format".to_string())
        }
    }
}
