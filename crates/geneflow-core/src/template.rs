//! `${TYPE:KEY}` placeholder resolution.
//!
//! Supported types:
//! - `ENV:NAME` -- process environment variable, empty when unset
//! - `CONFIG:NAME|DEFAULT` -- context map lookup with an optional default
//! - `INPUT:NAME` -- context map lookup, empty when absent
//!
//! `CALC` and `EXTRACT` are reserved; they and any other unknown type resolve
//! to the empty string. Placeholders without a `:` are left as written.

use std::collections::HashMap;

use serde_json::Value;

/// Resolve every placeholder in `template`.
///
/// The scan runs left to right and never revisits replacement text, so a
/// value that itself contains `${...}` is emitted verbatim and resolution
/// always terminates.
pub fn resolve(template: &str, context: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(close) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };

        let body = &after[..close];
        match body.split_once(':') {
            Some((kind, key)) => out.push_str(&resolve_placeholder(kind, key, context)),
            None => out.push_str(&rest[start..start + 2 + close + 1]),
        }
        rest = &after[close + 1..];
    }

    out.push_str(rest);
    out
}

fn resolve_placeholder(kind: &str, key: &str, context: &HashMap<String, String>) -> String {
    match kind {
        "ENV" => std::env::var(key).unwrap_or_default(),
        "CONFIG" => {
            let (name, default) = key.split_once('|').unwrap_or((key, ""));
            context
                .get(name)
                .cloned()
                .unwrap_or_else(|| default.to_string())
        }
        "INPUT" => context.get(key).cloned().unwrap_or_default(),
        _ => String::new(),
    }
}

/// The `TYPE:KEY` bodies of all well-formed placeholders, in order.
pub fn extract_template_variables(template: &str) -> Vec<String> {
    let mut vars = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        let Some(close) = after.find('}') else {
            break;
        };
        let body = &after[..close];
        if body.contains(':') {
            vars.push(body.to_string());
        }
        rest = &after[close + 1..];
    }
    vars
}

/// Whether `s` contains at least one well-formed placeholder.
pub fn is_template_string(s: &str) -> bool {
    !extract_template_variables(s).is_empty()
}

/// Resolve placeholders in every string leaf of `value`.
///
/// A string consisting of exactly one `${INPUT:key}` placeholder is replaced
/// by `lookup(key)` when that yields a value, so arrays and objects pass
/// between operations without being flattened to text.
pub fn resolve_value<F>(value: &Value, context: &HashMap<String, String>, lookup: &F) -> Value
where
    F: Fn(&str) -> Option<Value>,
{
    match value {
        Value::String(s) => {
            if let Some(key) = sole_input_placeholder(s) {
                if let Some(found) = lookup(key) {
                    return found;
                }
            }
            Value::String(resolve(s, context))
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|v| resolve_value(v, context, lookup))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), resolve_value(v, context, lookup)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn sole_input_placeholder(s: &str) -> Option<&str> {
    let key = s.strip_prefix("${INPUT:")?.strip_suffix('}')?;
    if key.contains('}') || key.contains("${") {
        return None;
    }
    Some(key)
}
