//! Builtin `merge`, `filter` and `transform` operations.
//!
//! Each takes its whole input from the operation's resolved parameters.

use serde_json::{Map, Value};

use super::EngineError;
use crate::condition::{self, CompareOp, Condition};
use crate::value::{self, lookup_path};

/// `{sources: [..], strategy}`; strategy defaults to `deep_merge`.
pub fn merge(operation: &str, params: &Value) -> Result<Value, EngineError> {
    let sources = params
        .get("sources")
        .and_then(Value::as_array)
        .ok_or_else(|| invalid(operation, "merge requires a 'sources' array"))?;
    let strategy = params
        .get("strategy")
        .and_then(Value::as_str)
        .unwrap_or("deep_merge");
    Ok(value::merge(sources, strategy)?)
}

/// `{items, condition}` or `{items, field, op, value}`. Returns the items
/// that match.
pub fn filter(operation: &str, params: &Value) -> Result<Value, EngineError> {
    let items = params
        .get("items")
        .and_then(Value::as_array)
        .ok_or_else(|| invalid(operation, "filter requires an 'items' array"))?;

    let predicate = match params.get("condition").and_then(Value::as_str) {
        Some(text) => condition::parse(text).map_err(|e| invalid(operation, &e.to_string()))?,
        None => {
            let field = params
                .get("field")
                .and_then(Value::as_str)
                .ok_or_else(|| invalid(operation, "filter requires 'condition' or 'field'"))?;
            let op_token = params.get("op").and_then(Value::as_str).unwrap_or("==");
            let op = CompareOp::parse(op_token)
                .ok_or_else(|| invalid(operation, &format!("unknown operator '{op_token}'")))?;
            Condition::Compare {
                path: field.to_string(),
                op,
                literal: params.get("value").cloned().unwrap_or(Value::Null),
            }
        }
    };

    let kept = items
        .iter()
        .filter(|item| {
            // Items lacking the field are dropped rather than failing the run.
            predicate
                .evaluate(|path: &str| {
                    let path = path.strip_prefix("item.").unwrap_or(path);
                    lookup_path(item, path).cloned()
                })
                .unwrap_or(false)
        })
        .cloned()
        .collect();
    Ok(Value::Array(kept))
}

/// `{input, mapping: {new_key: path}}` or `{input, pick: [keys]}`, applied
/// element-wise when `input` is an array.
pub fn transform(operation: &str, params: &Value) -> Result<Value, EngineError> {
    let input = params.get("input").unwrap_or(&Value::Null);

    let reshape: Box<dyn Fn(&Value) -> Value> =
        if let Some(mapping) = params.get("mapping").and_then(Value::as_object) {
            let mut paths = Vec::with_capacity(mapping.len());
            for (key, path) in mapping {
                let path = path.as_str().ok_or_else(|| {
                    invalid(operation, &format!("mapping for '{key}' must be a path string"))
                })?;
                value::parse_path(path)?;
                paths.push((key.clone(), path.to_string()));
            }
            Box::new(move |item: &Value| {
                let out: Map<String, Value> = paths
                    .iter()
                    .map(|(key, path)| {
                        let found = lookup_path(item, path).cloned().unwrap_or(Value::Null);
                        (key.clone(), found)
                    })
                    .collect();
                Value::Object(out)
            })
        } else if let Some(pick) = params.get("pick").and_then(Value::as_array) {
            let keys: Vec<String> = pick
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect();
            Box::new(move |item: &Value| {
                let out: Map<String, Value> = keys
                    .iter()
                    .filter_map(|k| item.get(k).map(|v| (k.clone(), v.clone())))
                    .collect();
                Value::Object(out)
            })
        } else {
            return Err(invalid(operation, "transform requires 'mapping' or 'pick'"));
        };

    Ok(match input {
        Value::Array(items) => Value::Array(items.iter().map(|item| reshape(item)).collect()),
        other => reshape(other),
    })
}

fn invalid(operation: &str, reason: &str) -> EngineError {
    EngineError::InvalidOperation {
        operation: operation.to_string(),
        reason: reason.to_string(),
    }
}
