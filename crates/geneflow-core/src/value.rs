//! Helpers over `serde_json::Value`: path lookup and extraction, merging,
//! a minimal JSON-Schema check, and canonical serialization for cache keys.

use serde_json::{Map, Value};

/// Errors from value utilities.
#[derive(Debug, thiserror::Error)]
pub enum ValueError {
    #[error("unknown merge strategy '{0}' (expected deep_merge, shallow or concat)")]
    UnknownMergeStrategy(String),

    #[error("invalid path '{0}'")]
    InvalidPath(String),
}

/// One step of a dotted path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Object key. Numeric keys also index arrays.
    Key(String),
    Index(usize),
    /// Every element of an array or every value of an object.
    Wildcard,
}

/// Parse `a.b[0].c`, `a.*.b`, `a[*]` or `a.0` into segments.
///
/// The empty path addresses the value itself.
pub fn parse_path(path: &str) -> Result<Vec<PathSegment>, ValueError> {
    let invalid = || ValueError::InvalidPath(path.to_string());
    let mut segments = Vec::new();
    if path.is_empty() {
        return Ok(segments);
    }

    for part in path.split('.') {
        let (key, mut rest) = match part.find('[') {
            Some(i) => (&part[..i], &part[i..]),
            None => (part, ""),
        };

        if key.is_empty() && rest.is_empty() {
            return Err(invalid());
        }
        if !key.is_empty() {
            if key == "*" {
                segments.push(PathSegment::Wildcard);
            } else {
                segments.push(PathSegment::Key(key.to_string()));
            }
        }

        while !rest.is_empty() {
            let inner = rest.strip_prefix('[').ok_or_else(invalid)?;
            let close = inner.find(']').ok_or_else(invalid)?;
            let index = &inner[..close];
            if index == "*" {
                segments.push(PathSegment::Wildcard);
            } else {
                let i: usize = index.parse().map_err(|_| invalid())?;
                segments.push(PathSegment::Index(i));
            }
            rest = &inner[close + 1..];
        }
    }

    Ok(segments)
}

/// Look up a single value by path. Wildcards never match here; use
/// [`extract_values`] for those.
pub fn lookup_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let segments = parse_path(path).ok()?;
    let mut current = value;
    for segment in &segments {
        current = match (segment, current) {
            (PathSegment::Key(k), Value::Object(map)) => map.get(k)?,
            (PathSegment::Key(k), Value::Array(items)) => items.get(k.parse::<usize>().ok()?)?,
            (PathSegment::Index(i), Value::Array(items)) => items.get(*i)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Collect every value addressed by `path`, expanding wildcards.
pub fn extract_values(value: &Value, path: &str) -> Result<Vec<Value>, ValueError> {
    let segments = parse_path(path)?;
    let mut current: Vec<&Value> = vec![value];

    for segment in &segments {
        let mut next = Vec::new();
        for v in current {
            match (segment, v) {
                (PathSegment::Key(k), Value::Object(map)) => next.extend(map.get(k)),
                (PathSegment::Key(k), Value::Array(items)) => {
                    if let Ok(i) = k.parse::<usize>() {
                        next.extend(items.get(i));
                    }
                }
                (PathSegment::Index(i), Value::Array(items)) => next.extend(items.get(*i)),
                (PathSegment::Wildcard, Value::Array(items)) => next.extend(items.iter()),
                (PathSegment::Wildcard, Value::Object(map)) => next.extend(map.values()),
                _ => {}
            }
        }
        current = next;
    }

    Ok(current.into_iter().cloned().collect())
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

/// Merge values left to right with the named strategy.
///
/// - `deep_merge`: objects merge recursively; later scalars and arrays win.
/// - `shallow`: later top-level keys replace earlier ones.
/// - `concat`: arrays are flattened into one; non-arrays are appended.
pub fn merge(values: &[Value], strategy: &str) -> Result<Value, ValueError> {
    match strategy {
        "deep_merge" => {
            let mut acc = Value::Object(Map::new());
            for v in values {
                deep_merge_into(&mut acc, v);
            }
            Ok(acc)
        }
        "shallow" => {
            let mut acc = Value::Object(Map::new());
            for v in values {
                match (&mut acc, v) {
                    (Value::Object(target), Value::Object(src)) => {
                        for (k, val) in src {
                            target.insert(k.clone(), val.clone());
                        }
                    }
                    (target, other) => *target = other.clone(),
                }
            }
            Ok(acc)
        }
        "concat" => {
            let mut out = Vec::new();
            for v in values {
                match v {
                    Value::Array(items) => out.extend(items.iter().cloned()),
                    Value::Null => {}
                    other => out.push(other.clone()),
                }
            }
            Ok(Value::Array(out))
        }
        other => Err(ValueError::UnknownMergeStrategy(other.to_string())),
    }
}

fn deep_merge_into(target: &mut Value, src: &Value) {
    match (target, src) {
        (Value::Object(t), Value::Object(s)) => {
            for (k, v) in s {
                match t.get_mut(k) {
                    Some(existing) => deep_merge_into(existing, v),
                    None => {
                        t.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (t, s) => *t = s.clone(),
    }
}

// ---------------------------------------------------------------------------
// Schema validation
// ---------------------------------------------------------------------------

/// Check `value` against a minimal JSON-Schema subset (`type`, `required`,
/// `properties`, `items`, `enum`, `minimum`, `maximum`).
///
/// Returns human-readable problems; an empty list means the value conforms.
/// A null or non-object schema accepts everything.
pub fn validate_against_schema(value: &Value, schema: &Value) -> Vec<String> {
    let mut errors = Vec::new();
    check_schema(value, schema, "$", &mut errors);
    errors
}

fn check_schema(value: &Value, schema: &Value, at: &str, errors: &mut Vec<String>) {
    let Some(schema) = schema.as_object() else {
        return;
    };

    if let Some(expected) = schema.get("type") {
        let allowed: Vec<&str> = match expected {
            Value::String(s) => vec![s.as_str()],
            Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        };
        if !allowed.is_empty() && !allowed.iter().any(|t| type_matches(t, value)) {
            errors.push(format!(
                "{at}: expected {}, got {}",
                allowed.join(" or "),
                type_name(value)
            ));
            return;
        }
    }

    if let Some(Value::Array(options)) = schema.get("enum") {
        if !options.contains(value) {
            errors.push(format!("{at}: value {value} is not one of the allowed values"));
        }
    }

    if let Some(n) = value.as_f64() {
        if let Some(min) = schema.get("minimum").and_then(Value::as_f64) {
            if n < min {
                errors.push(format!("{at}: {n} is less than minimum {min}"));
            }
        }
        if let Some(max) = schema.get("maximum").and_then(Value::as_f64) {
            if n > max {
                errors.push(format!("{at}: {n} is greater than maximum {max}"));
            }
        }
    }

    if let Value::Object(map) = value {
        if let Some(Value::Array(required)) = schema.get("required") {
            for key in required.iter().filter_map(Value::as_str) {
                if !map.contains_key(key) {
                    errors.push(format!("{at}: missing required property '{key}'"));
                }
            }
        }
        if let Some(Value::Object(props)) = schema.get("properties") {
            for (key, prop_schema) in props {
                if let Some(v) = map.get(key) {
                    check_schema(v, prop_schema, &format!("{at}.{key}"), errors);
                }
            }
        }
    }

    if let (Value::Array(items), Some(item_schema)) = (value, schema.get("items")) {
        for (i, item) in items.iter().enumerate() {
            check_schema(item, item_schema, &format!("{at}[{i}]"), errors);
        }
    }
}

fn type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        "null" => value.is_null(),
        _ => true,
    }
}

/// JSON type name of a value, as used in diagnostics.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Render a value as template text: strings verbatim, null as empty,
/// everything else as compact JSON.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Serialize with object keys sorted at every level.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Whether a value counts as a meaningful search parameter: null never does,
/// empty strings and empty arrays do not, every other value does.
pub fn is_meaningful(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_path_forms() {
        assert_eq!(
            parse_path("variants[0].genotype").unwrap(),
            vec![
                PathSegment::Key("variants".into()),
                PathSegment::Index(0),
                PathSegment::Key("genotype".into()),
            ]
        );
        assert_eq!(
            parse_path("genes.*.symbol").unwrap()[1],
            PathSegment::Wildcard
        );
        assert_eq!(parse_path("[2]").unwrap(), vec![PathSegment::Index(2)]);
        assert!(parse_path("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_path_rejects_malformed() {
        assert!(parse_path("a..b").is_err());
        assert!(parse_path("a[x]").is_err());
        assert!(parse_path("a[1").is_err());
    }

    #[test]
    fn test_lookup_path() {
        let v = json!({"a": {"b": [10, {"c": "deep"}]}});
        assert_eq!(lookup_path(&v, "a.b[0]"), Some(&json!(10)));
        assert_eq!(lookup_path(&v, "a.b.1.c"), Some(&json!("deep")));
        assert_eq!(lookup_path(&v, "a.missing"), None);
        assert_eq!(lookup_path(&v, "a.b[*]"), None);
        assert_eq!(lookup_path(&v, ""), Some(&v));
    }

    #[test]
    fn test_extract_values_with_wildcard() {
        let v = json!({"genes": [{"symbol": "COMT"}, {"symbol": "HTR2A"}, {"id": 1}]});
        let symbols = extract_values(&v, "genes[*].symbol").unwrap();
        assert_eq!(symbols, vec![json!("COMT"), json!("HTR2A")]);
        let same = extract_values(&v, "genes.*.symbol").unwrap();
        assert_eq!(same.len(), 2);
    }

    #[test]
    fn test_deep_merge() {
        let merged = merge(
            &[
                json!({"a": {"x": 1, "y": 2}, "list": [1]}),
                json!({"a": {"y": 3, "z": 4}, "list": [2]}),
            ],
            "deep_merge",
        )
        .unwrap();
        assert_eq!(merged, json!({"a": {"x": 1, "y": 3, "z": 4}, "list": [2]}));
    }

    #[test]
    fn test_shallow_merge_replaces_nested() {
        let merged = merge(
            &[json!({"a": {"x": 1}, "b": 1}), json!({"a": {"y": 2}})],
            "shallow",
        )
        .unwrap();
        assert_eq!(merged, json!({"a": {"y": 2}, "b": 1}));
    }

    #[test]
    fn test_concat_merge() {
        let merged = merge(&[json!([1, 2]), json!(null), json!(3), json!([4])], "concat").unwrap();
        assert_eq!(merged, json!([1, 2, 3, 4]));
    }

    #[test]
    fn test_unknown_merge_strategy() {
        let err = merge(&[], "zip").unwrap_err();
        assert!(err.to_string().contains("zip"), "got: {err}");
    }

    #[test]
    fn test_schema_validation() {
        let schema = json!({
            "type": "object",
            "required": ["condition"],
            "properties": {
                "condition": {"type": "string"},
                "depth": {"enum": ["basic", "comprehensive"]},
                "limit": {"type": "integer", "minimum": 1, "maximum": 100},
                "genes": {"type": "array", "items": {"type": "string"}}
            }
        });
        assert!(validate_against_schema(&json!({"condition": "depression"}), &schema).is_empty());

        let errors = validate_against_schema(
            &json!({"depth": "deep", "limit": 500, "genes": ["COMT", 7]}),
            &schema,
        );
        assert_eq!(errors.len(), 4, "got: {errors:?}");
        assert!(errors.iter().any(|e| e.contains("missing required property 'condition'")));
        assert!(errors.iter().any(|e| e.contains("$.genes[1]")));
    }

    #[test]
    fn test_schema_null_accepts_anything() {
        assert!(validate_against_schema(&json!(42), &Value::Null).is_empty());
    }

    #[test]
    fn test_canonical_json_sorts_keys() {
        let a = json!({"b": 1, "a": {"d": [1, {"z": 0, "y": 1}], "c": null}});
        assert_eq!(
            canonical_json(&a),
            r#"{"a":{"c":null,"d":[1,{"y":1,"z":0}]},"b":1}"#
        );
    }

    #[test]
    fn test_value_to_string() {
        assert_eq!(value_to_string(&json!("x")), "x");
        assert_eq!(value_to_string(&json!(null)), "");
        assert_eq!(value_to_string(&json!(5)), "5");
        assert_eq!(value_to_string(&json!(["a"])), r#"["a"]"#);
    }

    #[test]
    fn test_is_meaningful() {
        assert!(!is_meaningful(&json!(null)));
        assert!(!is_meaningful(&json!("")));
        assert!(!is_meaningful(&json!([])));
        assert!(is_meaningful(&json!(0)));
        assert!(is_meaningful(&json!(false)));
        assert!(is_meaningful(&json!({})));
        assert!(is_meaningful(&json!(["COMT"])));
    }
}
