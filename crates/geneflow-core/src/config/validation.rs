//! Parameter validation: per-field rules and the broad-search guard.

use regex::Regex;
use serde_json::Value;

use geneflow_types::validation::ValidationRule;

use crate::value::{is_meaningful, value_to_string};

pub const EMPTY_PARAMETERS_MESSAGE: &str =
    "At least one search parameter is required for this endpoint.";
pub const NO_MEANINGFUL_PARAMETER_MESSAGE: &str =
    "At least one non-empty search parameter is required for this endpoint.";

pub fn missing_parameters_message(endpoint: &str) -> String {
    format!("Missing parameters object for endpoint '{endpoint}'.")
}

/// Guard for broad-search endpoints.
///
/// `parameters` must be an object, must not be empty, and at least one of
/// its values must be meaningful (not null, `""` or `[]`).
pub fn broad_search_error(endpoint: &str, parameters: &Value) -> Option<String> {
    let Some(params) = parameters.as_object() else {
        return Some(missing_parameters_message(endpoint));
    };
    if params.is_empty() {
        return Some(EMPTY_PARAMETERS_MESSAGE.to_string());
    }
    if !params.values().any(is_meaningful) {
        return Some(NO_MEANINGFUL_PARAMETER_MESSAGE.to_string());
    }
    None
}

/// Check one parameter against its rule. `pattern` is the compiled form of
/// `rule.pattern`.
pub fn validate_field(
    field: &str,
    value: Option<&Value>,
    rule: &ValidationRule,
    pattern: Option<&Regex>,
) -> Vec<String> {
    let mut errors = Vec::new();

    let Some(value) = value.filter(|v| !v.is_null()) else {
        if rule.required {
            errors.push(format!("Missing required parameter '{field}'."));
        }
        return errors;
    };

    if let Some(kind) = rule.value_type {
        if !kind.matches(value) {
            errors.push(format!("Parameter '{field}' must be of type {kind}."));
            return errors;
        }
    }

    let strings: Vec<&str> = match value {
        Value::String(s) => vec![s.as_str()],
        Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    };

    if let (Some(re), Some(source)) = (pattern, rule.pattern.as_deref()) {
        for s in &strings {
            if !validate_regex_pattern(s, re) {
                errors.push(format!(
                    "Parameter '{field}' value '{s}' does not match pattern '{source}'."
                ));
            }
        }
    }

    match value {
        Value::Number(_) => {
            let n = value.as_f64().unwrap_or_default();
            if let Some(min) = rule.min {
                if n < min {
                    errors.push(format!("Parameter '{field}' must be at least {min}."));
                }
            }
            if let Some(max) = rule.max {
                if n > max {
                    errors.push(format!("Parameter '{field}' must be at most {max}."));
                }
            }
        }
        Value::Array(items) => {
            let len = items.len() as f64;
            if let Some(min) = rule.min {
                if len < min {
                    errors.push(format!(
                        "Parameter '{field}' must contain at least {min} items."
                    ));
                }
            }
            if let Some(max) = rule.max {
                if len > max {
                    errors.push(format!(
                        "Parameter '{field}' must contain at most {max} items."
                    ));
                }
            }
        }
        _ => {}
    }

    if let Some(allowed) = &rule.allowed {
        let candidates: Vec<String> = if strings.is_empty() {
            vec![value_to_string(value)]
        } else {
            strings.iter().map(|s| s.to_string()).collect()
        };
        for candidate in candidates {
            if !validate_enum(&candidate, allowed) {
                errors.push(format!(
                    "Parameter '{field}' value '{candidate}' is not one of: {}.",
                    allowed.join(", ")
                ));
            }
        }
    }

    errors
}

pub fn validate_regex_pattern(value: &str, pattern: &Regex) -> bool {
    pattern.is_match(value)
}

pub fn validate_range(value: f64, min: f64, max: f64) -> bool {
    value >= min && value <= max
}

pub fn validate_enum(value: &str, allowed: &[String]) -> bool {
    allowed.iter().any(|a| a == value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geneflow_types::validation::ValueKind;
    use serde_json::json;

    #[test]
    fn test_broad_search_missing_parameters() {
        let err = broad_search_error("getResearchAssociations", &Value::Null).unwrap();
        assert!(err.contains("Missing parameters object"), "got: {err}");
        assert!(err.contains("getResearchAssociations"));

        let err = broad_search_error("getResearchAssociations", &json!("genes")).unwrap();
        assert!(err.contains("Missing parameters object"), "got: {err}");
    }

    #[test]
    fn test_broad_search_empty_object() {
        assert_eq!(
            broad_search_error("e", &json!({})).as_deref(),
            Some(EMPTY_PARAMETERS_MESSAGE)
        );
    }

    #[test]
    fn test_broad_search_all_empty_values() {
        for params in [
            json!({"gene_ids": []}),
            json!({"gene_ids": null, "trait": ""}),
            json!({"a": "", "b": [], "c": null}),
        ] {
            assert_eq!(
                broad_search_error("e", &params).as_deref(),
                Some(NO_MEANINGFUL_PARAMETER_MESSAGE),
                "params: {params}"
            );
        }
    }

    #[test]
    fn test_broad_search_meaningful_values_pass() {
        for params in [
            json!({"gene_ids": ["COMT"]}),
            json!({"gene_ids": [], "limit": 0}),
            json!({"include_reviews": false}),
            json!({"trait": "anxiety", "x": null}),
        ] {
            assert!(broad_search_error("e", &params).is_none(), "params: {params}");
        }
    }

    #[test]
    fn test_required_field() {
        let rule = ValidationRule {
            required: true,
            ..Default::default()
        };
        assert_eq!(
            validate_field("condition", None, &rule, None),
            vec!["Missing required parameter 'condition'."]
        );
        assert_eq!(validate_field("condition", Some(&json!(null)), &rule, None).len(), 1);
        assert!(validate_field("condition", Some(&json!("x")), &rule, None).is_empty());

        let optional = ValidationRule::default();
        assert!(validate_field("condition", None, &optional, None).is_empty());
    }

    #[test]
    fn test_type_mismatch_short_circuits() {
        let rule = ValidationRule {
            value_type: Some(ValueKind::Number),
            min: Some(1.0),
            ..Default::default()
        };
        let errors = validate_field("limit", Some(&json!("ten")), &rule, None);
        assert_eq!(errors, vec!["Parameter 'limit' must be of type number."]);
    }

    #[test]
    fn test_pattern_on_string_and_array() {
        let re = Regex::new("^[A-Z0-9]+$").unwrap();
        let rule = ValidationRule {
            pattern: Some("^[A-Z0-9]+$".to_string()),
            ..Default::default()
        };
        assert!(validate_field("gene_ids", Some(&json!(["COMT", "1312"])), &rule, Some(&re)).is_empty());
        let errors = validate_field("gene_ids", Some(&json!(["COMT", "bad-id"])), &rule, Some(&re));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("'bad-id'"), "got: {errors:?}");
    }

    #[test]
    fn test_numeric_range_and_array_length() {
        let rule = ValidationRule {
            min: Some(1.0),
            max: Some(100.0),
            ..Default::default()
        };
        assert!(validate_field("limit", Some(&json!(50)), &rule, None).is_empty());
        assert_eq!(
            validate_field("limit", Some(&json!(0)), &rule, None),
            vec!["Parameter 'limit' must be at least 1."]
        );
        assert_eq!(
            validate_field("limit", Some(&json!(101)), &rule, None),
            vec!["Parameter 'limit' must be at most 100."]
        );
        assert_eq!(
            validate_field("ids", Some(&json!([])), &rule, None),
            vec!["Parameter 'ids' must contain at least 1 items."]
        );
    }

    #[test]
    fn test_enum_membership() {
        let rule = ValidationRule {
            allowed: Some(vec!["high".into(), "medium".into(), "low".into()]),
            ..Default::default()
        };
        assert!(validate_field("confidence", Some(&json!("high")), &rule, None).is_empty());
        let errors = validate_field("confidence_level", Some(&json!("invalid_level")), &rule, None);
        assert_eq!(
            errors,
            vec!["Parameter 'confidence_level' value 'invalid_level' is not one of: high, medium, low."]
        );
    }

    #[test]
    fn test_range_helper() {
        assert!(validate_range(5.0, 1.0, 10.0));
        assert!(!validate_range(11.0, 1.0, 10.0));
    }
}
