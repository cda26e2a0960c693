//! Parameter templates and validation rules, declared per endpoint.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// How an endpoint's caller-supplied parameters are normalised.
///
/// ```yaml
/// getMentalHealthGenes:
///   parameters:
///     limit: "${CONFIG:default_limit|50}"
///   aliases:
///     genes: gene_ids
///   value_aliases:
///     confidence:
///       strong: high
///       weak: low
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParameterTemplate {
    /// Default values for missing parameters; strings may be templates.
    #[serde(default)]
    pub parameters: BTreeMap<String, serde_json::Value>,
    /// Parameter name aliases: alias name -> canonical name.
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
    /// Value aliases per parameter: alias value -> canonical value.
    #[serde(default)]
    pub value_aliases: BTreeMap<String, BTreeMap<String, String>>,
}

/// Constraints on a single parameter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationRule {
    #[serde(default)]
    pub required: bool,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<ValueKind>,
    /// Regex every string value (or array element) must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Lower bound for numbers, or minimum length for arrays.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Upper bound for numbers, or maximum length for arrays.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Allowed string values (enum membership).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<String>>,
}

/// Expected JSON type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
}

impl ValueKind {
    pub fn matches(self, value: &serde_json::Value) -> bool {
        match self {
            ValueKind::String => value.is_string(),
            ValueKind::Number => value.is_number(),
            ValueKind::Integer => value.is_i64() || value.is_u64(),
            ValueKind::Boolean => value.is_boolean(),
            ValueKind::Array => value.is_array(),
            ValueKind::Object => value.is_object(),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValueKind::String => "string",
            ValueKind::Number => "number",
            ValueKind::Integer => "integer",
            ValueKind::Boolean => "boolean",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rule_from_json() {
        let rule: ValidationRule = serde_json::from_value(json!({
            "required": true,
            "type": "string",
            "allowed": ["high", "medium", "low"]
        }))
        .unwrap();
        assert!(rule.required);
        assert_eq!(rule.value_type, Some(ValueKind::String));
        assert_eq!(rule.allowed.unwrap().len(), 3);
        assert!(rule.pattern.is_none());
    }

    #[test]
    fn test_value_kind_matches() {
        assert!(ValueKind::Integer.matches(&json!(3)));
        assert!(!ValueKind::Integer.matches(&json!(3.5)));
        assert!(ValueKind::Number.matches(&json!(3.5)));
        assert!(ValueKind::Array.matches(&json!([])));
        assert!(!ValueKind::String.matches(&json!(null)));
    }

    #[test]
    fn test_template_defaults_empty() {
        let t: ParameterTemplate = serde_json::from_value(json!({})).unwrap();
        assert!(t.parameters.is_empty());
        assert!(t.aliases.is_empty());
        assert!(t.value_aliases.is_empty());
    }
}
