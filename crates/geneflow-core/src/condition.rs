//! Guard conditions: `path OP literal` or `path exists`.
//!
//! OP is one of `==`, `!=`, `>`, `<`, `>=`, `<=`. Literals are quoted
//! strings, numbers, `true`, `false`, `null`, or a bare word (read as a
//! string). Paths use the dotted syntax of [`crate::value::parse_path`].

use serde_json::Value;

/// Errors from parsing or evaluating a condition.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConditionError {
    #[error("malformed condition '{condition}': {reason}")]
    Malformed { condition: String, reason: String },

    #[error("unresolved variable '{0}'")]
    Unresolved(String),
}

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
}

impl CompareOp {
    /// Two-character operators first so `>=` is not read as `>`.
    const TOKENS: [(&'static str, CompareOp); 6] = [
        (">=", CompareOp::Ge),
        ("<=", CompareOp::Le),
        ("==", CompareOp::Eq),
        ("!=", CompareOp::Ne),
        (">", CompareOp::Gt),
        ("<", CompareOp::Lt),
    ];

    pub fn parse(token: &str) -> Option<CompareOp> {
        Self::TOKENS
            .iter()
            .find(|(t, _)| *t == token)
            .map(|(_, op)| *op)
    }
}

/// A parsed condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Exists(String),
    Compare {
        path: String,
        op: CompareOp,
        literal: Value,
    },
}

/// Parse a condition string.
pub fn parse(condition: &str) -> Result<Condition, ConditionError> {
    let malformed = |reason: &str| ConditionError::Malformed {
        condition: condition.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = condition.trim();
    if trimmed.is_empty() {
        return Err(malformed("empty condition"));
    }

    let Some((index, token, op)) = find_operator(trimmed) else {
        let words: Vec<&str> = trimmed.split_whitespace().collect();
        return match words.as_slice() {
            [path, "exists"] if is_valid_path(path) => Ok(Condition::Exists(path.to_string())),
            [.., "exists"] => Err(malformed("expected a variable before 'exists'")),
            _ => Err(malformed("no operator")),
        };
    };
    let path = trimmed[..index].trim();
    let literal = trimmed[index + token.len()..].trim();

    if !is_valid_path(path) {
        return Err(malformed("expected a variable on the left"));
    }
    if literal.is_empty() {
        return Err(malformed("expected a literal on the right"));
    }

    Ok(Condition::Compare {
        path: path.to_string(),
        op,
        literal: parse_literal(literal).map_err(|r| malformed(&r))?,
    })
}

fn find_operator(s: &str) -> Option<(usize, &'static str, CompareOp)> {
    for (i, _) in s.char_indices() {
        for (token, op) in CompareOp::TOKENS {
            if s[i..].starts_with(token) {
                return Some((i, token, op));
            }
        }
    }
    None
}

fn is_valid_path(path: &str) -> bool {
    !path.is_empty()
        && path
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '[' | ']' | '*'))
        && crate::value::parse_path(path).is_ok()
}

fn parse_literal(literal: &str) -> Result<Value, String> {
    for quote in ['"', '\''] {
        if let Some(inner) = literal.strip_prefix(quote) {
            return inner
                .strip_suffix(quote)
                .map(|s| Value::String(s.to_string()))
                .ok_or_else(|| "unterminated string literal".to_string());
        }
    }
    match literal {
        "true" => return Ok(Value::Bool(true)),
        "false" => return Ok(Value::Bool(false)),
        "null" => return Ok(Value::Null),
        _ => {}
    }
    if let Ok(i) = literal.parse::<i64>() {
        return Ok(Value::from(i));
    }
    if let Ok(f) = literal.parse::<f64>() {
        if let Some(n) = serde_json::Number::from_f64(f) {
            return Ok(Value::Number(n));
        }
    }
    if literal.chars().any(char::is_whitespace) {
        return Err("bare literal must be a single word".to_string());
    }
    Ok(Value::String(literal.to_string()))
}

impl Condition {
    /// Evaluate against a variable resolver.
    ///
    /// `exists` is false for missing and null values. Comparisons against a
    /// missing variable are an [`ConditionError::Unresolved`] error.
    pub fn evaluate<F>(&self, resolve: F) -> Result<bool, ConditionError>
    where
        F: Fn(&str) -> Option<Value>,
    {
        match self {
            Condition::Exists(path) => Ok(resolve(path).is_some_and(|v| !v.is_null())),
            Condition::Compare { path, op, literal } => {
                let left = resolve(path).ok_or_else(|| ConditionError::Unresolved(path.clone()))?;
                Ok(compare(*op, &left, literal))
            }
        }
    }
}

/// Parse and evaluate in one go.
pub fn evaluate<F>(condition: &str, resolve: F) -> Result<bool, ConditionError>
where
    F: Fn(&str) -> Option<Value>,
{
    parse(condition)?.evaluate(resolve)
}

/// Compare two values. Numbers compare numerically, strings lexically;
/// ordering between mismatched types is always false.
pub fn compare(op: CompareOp, left: &Value, right: &Value) -> bool {
    match op {
        CompareOp::Eq => values_equal(left, right),
        CompareOp::Ne => !values_equal(left, right),
        _ => {
            let ordering = match (left, right) {
                (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
                    (Some(a), Some(b)) => a.partial_cmp(&b),
                    _ => None,
                },
                (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                _ => None,
            };
            let Some(ordering) = ordering else {
                return false;
            };
            match op {
                CompareOp::Gt => ordering.is_gt(),
                CompareOp::Lt => ordering.is_lt(),
                CompareOp::Ge => ordering.is_ge(),
                CompareOp::Le => ordering.is_le(),
                CompareOp::Eq | CompareOp::Ne => false,
            }
        }
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars(v: Value) -> impl Fn(&str) -> Option<Value> {
        move |path: &str| crate::value::lookup_path(&v, path).cloned()
    }

    #[test]
    fn test_parse_compare() {
        let c = parse("analysis_depth == 'research'").unwrap();
        assert_eq!(
            c,
            Condition::Compare {
                path: "analysis_depth".into(),
                op: CompareOp::Eq,
                literal: json!("research"),
            }
        );
        let c = parse("gene_count>=5").unwrap();
        assert!(matches!(c, Condition::Compare { op: CompareOp::Ge, .. }));
    }

    #[test]
    fn test_parse_exists() {
        assert_eq!(
            parse("patient_variants exists").unwrap(),
            Condition::Exists("patient_variants".into())
        );
    }

    #[test]
    fn test_parse_malformed() {
        for bad in ["", "   ", "a = 1", "== 1", "a ==", "a b c", "a == 'open", "exists"] {
            let err = parse(bad).unwrap_err();
            assert!(
                matches!(err, ConditionError::Malformed { .. }),
                "expected malformed for {bad:?}, got: {err:?}"
            );
        }
    }

    #[test]
    fn test_evaluate_numeric_and_string() {
        let ctx = vars(json!({"gene_count": 7, "depth": "research", "score": 0.5}));
        assert!(evaluate("gene_count > 5", &ctx).unwrap());
        assert!(!evaluate("gene_count < 5", &ctx).unwrap());
        assert!(evaluate("gene_count == 7.0", &ctx).unwrap());
        assert!(evaluate("depth == research", &ctx).unwrap());
        assert!(evaluate("depth != \"basic\"", &ctx).unwrap());
        assert!(evaluate("score <= 0.5", &ctx).unwrap());
    }

    #[test]
    fn test_evaluate_mixed_types_compare_false() {
        let ctx = vars(json!({"depth": "research"}));
        assert!(!evaluate("depth > 3", &ctx).unwrap());
        assert!(!evaluate("depth < 3", &ctx).unwrap());
    }

    #[test]
    fn test_evaluate_exists() {
        let ctx = vars(json!({"a": {"b": 1}, "n": null}));
        assert!(evaluate("a.b exists", &ctx).unwrap());
        assert!(!evaluate("a.c exists", &ctx).unwrap());
        assert!(!evaluate("n exists", &ctx).unwrap());
    }

    #[test]
    fn test_evaluate_unresolved() {
        let ctx = vars(json!({}));
        let err = evaluate("missing == 1", &ctx).unwrap_err();
        assert_eq!(err, ConditionError::Unresolved("missing".into()));
    }

    #[test]
    fn test_compare_null_and_bool() {
        assert!(compare(CompareOp::Eq, &json!(null), &json!(null)));
        assert!(compare(CompareOp::Ne, &json!(true), &json!(false)));
        assert!(!compare(CompareOp::Gt, &json!(true), &json!(false)));
    }
}
