//! Expression data normalisation with a quality-control pass.

use serde_json::{Map, Value, json};

use super::{DataProcessor, ProcessorError};

const TYPE: &str = "expression_normalizer";

/// Normalises per-gene expression values.
///
/// Input: `[{"gene": "COMT", "value": 12.5}, ...]` or `{"COMT": 12.5, ...}`.
/// Config: `{"method": "zscore" | "minmax" | "log2" | "none",
///           "filters": {"min_value": 1.0, "max_missing": 0.2}}`.
///
/// Quality control drops entries with a non-numeric value or a value below
/// `min_value`. When the share of non-numeric entries exceeds `max_missing`
/// the whole input is rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpressionNormalizerProcessor;

struct Entry {
    gene: String,
    raw: Option<f64>,
    fields: Map<String, Value>,
}

fn invalid_input(reason: impl Into<String>) -> ProcessorError {
    ProcessorError::InvalidInput {
        processor: TYPE.to_string(),
        reason: reason.into(),
    }
}

fn invalid_config(reason: impl Into<String>) -> ProcessorError {
    ProcessorError::InvalidConfig {
        processor: TYPE.to_string(),
        reason: reason.into(),
    }
}

impl ExpressionNormalizerProcessor {
    fn entries(&self, input: &Value) -> Result<(Vec<Entry>, bool), ProcessorError> {
        match input {
            Value::Array(items) => {
                let mut entries = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    let obj = item
                        .as_object()
                        .ok_or_else(|| invalid_input(format!("entry {i} is not an object")))?;
                    let gene = obj
                        .get("gene")
                        .and_then(Value::as_str)
                        .ok_or_else(|| invalid_input(format!("entry {i} has no 'gene'")))?;
                    entries.push(Entry {
                        gene: gene.to_string(),
                        raw: obj.get("value").and_then(Value::as_f64),
                        fields: obj.clone(),
                    });
                }
                Ok((entries, true))
            }
            Value::Object(map) => Ok((
                map.iter()
                    .map(|(gene, v)| Entry {
                        gene: gene.clone(),
                        raw: v.as_f64(),
                        fields: Map::new(),
                    })
                    .collect(),
                false,
            )),
            _ => Err(invalid_input("expected an array or a gene -> value object")),
        }
    }

    fn quality_control(&self, entries: Vec<Entry>, filters: &Value) -> Result<Vec<Entry>, ProcessorError> {
        let total = entries.len();
        let missing = entries.iter().filter(|e| e.raw.is_none()).count();
        if let Some(max_missing) = filters.get("max_missing").and_then(Value::as_f64) {
            if total > 0 && (missing as f64 / total as f64) > max_missing {
                return Err(invalid_input(format!(
                    "too many missing values: {missing} of {total}"
                )));
            }
        }
        let min_value = filters.get("min_value").and_then(Value::as_f64);
        Ok(entries
            .into_iter()
            .filter(|e| match (e.raw, min_value) {
                (None, _) => false,
                (Some(v), Some(min)) => v >= min,
                (Some(_), None) => true,
            })
            .collect())
    }

    fn normalize(&self, values: &[f64], method: &str) -> Result<Vec<f64>, ProcessorError> {
        match method {
            "none" => Ok(values.to_vec()),
            "log2" => values
                .iter()
                .map(|v| {
                    if *v <= -1.0 {
                        Err(invalid_input(format!("cannot log2-transform {v}")))
                    } else {
                        Ok((v + 1.0).log2())
                    }
                })
                .collect(),
            "zscore" => {
                if values.is_empty() {
                    return Ok(Vec::new());
                }
                let n = values.len() as f64;
                let mean = values.iter().sum::<f64>() / n;
                let sd = (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
                Ok(values
                    .iter()
                    .map(|v| if sd == 0.0 { 0.0 } else { (v - mean) / sd })
                    .collect())
            }
            "minmax" => {
                let min = values.iter().copied().fold(f64::INFINITY, f64::min);
                let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let range = max - min;
                Ok(values
                    .iter()
                    .map(|v| if range == 0.0 { 0.0 } else { (v - min) / range })
                    .collect())
            }
            other => Err(invalid_config(format!("unknown method '{other}'"))),
        }
    }
}

impl DataProcessor for ExpressionNormalizerProcessor {
    fn processor_type(&self) -> &str {
        TYPE
    }

    fn process(&self, input: &Value, config: &Value) -> Result<Value, ProcessorError> {
        let method = config.get("method").and_then(Value::as_str).unwrap_or("zscore");
        let filters = config.get("filters").cloned().unwrap_or(Value::Null);

        let (entries, as_array) = self.entries(input)?;
        let kept = self.quality_control(entries, &filters)?;
        let raw: Vec<f64> = kept.iter().filter_map(|e| e.raw).collect();
        let normalized = self.normalize(&raw, method)?;

        if as_array {
            Ok(Value::Array(
                kept.into_iter()
                    .zip(normalized)
                    .map(|(mut e, n)| {
                        e.fields.insert("raw_value".to_string(), json!(e.raw));
                        e.fields.insert("value".to_string(), json!(n));
                        Value::Object(e.fields)
                    })
                    .collect(),
            ))
        } else {
            Ok(Value::Object(
                kept.into_iter()
                    .zip(normalized)
                    .map(|(e, n)| (e.gene, json!(n)))
                    .collect(),
            ))
        }
    }
}
