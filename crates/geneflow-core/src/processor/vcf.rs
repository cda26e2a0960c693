//! Variant annotation over VCF-style records.

use serde_json::{Value, json};

use super::{DataProcessor, ProcessorError};

const TYPE: &str = "vcf_annotator";

/// Annotates variants with their zygosity, a stable variant key and the
/// annotation sources, then optionally filters them.
///
/// Input: an array of variant objects, or `{"variants": [...]}`.
/// Config: `{"sources": ["clinvar", ...], "filter": "all" | "het" | "hom_alt" | "non_ref"}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct VcfAnnotationProcessor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Zygosity {
    HomRef,
    Het,
    HomAlt,
    Unknown,
}

impl Zygosity {
    fn from_genotype(genotype: Option<&str>) -> Self {
        let Some(gt) = genotype else {
            return Zygosity::Unknown;
        };
        let alleles: Option<Vec<u32>> = gt
            .split(['/', '|'])
            .map(|a| a.trim().parse::<u32>().ok())
            .collect();
        match alleles.as_deref() {
            Some([a, b]) if a == b && *a == 0 => Zygosity::HomRef,
            Some([a, b]) if a == b => Zygosity::HomAlt,
            Some([_, _]) => Zygosity::Het,
            _ => Zygosity::Unknown,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Zygosity::HomRef => "hom_ref",
            Zygosity::Het => "het",
            Zygosity::HomAlt => "hom_alt",
            Zygosity::Unknown => "unknown",
        }
    }
}

impl VcfAnnotationProcessor {
    fn annotate_variant(
        &self,
        variant: &serde_json::Map<String, Value>,
        sources: &[String],
    ) -> (Value, Zygosity) {
        let zygosity = Zygosity::from_genotype(variant.get("genotype").and_then(Value::as_str));
        let mut annotated = variant.clone();
        annotated.insert(
            "annotations".to_string(),
            json!({
                "sources": sources,
                "variant_key": variant_key(variant),
                "zygosity": zygosity.as_str(),
            }),
        );
        (Value::Object(annotated), zygosity)
    }

    fn keep(&self, criteria: &str, zygosity: Zygosity) -> Result<bool, ProcessorError> {
        Ok(match criteria {
            "all" => true,
            "het" => zygosity == Zygosity::Het,
            "hom_alt" => zygosity == Zygosity::HomAlt,
            "non_ref" => matches!(zygosity, Zygosity::Het | Zygosity::HomAlt),
            other => {
                return Err(ProcessorError::InvalidConfig {
                    processor: TYPE.to_string(),
                    reason: format!("unknown filter '{other}'"),
                });
            }
        })
    }
}

fn variant_key(variant: &serde_json::Map<String, Value>) -> Value {
    let field = |k: &str| variant.get(k).filter(|v| !v.is_null());
    match (
        field("chromosome"),
        field("position"),
        field("ref_allele"),
        field("alt_allele"),
    ) {
        (Some(chr), Some(pos), Some(r), Some(a)) => Value::String(format!(
            "{}:{}:{}>{}",
            crate::value::value_to_string(chr),
            crate::value::value_to_string(pos),
            crate::value::value_to_string(r),
            crate::value::value_to_string(a),
        )),
        _ => field("variant_id").cloned().unwrap_or(Value::Null),
    }
}

impl DataProcessor for VcfAnnotationProcessor {
    fn processor_type(&self) -> &str {
        TYPE
    }

    fn process(&self, input: &Value, config: &Value) -> Result<Value, ProcessorError> {
        let invalid = |reason: String| ProcessorError::InvalidInput {
            processor: TYPE.to_string(),
            reason,
        };

        let variants = input
            .as_array()
            .or_else(|| input.get("variants").and_then(Value::as_array))
            .ok_or_else(|| {
                invalid("expected an array of variants or an object with 'variants'".to_string())
            })?;

        let sources: Vec<String> = config
            .get("sources")
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(Value::as_str).map(String::from).collect())
            .unwrap_or_default();
        let criteria = config.get("filter").and_then(Value::as_str).unwrap_or("all");

        let mut out = Vec::with_capacity(variants.len());
        for (i, variant) in variants.iter().enumerate() {
            let obj = variant
                .as_object()
                .ok_or_else(|| invalid(format!("variant at index {i} is not an object")))?;
            let (annotated, zygosity) = self.annotate_variant(obj, &sources);
            if self.keep(criteria, zygosity)? {
                out.push(annotated);
            }
        }
        Ok(Value::Array(out))
    }
}
