//! File system data source rooted at a base directory.
//!
//! Operations: `read {path}`, `write {path, data}`, `list {pattern?}` and
//! `exists {path}`. Paths are relative to `base_path`; absolute paths and
//! `..` components are rejected.

use std::path::{Component, Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value, json};

use geneflow_core::datasource::{DataSource, DataSourceError};
use geneflow_core::value::value_to_string;

use super::required_str;

/// `{type: "file_system", ...}` configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FileSystemSourceConfig {
    pub base_path: PathBuf,
    #[serde(default = "default_formats")]
    pub supported_formats: Vec<String>,
}

fn default_formats() -> Vec<String> {
    ["json", "csv", "tsv", "txt", "vcf"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

pub struct FileSystemDataSource {
    name: String,
    config: FileSystemSourceConfig,
}

impl FileSystemDataSource {
    pub fn new(name: impl Into<String>, config: FileSystemSourceConfig) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }

    /// Resolve `relative` under the base path and return it with its
    /// (lowercased) format.
    fn resolve(&self, operation: &str, relative: &str) -> Result<(PathBuf, String), DataSourceError> {
        let invalid = |reason: String| DataSourceError::InvalidParameters {
            operation: operation.to_string(),
            reason,
        };

        let path = Path::new(relative);
        let escapes = path
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if relative.is_empty() || escapes {
            return Err(invalid(format!("path '{relative}' is outside the base directory")));
        }

        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if !self.config.supported_formats.contains(&format) {
            return Err(invalid(format!("unsupported file format '{format}'")));
        }

        Ok((self.config.base_path.join(path), format))
    }

    fn execution(&self, operation: &str, reason: impl ToString) -> DataSourceError {
        DataSourceError::Execution {
            source_name: self.name.clone(),
            operation: operation.to_string(),
            reason: reason.to_string(),
        }
    }

    async fn read(&self, params: &Value) -> Result<Value, DataSourceError> {
        let relative = required_str("read", params, "path")?;
        let (path, format) = self.resolve("read", relative)?;
        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| self.execution("read", format!("{relative}: {e}")))?;

        match format.as_str() {
            "json" => serde_json::from_str(&text)
                .map_err(|e| self.execution("read", format!("{relative}: invalid JSON: {e}"))),
            "csv" => Ok(parse_delimited(&text, ',')),
            "tsv" => Ok(parse_delimited(&text, '\t')),
            "vcf" => Ok(parse_vcf(&text)),
            _ => Ok(Value::String(text)),
        }
    }

    async fn write(&self, params: &Value) -> Result<Value, DataSourceError> {
        let relative = required_str("write", params, "path")?;
        let (path, format) = self.resolve("write", relative)?;
        let data = params.get("data").unwrap_or(&Value::Null);

        let contents = match format.as_str() {
            "json" => serde_json::to_string_pretty(data)
                .map_err(|e| self.execution("write", e))?,
            "csv" => render_delimited(data, ','),
            "tsv" => render_delimited(data, '\t'),
            _ => value_to_string(data),
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.execution("write", e))?;
        }
        tokio::fs::write(&path, contents.as_bytes())
            .await
            .map_err(|e| self.execution("write", format!("{relative}: {e}")))?;

        tracing::debug!(source = %self.name, path = relative, bytes = contents.len(), "file written");
        Ok(json!({"path": relative, "bytes_written": contents.len()}))
    }

    async fn list(&self, params: &Value) -> Result<Value, DataSourceError> {
        let pattern = params.get("pattern").and_then(Value::as_str);
        let mut entries = tokio::fs::read_dir(&self.config.base_path)
            .await
            .map_err(|e| self.execution("list", e))?;

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| self.execution("list", e))?
        {
            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if is_file && pattern.is_none_or(|p| matches_pattern(&name, p)) {
                names.push(name);
            }
        }
        names.sort();
        Ok(json!(names))
    }

    async fn exists(&self, params: &Value) -> Result<Value, DataSourceError> {
        let relative = required_str("exists", params, "path")?;
        let (path, _) = self.resolve("exists", relative)?;
        Ok(Value::Bool(tokio::fs::try_exists(&path).await.unwrap_or(false)))
    }
}

impl DataSource for FileSystemDataSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn source_type(&self) -> &str {
        "file_system"
    }

    async fn execute(&self, operation: &str, parameters: &Value) -> Result<Value, DataSourceError> {
        match operation {
            "read" => self.read(parameters).await,
            "write" => self.write(parameters).await,
            "list" => self.list(parameters).await,
            "exists" => self.exists(parameters).await,
            _ => Err(DataSourceError::Unsupported {
                source_name: self.name.clone(),
                operation: operation.to_string(),
            }),
        }
    }

    async fn is_available(&self) -> bool {
        tokio::fs::metadata(&self.config.base_path)
            .await
            .is_ok_and(|m| m.is_dir())
    }

    fn connection_info(&self) -> Value {
        json!({
            "type": "file_system",
            "name": self.name,
            "base_path": self.config.base_path.display().to_string(),
            "supported_formats": self.config.supported_formats,
        })
    }
}

/// `*` matches any run of characters; a pattern without `*` is a suffix.
fn matches_pattern(name: &str, pattern: &str) -> bool {
    if !pattern.contains('*') {
        return name.ends_with(pattern);
    }
    let parts: Vec<&str> = pattern.split('*').collect();
    let (first, last) = (parts[0], parts[parts.len() - 1]);
    let Some(mut remaining) = name.strip_prefix(first) else {
        return false;
    };
    for part in &parts[1..parts.len() - 1] {
        match remaining.find(part) {
            Some(i) => remaining = &remaining[i + part.len()..],
            None => return false,
        }
    }
    remaining.ends_with(last)
}

/// Delimited text with a header row into an array of objects. Numeric
/// cells become numbers; quoted cells may contain the delimiter.
fn parse_delimited(text: &str, delimiter: char) -> Value {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let Some(header) = lines.next() else {
        return json!([]);
    };
    let columns = split_row(header, delimiter);
    let rows = lines
        .map(|line| {
            let cells = split_row(line, delimiter);
            let row: Map<String, Value> = columns
                .iter()
                .enumerate()
                .map(|(i, col)| {
                    let cell = cells.get(i).map(String::as_str).unwrap_or("");
                    (col.clone(), typed_cell(cell))
                })
                .collect();
            Value::Object(row)
        })
        .collect();
    Value::Array(rows)
}

fn split_row(line: &str, delimiter: char) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            c if c == delimiter && !quoted => cells.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    cells.push(current);
    cells.into_iter().map(|c| c.trim().to_string()).collect()
}

fn typed_cell(cell: &str) -> Value {
    if cell.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = cell.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(f) = cell.parse::<f64>() {
        if f.is_finite() {
            return Value::from(f);
        }
    }
    Value::String(cell.to_string())
}

fn render_delimited(data: &Value, delimiter: char) -> String {
    let Some(rows) = data.as_array() else {
        return value_to_string(data);
    };
    let mut columns: Vec<String> = Vec::new();
    for row in rows {
        if let Some(obj) = row.as_object() {
            for key in obj.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }
    }

    let escape = |s: String| {
        if s.contains(delimiter) || s.contains('"') {
            format!("\"{}\"", s.replace('"', "\"\""))
        } else {
            s
        }
    };
    let sep = delimiter.to_string();
    let mut out = columns.iter().cloned().map(escape).collect::<Vec<_>>().join(&sep);
    out.push('\n');
    for row in rows {
        let line = columns
            .iter()
            .map(|c| escape(row.get(c).map(value_to_string).unwrap_or_default()))
            .collect::<Vec<_>>()
            .join(&sep);
        out.push_str(&line);
        out.push('\n');
    }
    out
}

/// VCF body lines into variant objects. Meta lines (`##`) are skipped; the
/// first sample's `GT` becomes `genotype`.
fn parse_vcf(text: &str) -> Value {
    let variants = text
        .lines()
        .filter(|l| !l.starts_with('#') && !l.trim().is_empty())
        .filter_map(|line| {
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 5 {
                return None;
            }
            let dot_null = |s: &str| if s == "." { Value::Null } else { Value::String(s.to_string()) };

            let mut variant = Map::new();
            variant.insert("chromosome".into(), Value::String(fields[0].to_string()));
            variant.insert(
                "position".into(),
                fields[1].parse::<u64>().map(Value::from).unwrap_or(Value::Null),
            );
            variant.insert("variant_id".into(), dot_null(fields[2]));
            variant.insert("ref_allele".into(), Value::String(fields[3].to_string()));
            variant.insert("alt_allele".into(), Value::String(fields[4].to_string()));
            if let Some(qual) = fields.get(5) {
                variant.insert(
                    "quality".into(),
                    qual.parse::<f64>().map(Value::from).unwrap_or(Value::Null),
                );
            }
            if let Some(filter) = fields.get(6) {
                variant.insert("filter".into(), dot_null(*filter));
            }
            if let Some(info) = fields.get(7) {
                variant.insert("info".into(), parse_info(info));
            }
            if let (Some(format), Some(sample)) = (fields.get(8), fields.get(9)) {
                let gt = format
                    .split(':')
                    .position(|k| k == "GT")
                    .and_then(|i| sample.split(':').nth(i));
                if let Some(gt) = gt {
                    variant.insert("genotype".into(), Value::String(gt.to_string()));
                }
            }
            Some(Value::Object(variant))
        })
        .collect();
    Value::Array(variants)
}

fn parse_info(info: &str) -> Value {
    if info == "." {
        return Value::Object(Map::new());
    }
    let map = info
        .split(';')
        .filter(|kv| !kv.is_empty())
        .map(|kv| match kv.split_once('=') {
            Some((k, v)) => (k.to_string(), typed_cell(v)),
            None => (kv.to_string(), Value::Bool(true)),
        })
        .collect();
    Value::Object(map)
}
