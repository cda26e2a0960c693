//! REST API data source backed by `reqwest`.
//!
//! Each `execute(op, params)` becomes one HTTP request:
//! - method from `params.method` (default GET)
//! - path from `params.endpoint` (default: the operation name)
//! - GET: `params.query`, or the remaining scalar params, as the query string
//! - other methods: `params.body`, or the remaining params, as a JSON body
//!
//! Transport errors and 5xx responses are retried up to `max_retries` times
//! with exponential backoff. An optional rate limit spaces dispatches.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::Method;
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tokio::time::Instant;

use geneflow_core::config::ConfigError;
use geneflow_core::datasource::{DataSource, DataSourceError};
use geneflow_core::value::value_to_string;

const CONTROL_KEYS: [&str; 4] = ["method", "endpoint", "query", "body"];
const BASE_BACKOFF_MS: u64 = 200;
const MAX_BACKOFF_MS: u64 = 5_000;

/// `{type: "rest_api", ...}` configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RestApiSourceConfig {
    pub base_url: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default)]
    pub rate_limit_per_second: Option<f64>,
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

impl RestApiSourceConfig {
    /// Minimum spacing between dispatches; `None` when rate limiting is off.
    /// A rate whose interval does not fit in a `Duration` is rejected.
    pub fn min_interval(&self) -> Result<Option<Duration>, String> {
        let Some(rate) = self.rate_limit_per_second.filter(|r| *r > 0.0) else {
            return Ok(None);
        };
        Duration::try_from_secs_f64(1.0 / rate)
            .map(Some)
            .map_err(|e| format!("rate_limit_per_second {rate} is out of range: {e}"))
    }
}

pub struct RestApiDataSource {
    name: String,
    config: RestApiSourceConfig,
    client: reqwest::Client,
    min_interval: Option<Duration>,
    /// Time of the previous dispatch, for rate limiting.
    last_request: Mutex<Option<Instant>>,
}

impl RestApiDataSource {
    pub fn new(
        name: impl Into<String>,
        config: RestApiSourceConfig,
        user_agent: &str,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        let invalid = |reason: String| ConfigError::InvalidSource {
            name: name.clone(),
            reason,
        };
        let min_interval = config.min_interval().map_err(invalid)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(user_agent)
            .build()
            .map_err(|e| invalid(e.to_string()))?;
        Ok(Self {
            name,
            config,
            client,
            min_interval,
            last_request: Mutex::new(None),
        })
    }

    fn url_for(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            return endpoint.to_string();
        }
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    /// Wait until the configured minimum interval since the last dispatch
    /// has passed. Concurrent callers queue on the mutex.
    async fn throttle(&self) {
        let Some(interval) = self.min_interval else {
            return;
        };
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < interval {
                tokio::time::sleep(interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    fn build_request(&self, method: &Method, url: &str, params: &Value) -> reqwest::RequestBuilder {
        let mut request = self.client.request(method.clone(), url);
        for (key, value) in &self.config.headers {
            request = request.header(key.as_str(), value.as_str());
        }
        if let Some(token) = self.config.auth_token.as_deref().filter(|t| !t.is_empty()) {
            request = request.bearer_auth(token);
        }
        if *method == Method::GET {
            request.query(&query_pairs(params))
        } else {
            request.json(&request_body(params))
        }
    }

    async fn read_response(
        &self,
        operation: &str,
        response: reqwest::Response,
    ) -> Result<Value, DataSourceError> {
        let status = response.status();
        let text = response.text().await.map_err(|e| self.execution(operation, e))?;
        if !status.is_success() {
            return Err(self.execution(operation, format!("HTTP {status}: {}", truncate(&text, 200))));
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }

    fn execution(&self, operation: &str, reason: impl ToString) -> DataSourceError {
        DataSourceError::Execution {
            source_name: self.name.clone(),
            operation: operation.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl DataSource for RestApiDataSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn source_type(&self) -> &str {
        "rest_api"
    }

    async fn execute(&self, operation: &str, parameters: &Value) -> Result<Value, DataSourceError> {
        let method_name = parameters
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or("GET")
            .to_ascii_uppercase();
        let method = Method::from_bytes(method_name.as_bytes()).map_err(|_| {
            DataSourceError::InvalidParameters {
                operation: operation.to_string(),
                reason: format!("invalid HTTP method '{method_name}'"),
            }
        })?;
        let endpoint = parameters
            .get("endpoint")
            .and_then(Value::as_str)
            .unwrap_or(operation);
        let url = self.url_for(endpoint);

        let mut attempt = 0;
        loop {
            self.throttle().await;
            tracing::debug!(source = %self.name, %method, url = %url, attempt, "dispatching request");

            let failure = match self.build_request(&method, &url, parameters).send().await {
                Ok(response) if response.status().is_server_error() => {
                    if attempt >= self.config.max_retries {
                        return self.read_response(operation, response).await;
                    }
                    format!("HTTP {}", response.status())
                }
                Ok(response) => return self.read_response(operation, response).await,
                Err(e) if attempt >= self.config.max_retries => {
                    return Err(if e.is_timeout() {
                        DataSourceError::Timeout {
                            source_name: self.name.clone(),
                            secs: self.config.timeout_seconds,
                        }
                    } else if e.is_connect() {
                        DataSourceError::Unavailable {
                            source_name: self.name.clone(),
                            reason: e.to_string(),
                        }
                    } else {
                        self.execution(operation, e)
                    });
                }
                Err(e) => e.to_string(),
            };

            attempt += 1;
            let delay = backoff(attempt);
            tracing::warn!(
                source = %self.name,
                operation,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %failure,
                "request failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn is_available(&self) -> bool {
        self.client
            .head(&self.config.base_url)
            .send()
            .await
            .is_ok()
    }

    async fn health_check(&self) -> bool {
        match self.client.get(&self.config.base_url).send().await {
            Ok(response) => !response.status().is_server_error(),
            Err(_) => false,
        }
    }

    fn connection_info(&self) -> Value {
        serde_json::json!({
            "type": "rest_api",
            "name": self.name,
            "base_url": self.config.base_url,
            "timeout_seconds": self.config.timeout_seconds,
            "max_retries": self.config.max_retries,
            "rate_limit_per_second": self.config.rate_limit_per_second,
            "authenticated": self.config.auth_token.is_some(),
        })
    }
}

fn backoff(attempt: u32) -> Duration {
    let ms = BASE_BACKOFF_MS.saturating_mul(1 << attempt.saturating_sub(1).min(10));
    Duration::from_millis(ms.min(MAX_BACKOFF_MS))
}

/// Query string for a GET: `params.query` when it is an object, else every
/// non-control scalar parameter. Arrays of scalars are comma-joined.
fn query_pairs(params: &Value) -> Vec<(String, String)> {
    let (source, skip_control) = match params.get("query").and_then(Value::as_object) {
        Some(query) => (query, false),
        None => match params.as_object() {
            Some(map) => (map, true),
            None => return Vec::new(),
        },
    };
    source
        .iter()
        .filter(|(k, _)| !(skip_control && CONTROL_KEYS.contains(&k.as_str())))
        .filter_map(|(k, v)| {
            let rendered = match v {
                Value::Null | Value::Object(_) => return None,
                Value::Array(items) => {
                    if items.iter().any(|i| i.is_array() || i.is_object()) {
                        return None;
                    }
                    items.iter().map(value_to_string).collect::<Vec<_>>().join(",")
                }
                scalar => value_to_string(scalar),
            };
            Some((k.clone(), rendered))
        })
        .collect()
}

/// JSON body for non-GET methods: `params.body`, else the non-control params.
fn request_body(params: &Value) -> Value {
    if let Some(body) = params.get("body") {
        return body.clone();
    }
    match params.as_object() {
        Some(map) => Value::Object(
            map.iter()
                .filter(|(k, _)| !CONTROL_KEYS.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<Map<_, _>>(),
        ),
        None => params.clone(),
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}
