//! SQLite data source: named, parameterised queries over a `sqlx` pool.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value, json};
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, Sqlite, TypeInfo, ValueRef};

use geneflow_core::datasource::{DataSource, DataSourceError};

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

/// `{type: "database", ...}` configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSourceConfig {
    /// SQLite URL, e.g. `sqlite://data/genes.db` or `sqlite::memory:`.
    pub connection_string: String,
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout: u64,
    #[serde(default = "default_query_timeout")]
    pub query_timeout: u64,
    #[serde(default)]
    pub queries: BTreeMap<String, NamedQuery>,
    /// Allow the `query` operation to run `params.sql` (or `params.query`)
    /// directly.
    #[serde(default)]
    pub allow_raw_queries: bool,
}

fn default_connection_timeout() -> u64 {
    10
}

fn default_query_timeout() -> u64 {
    30
}

/// A configured statement. `params` names the parameters bound to its `?`
/// placeholders, in order.
#[derive(Debug, Clone, Deserialize)]
pub struct NamedQuery {
    pub sql: String,
    #[serde(default)]
    pub params: Vec<String>,
}

pub struct DatabaseDataSource {
    name: String,
    config: DatabaseSourceConfig,
    pool: SqlitePool,
}

impl DatabaseDataSource {
    /// Build the source with a lazily connecting pool.
    ///
    /// In-memory databases get a single, never-recycled connection so every
    /// query sees the same data.
    pub fn new(name: impl Into<String>, config: DatabaseSourceConfig) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(&config.connection_string)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));

        let in_memory = config.connection_string.contains(":memory:")
            || config.connection_string.contains("mode=memory");
        let mut pool_options = SqlitePoolOptions::new()
            .acquire_timeout(Duration::from_secs(config.connection_timeout));
        if in_memory {
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        } else {
            pool_options = pool_options.max_connections(4);
        }
        let pool = pool_options.connect_lazy_with(options);

        Ok(Self {
            name: name.into(),
            config,
            pool,
        })
    }

    /// Statement text and bound values for `operation`.
    fn prepare(&self, operation: &str, params: &Value) -> Result<(String, Vec<Value>), DataSourceError> {
        if let Some(query) = self.config.queries.get(operation) {
            let binds = query
                .params
                .iter()
                .map(|name| params.get(name).cloned().unwrap_or(Value::Null))
                .collect();
            return Ok((query.sql.clone(), binds));
        }

        if operation == "query" && self.config.allow_raw_queries {
            let key = if params.get("sql").is_some() { "sql" } else { "query" };
            let sql = super::required_str(operation, params, key)?;
            let binds = params
                .get("bind")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            return Ok((sql.to_string(), binds));
        }

        Err(DataSourceError::Unsupported {
            source_name: self.name.clone(),
            operation: operation.to_string(),
        })
    }

    async fn run(&self, operation: &str, sql: &str, binds: &[Value]) -> Result<Value, DataSourceError> {
        let mut query = sqlx::query(sql);
        for value in binds {
            query = bind_value(query, value);
        }

        let map_err = |e: sqlx::Error| match e {
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => DataSourceError::Unavailable {
                source_name: self.name.clone(),
                reason: e.to_string(),
            },
            other => DataSourceError::Execution {
                source_name: self.name.clone(),
                operation: operation.to_string(),
                reason: other.to_string(),
            },
        };

        if returns_rows(sql) {
            let rows = query.fetch_all(&self.pool).await.map_err(map_err)?;
            Ok(Value::Array(rows.iter().map(row_to_json).collect()))
        } else {
            let done = query.execute(&self.pool).await.map_err(map_err)?;
            Ok(json!({"rows_affected": done.rows_affected()}))
        }
    }
}

impl DataSource for DatabaseDataSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn source_type(&self) -> &str {
        "database"
    }

    async fn execute(&self, operation: &str, parameters: &Value) -> Result<Value, DataSourceError> {
        let (sql, binds) = self.prepare(operation, parameters)?;
        tracing::debug!(source = %self.name, operation, binds = binds.len(), "running query");

        let secs = self.config.query_timeout;
        tokio::time::timeout(Duration::from_secs(secs), self.run(operation, &sql, &binds))
            .await
            .map_err(|_| DataSourceError::Timeout {
                source_name: self.name.clone(),
                secs,
            })?
    }

    async fn is_available(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    fn connection_info(&self) -> Value {
        json!({
            "type": "database",
            "name": self.name,
            "driver": "sqlite",
            "queries": self.config.queries.keys().collect::<Vec<_>>(),
            "allow_raw_queries": self.config.allow_raw_queries,
        })
    }
}

fn returns_rows(sql: &str) -> bool {
    let head = sql.trim_start().to_ascii_uppercase();
    ["SELECT", "WITH", "PRAGMA", "VALUES"]
        .iter()
        .any(|kw| head.starts_with(kw))
        || head.contains(" RETURNING ")
}

fn bind_value<'q>(query: SqliteQuery<'q>, value: &Value) -> SqliteQuery<'q> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => query.bind(i),
            None => query.bind(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => query.bind(s.clone()),
        other => query.bind(other.to_string()),
    }
}

fn row_to_json(row: &SqliteRow) -> Value {
    let mut object = Map::new();
    for column in row.columns() {
        let i = column.ordinal();
        let value = match row.try_get_raw(i) {
            Ok(raw) if raw.is_null() => Value::Null,
            Ok(raw) => {
                let kind = raw.type_info().name().to_ascii_uppercase();
                match kind.as_str() {
                    "INTEGER" | "INT8" | "BIGINT" => {
                        row.try_get::<i64, _>(i).map(Value::from).unwrap_or(Value::Null)
                    }
                    "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => {
                        row.try_get::<f64, _>(i).map(Value::from).unwrap_or(Value::Null)
                    }
                    "BOOLEAN" => row.try_get::<bool, _>(i).map(Value::from).unwrap_or(Value::Null),
                    "BLOB" => row
                        .try_get::<Vec<u8>, _>(i)
                        .map(|b| Value::String(String::from_utf8_lossy(&b).into_owned()))
                        .unwrap_or(Value::Null),
                    _ => row.try_get::<String, _>(i).map(Value::String).unwrap_or(Value::Null),
                }
            }
            Err(_) => Value::Null,
        };
        object.insert(column.name().to_string(), value);
    }
    Value::Object(object)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn gene_db(extra: Value) -> DatabaseDataSource {
        let mut config = json!({
            "connection_string": "sqlite::memory:",
            "queries": {
                "setup": {"sql": "CREATE TABLE genes (symbol TEXT PRIMARY KEY, entrez INTEGER, score REAL, note TEXT)"},
                "insert_gene": {
                    "sql": "INSERT INTO genes (symbol, entrez, score, note) VALUES (?, ?, ?, ?)",
                    "params": ["symbol", "entrez", "score", "note"]
                },
                "gene_by_symbol": {
                    "sql": "SELECT symbol, entrez, score, note FROM genes WHERE symbol = ?",
                    "params": ["symbol"]
                },
                "all_genes": {"sql": "SELECT symbol FROM genes ORDER BY symbol"}
            }
        });
        if let (Some(base), Some(more)) = (config.as_object_mut(), extra.as_object()) {
            base.extend(more.clone());
        }
        let source = DatabaseDataSource::new("genes_db", serde_json::from_value(config).unwrap()).unwrap();
        source.execute("setup", &json!({})).await.unwrap();
        source
    }

    #[tokio::test]
    async fn test_named_queries() {
        let db = gene_db(json!({})).await;
        let inserted = db
            .execute(
                "insert_gene",
                &json!({"symbol": "COMT", "entrez": 1312, "score": 0.87, "note": null}),
            )
            .await
            .unwrap();
        assert_eq!(inserted, json!({"rows_affected": 1}));
        db.execute("insert_gene", &json!({"symbol": "BDNF", "entrez": 627, "score": 0.5}))
            .await
            .unwrap();

        let rows = db
            .execute("gene_by_symbol", &json!({"symbol": "COMT"}))
            .await
            .unwrap();
        assert_eq!(
            rows,
            json!([{"symbol": "COMT", "entrez": 1312, "score": 0.87, "note": null}])
        );

        let all = db.execute("all_genes", &json!({})).await.unwrap();
        assert_eq!(all, json!([{"symbol": "BDNF"}, {"symbol": "COMT"}]));
    }

    #[tokio::test]
    async fn test_unknown_query_is_unsupported() {
        let db = gene_db(json!({})).await;
        let err = db.execute("drop_everything", &json!({})).await.unwrap_err();
        assert!(matches!(err, DataSourceError::Unsupported { .. }), "got: {err:?}");

        let err = db
            .execute("query", &json!({"sql": "SELECT 1"}))
            .await
            .unwrap_err();
        assert!(matches!(err, DataSourceError::Unsupported { .. }));
    }

    #[tokio::test]
    async fn test_raw_queries_when_allowed() {
        let db = gene_db(json!({"allow_raw_queries": true})).await;
        let rows = db
            .execute("query", &json!({"sql": "SELECT ? + 1 AS n", "bind": [41]}))
            .await
            .unwrap();
        assert_eq!(rows, json!([{"n": 42}]));

        let err = db.execute("query", &json!({})).await.unwrap_err();
        assert!(matches!(err, DataSourceError::InvalidParameters { .. }));
    }

    #[tokio::test]
    async fn test_sql_error_is_execution_error() {
        let db = gene_db(json!({"allow_raw_queries": true})).await;
        let err = db
            .execute("query", &json!({"sql": "SELECT * FROM no_such_table"}))
            .await
            .unwrap_err();
        assert!(matches!(err, DataSourceError::Execution { .. }), "got: {err:?}");
        assert!(db.is_available().await);
    }

    #[test]
    fn test_returns_rows() {
        assert!(returns_rows("  select 1"));
        assert!(returns_rows("WITH x AS (SELECT 1) SELECT * FROM x"));
        assert!(returns_rows("INSERT INTO t VALUES (1) RETURNING id"));
        assert!(!returns_rows("UPDATE t SET a = 1"));
    }
}
