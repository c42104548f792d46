//! Storage collaborator used by every handler.
//!
//! Statements travel as [`SqlResult`] values and rows come back as JSON
//! objects keyed by column name, so handlers never touch sqlx types and can
//! be exercised against an in-memory double.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::postgres::{PgArguments, PgRow, PgTypeInfo};
use sqlx::{Column, PgPool, Postgres, Row, TypeInfo};

use super::manager::{DatabaseError, DatabaseManager};
use crate::config;
use crate::filter::SqlResult;

pub type SharedStorage = Arc<dyn Storage>;

#[async_trait]
pub trait Storage: Send + Sync {
    async fn fetch_all(&self, sql: &SqlResult) -> Result<Vec<Value>, DatabaseError>;

    async fn fetch_optional(&self, sql: &SqlResult) -> Result<Option<Value>, DatabaseError>;

    /// Returns the number of affected rows
    async fn execute(&self, sql: &SqlResult) -> Result<u64, DatabaseError>;

    /// Run every statement in one transaction; any failure rolls all back
    async fn execute_all(&self, statements: &[SqlResult]) -> Result<u64, DatabaseError>;

    async fn health_check(&self) -> Result<(), DatabaseError>;
}

/// Postgres-backed storage over the shared pool
#[derive(Debug, Default, Clone)]
pub struct PgStorage;

impl PgStorage {
    pub fn new() -> Self {
        Self
    }

    pub fn shared() -> SharedStorage {
        Arc::new(Self::new())
    }

    async fn pool(&self) -> Result<PgPool, DatabaseError> {
        DatabaseManager::pool().await
    }
}

#[async_trait]
impl Storage for PgStorage {
    async fn fetch_all(&self, sql: &SqlResult) -> Result<Vec<Value>, DatabaseError> {
        let pool = self.pool().await?;
        let timer = QueryTimer::start(sql);
        let rows = bind_all(sqlx::query(&sql.query), &sql.params).fetch_all(&pool).await?;
        timer.finish();

        rows.iter().map(row_to_json).collect()
    }

    async fn fetch_optional(&self, sql: &SqlResult) -> Result<Option<Value>, DatabaseError> {
        let pool = self.pool().await?;
        let timer = QueryTimer::start(sql);
        let row = bind_all(sqlx::query(&sql.query), &sql.params).fetch_optional(&pool).await?;
        timer.finish();

        row.as_ref().map(row_to_json).transpose()
    }

    async fn execute(&self, sql: &SqlResult) -> Result<u64, DatabaseError> {
        let pool = self.pool().await?;
        let timer = QueryTimer::start(sql);
        let result = bind_all(sqlx::query(&sql.query), &sql.params).execute(&pool).await?;
        timer.finish();

        Ok(result.rows_affected())
    }

    async fn execute_all(&self, statements: &[SqlResult]) -> Result<u64, DatabaseError> {
        let pool = self.pool().await?;
        let mut tx = pool.begin().await?;
        let mut affected = 0;

        for sql in statements {
            let timer = QueryTimer::start(sql);
            let result = bind_all(sqlx::query(&sql.query), &sql.params).execute(&mut *tx).await?;
            timer.finish();
            affected += result.rows_affected();
        }

        tx.commit().await?;
        Ok(affected)
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check().await
    }
}

type PgQuery<'q> = sqlx::query::Query<'q, Postgres, PgArguments>;

fn bind_all<'q>(mut q: PgQuery<'q>, params: &'q [Value]) -> PgQuery<'q> {
    for p in params {
        q = bind_param(q, p);
    }
    q
}

fn bind_param<'q>(q: PgQuery<'q>, v: &'q Value) -> PgQuery<'q> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s.as_str()),
        Value::Array(items) => {
            // Homogeneous integer arrays bind as int8[], everything else as text[]
            let ints: Option<Vec<i64>> = items.iter().map(Value::as_i64).collect();
            match ints {
                Some(ints) if !items.is_empty() => q.bind(ints),
                _ => {
                    let texts: Vec<String> = items
                        .iter()
                        .map(|item| match item {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        })
                        .collect();
                    q.bind(texts)
                }
            }
        }
        Value::Object(_) => q.bind(sqlx::types::Json(v)),
    }
}

/// Convert a result row into a JSON object keyed by column name
fn row_to_json(row: &PgRow) -> Result<Value, DatabaseError> {
    let mut record = Map::new();

    for (i, column) in row.columns().iter().enumerate() {
        let value = extract_column_value(row, i, column.type_info())?;
        record.insert(column.name().to_string(), value);
    }

    Ok(Value::Object(record))
}

/// Extract typed value from database column
fn extract_column_value(row: &PgRow, index: usize, type_info: &PgTypeInfo) -> Result<Value, DatabaseError> {
    let type_name = type_info.name();

    let value = match type_name {
        "INT2" => row.try_get::<Option<i16>, _>(index)?.map(Value::from),
        "INT4" => row.try_get::<Option<i32>, _>(index)?.map(Value::from),
        "INT8" => row.try_get::<Option<i64>, _>(index)?.map(Value::from),
        "FLOAT4" => row.try_get::<Option<f32>, _>(index)?.map(|f| Value::from(f as f64)),
        "FLOAT8" => row.try_get::<Option<f64>, _>(index)?.map(Value::from),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => row.try_get::<Option<String>, _>(index)?.map(Value::String),
        "BOOL" => row.try_get::<Option<bool>, _>(index)?.map(Value::Bool),
        "DATE" => row
            .try_get::<Option<chrono::NaiveDate>, _>(index)?
            .map(|d| Value::String(d.format("%Y-%m-%d").to_string())),
        "TIMESTAMPTZ" => row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(index)?
            .map(|t| Value::String(t.to_rfc3339())),
        "TIMESTAMP" => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(index)?
            .map(|t| Value::String(t.format("%Y-%m-%dT%H:%M:%S%.f").to_string())),
        "JSON" | "JSONB" => row.try_get::<Option<Value>, _>(index)?,
        "TEXT[]" | "VARCHAR[]" => row
            .try_get::<Option<Vec<String>>, _>(index)?
            .map(|items| Value::Array(items.into_iter().map(Value::String).collect())),
        "INT8[]" => row
            .try_get::<Option<Vec<i64>>, _>(index)?
            .map(|items| Value::Array(items.into_iter().map(Value::from).collect())),
        _ => {
            tracing::warn!("Unhandled PostgreSQL type: {}, returning null", type_name);
            None
        }
    };

    Ok(value.unwrap_or(Value::Null))
}

/// Statement logging and slow-query detection
struct QueryTimer<'a> {
    sql: &'a SqlResult,
    started: Instant,
}

impl<'a> QueryTimer<'a> {
    fn start(sql: &'a SqlResult) -> Self {
        if config::config().database.enable_query_logging {
            tracing::debug!(params = sql.params.len(), "SQL: {}", sql.query);
        }
        Self { sql, started: Instant::now() }
    }

    fn finish(self) {
        let elapsed = self.started.elapsed();
        let threshold = config::config().database.slow_query_threshold_ms;
        if elapsed.as_millis() as u64 > threshold {
            tracing::warn!(elapsed_ms = elapsed.as_millis() as u64, "Slow query: {}", self.sql.query);
        }
    }
}
