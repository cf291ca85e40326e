//! PostgreSQL executor
//!
//! Runs built statements through a sqlx pool. Named `:name` placeholders
//! are rewritten to positional `$n` parameters before binding.

use std::collections::HashMap;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow};
use sqlx::{Column, Postgres, Row as SqlxRow, TypeInfo, ValueRef};

use crate::config::OrmConfig;
use crate::dialect::{Dialect, SqlDialect};
use crate::error::{ModelError, OrmResult, QueryError};
use crate::executor::{Executor, Row};
use crate::query::SqlStatement;
use crate::value::{Params, Value};

/// `::` casts are matched first so they are never read as placeholders
static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"::|:([A-Za-z_][A-Za-z0-9_]*)").expect("placeholder pattern should compile")
});

type PgQuery<'q> = sqlx::query::Query<'q, Postgres, PgArguments>;

#[derive(Debug, Clone)]
pub struct PgExecutor {
    pool: PgPool,
}

impl PgExecutor {
    /// Open a pool from configuration
    pub async fn connect(config: &OrmConfig) -> OrmResult<Self> {
        config.validate()?;
        if config.dialect != SqlDialect::PostgreSQL {
            return Err(ModelError::Configuration(format!(
                "PgExecutor needs the postgresql dialect, got {}",
                config.dialect
            )));
        }
        let url = config.require_database_url()?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(url)
            .await
            .map_err(|e| ModelError::Database(format!("Failed to create PostgreSQL pool: {}", e)))?;

        tracing::debug!(max_connections = config.max_connections, "postgres pool ready");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Executor for PgExecutor {
    fn dialect(&self) -> &dyn Dialect {
        &SqlDialect::PostgreSQL
    }

    async fn fetch_all(&self, statement: &SqlStatement) -> OrmResult<Vec<Row>> {
        let (sql, values) = to_positional(&statement.sql, &statement.params)?;
        let query = bind_all(sqlx::query(&sql), values)?;

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ModelError::Database(format!("Query fetch failed: {}", e)))?;

        rows.iter().map(convert_row).collect()
    }

    async fn execute(&self, statement: &SqlStatement) -> OrmResult<u64> {
        let (sql, values) = to_positional(&statement.sql, &statement.params)?;
        let query = bind_all(sqlx::query(&sql), values)?;

        let result = query
            .execute(&self.pool)
            .await
            .map_err(|e| ModelError::Database(format!("Query execution failed: {}", e)))?;

        Ok(result.rows_affected())
    }

    async fn insert_and_get_id(&self, statement: &SqlStatement, primary_key: &str) -> OrmResult<Value> {
        if !statement.allows_last_insert_id() {
            return Err(QueryError::InvalidSql(format!(
                "cannot read a generated id from a {} statement",
                statement.kind
            ))
            .into());
        }

        let (sql, values) = to_positional(&statement.sql, &statement.params)?;
        let sql = format!("{} RETURNING {}", sql, primary_key);
        let query = bind_all(sqlx::query(&sql), values)?;

        let row = query
            .fetch_one(&self.pool)
            .await
            .map_err(|e| ModelError::Database(format!("Insert failed: {}", e)))?;

        column_value(&row, 0)
    }
}

/// Rewrite `:name` placeholders to `$n`, returning the values in position
/// order. A name used twice reuses its position.
pub fn to_positional(sql: &str, params: &Params) -> OrmResult<(String, Vec<Value>)> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut values: Vec<Value> = Vec::new();
    let mut missing: Option<String> = None;

    let rewritten = PLACEHOLDER.replace_all(sql, |caps: &Captures| {
        let Some(name) = caps.get(1).map(|m| m.as_str()) else {
            return "::".to_string();
        };
        if let Some(position) = positions.get(name) {
            return format!("${}", position);
        }
        match params.get(name) {
            Some(value) => {
                values.push(value.clone());
                positions.insert(name.to_string(), values.len());
                format!("${}", values.len())
            }
            None => {
                missing.get_or_insert_with(|| name.to_string());
                caps[0].to_string()
            }
        }
    });

    if let Some(name) = missing {
        return Err(QueryError::InvalidParameter(format!("no value bound for ':{}'", name)).into());
    }
    Ok((rewritten.into_owned(), values))
}

fn bind_all(mut query: PgQuery<'_>, values: Vec<Value>) -> OrmResult<PgQuery<'_>> {
    for value in values {
        query = bind_value(query, value)?;
    }
    Ok(query)
}

fn bind_value(query: PgQuery<'_>, value: Value) -> OrmResult<PgQuery<'_>> {
    match value {
        Value::Null => Ok(query.bind(Option::<String>::None)),
        Value::Bool(b) => Ok(query.bind(b)),
        Value::Int(i) => Ok(query.bind(i)),
        Value::Float(f) => Ok(query.bind(f)),
        Value::String(s) => Ok(query.bind(s)),
        Value::Bytes(b) => Ok(query.bind(b)),
        Value::Uuid(u) => Ok(query.bind(u)),
        Value::DateTime(dt) => Ok(query.bind(dt)),
        Value::Json(j) => Ok(query.bind(j)),
        Value::Literal(literal) => Err(QueryError::InvalidParameter(format!(
            "literal '{}' reached the driver unsubstituted",
            literal
        ))
        .into()),
    }
}

fn convert_row(row: &PgRow) -> OrmResult<Row> {
    let mut converted = Row::new();
    for (index, column) in row.columns().iter().enumerate() {
        converted.push(column.name(), column_value(row, index)?);
    }
    Ok(converted)
}

/// Convert a PostgreSQL column value to a [`Value`]
fn column_value(row: &PgRow, index: usize) -> OrmResult<Value> {
    let raw = row
        .try_get_raw(index)
        .map_err(|e| ModelError::Mapping(format!("Failed to read column {}: {}", index, e)))?;
    if raw.is_null() {
        return Ok(Value::Null);
    }

    let type_name = row.columns()[index].type_info().name().to_string();
    let mapping = |e: sqlx::Error| ModelError::Mapping(format!("Failed to get {} value: {}", type_name, e));

    match type_name.as_str() {
        "BOOL" => row.try_get::<bool, _>(index).map(Value::Bool).map_err(mapping),
        "INT2" => row.try_get::<i16, _>(index).map(|v| Value::Int(v.into())).map_err(mapping),
        "INT4" => row.try_get::<i32, _>(index).map(|v| Value::Int(v.into())).map_err(mapping),
        "INT8" => row.try_get::<i64, _>(index).map(Value::Int).map_err(mapping),
        "FLOAT4" => row.try_get::<f32, _>(index).map(|v| Value::Float(v.into())).map_err(mapping),
        "FLOAT8" => row.try_get::<f64, _>(index).map(Value::Float).map_err(mapping),
        "BYTEA" => row.try_get::<Vec<u8>, _>(index).map(Value::Bytes).map_err(mapping),
        "UUID" => row.try_get::<uuid::Uuid, _>(index).map(Value::Uuid).map_err(mapping),
        "TIMESTAMPTZ" => row
            .try_get::<chrono::DateTime<chrono::Utc>, _>(index)
            .map(Value::DateTime)
            .map_err(mapping),
        "TIMESTAMP" => row
            .try_get::<chrono::NaiveDateTime, _>(index)
            .map(|v| Value::DateTime(v.and_utc()))
            .map_err(mapping),
        "JSON" | "JSONB" => row.try_get::<JsonValue, _>(index).map(Value::Json).map_err(mapping),
        _ => row.try_get::<String, _>(index).map(Value::String).map_err(mapping),
    }
}
