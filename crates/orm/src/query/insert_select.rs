//! INSERT ... SELECT builder

use super::types::{AnyQuery, SqlStatement, StatementKind, Updatable};
use crate::dialect::Dialect;
use crate::error::{OrmResult, QueryError};

/// `INSERT INTO table (cols) <SELECT ...>` from exactly one source
#[derive(Debug, Clone)]
pub struct InsertSelectQuery {
    table: String,
    columns: Vec<String>,
    query: Option<AnyQuery>,
    raw: Option<SqlStatement>,
}

impl InsertSelectQuery {
    pub fn new(table: &str, columns: &[&str]) -> Self {
        Self {
            table: table.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            query: None,
            raw: None,
        }
    }

    pub fn from_query(mut self, query: impl Into<AnyQuery>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Use an already built SELECT statement as the source
    pub fn from_raw(mut self, statement: SqlStatement) -> Self {
        self.raw = Some(statement);
        self
    }
}

impl Updatable for InsertSelectQuery {
    fn build(&self, dialect: Option<&dyn Dialect>) -> OrmResult<SqlStatement> {
        let source = match (&self.query, &self.raw) {
            (Some(query), None) => query.build(dialect)?,
            (None, Some(raw)) => {
                if raw.kind != StatementKind::Select {
                    return Err(QueryError::InvalidSql(format!(
                        "insert-select source must be a SELECT, got {}",
                        raw.kind
                    ))
                    .into());
                }
                raw.clone()
            }
            _ => return Err(QueryError::InvalidSource.into()),
        };

        let mut sql = format!("INSERT INTO {}", self.table);
        if !self.columns.is_empty() {
            sql.push_str(&format!(" ({})", self.columns.join(", ")));
        }
        sql.push(' ');
        sql.push_str(&source.sql);

        tracing::debug!(kind = "INSERT", sql = %sql, "built insert-select");
        Ok(SqlStatement::new(sql, source.params, StatementKind::Insert))
    }
}
