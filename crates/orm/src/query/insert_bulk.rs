//! Multi-row INSERT builder

use super::substitution::process_literal;
use super::types::{SqlStatement, StatementKind, Updatable};
use crate::dialect::Dialect;
use crate::error::{OrmResult, QueryError};
use crate::value::{Params, Value};

/// `INSERT INTO table (cols) VALUES (...), (...)`
///
/// Values are bound as `:p{row}_{col}` by default. [`allow_inline_values`]
/// switches to writing them into the SQL text as quoted literals.
///
/// [`allow_inline_values`]: InsertBulkQuery::allow_inline_values
#[derive(Debug, Clone)]
pub struct InsertBulkQuery {
    table: String,
    columns: Vec<String>,
    rows: Vec<Params>,
    allow_extra_fields: bool,
    inline_values: bool,
}

impl InsertBulkQuery {
    pub fn new(table: &str, columns: &[&str]) -> Self {
        Self {
            table: table.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
            allow_extra_fields: false,
            inline_values: false,
        }
    }

    /// Add a row keyed by column name
    pub fn add_row(mut self, row: Params) -> Self {
        self.rows.push(row);
        self
    }

    pub fn rows(mut self, rows: impl IntoIterator<Item = Params>) -> Self {
        self.rows.extend(rows);
        self
    }

    /// Ignore row entries that are not declared columns
    pub fn allow_extra_fields(mut self) -> Self {
        self.allow_extra_fields = true;
        self
    }

    /// Write values into the SQL text instead of binding them
    pub fn allow_inline_values(mut self) -> Self {
        self.inline_values = true;
        self
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn check_row(&self, index: usize, row: &Params) -> Result<(), QueryError> {
        if let Some(missing) = self.columns.iter().find(|c| !row.contains_key(c.as_str())) {
            return Err(QueryError::BulkRowMismatch {
                row: index,
                message: format!("missing column '{}'", missing),
            });
        }
        if !self.allow_extra_fields {
            if let Some(extra) = row.keys().find(|k| !self.columns.contains(k)) {
                return Err(QueryError::BulkRowMismatch {
                    row: index,
                    message: format!("unexpected column '{}'", extra),
                });
            }
        }
        Ok(())
    }
}

impl Updatable for InsertBulkQuery {
    fn build(&self, _dialect: Option<&dyn Dialect>) -> OrmResult<SqlStatement> {
        if self.columns.is_empty() {
            return Err(QueryError::MissingFields(format!(
                "bulk INSERT into '{}' declares no columns",
                self.table
            ))
            .into());
        }
        if self.rows.is_empty() {
            return Err(QueryError::MissingFields(format!(
                "bulk INSERT into '{}' has no rows",
                self.table
            ))
            .into());
        }

        let mut params = Params::new();
        let mut tuples = Vec::with_capacity(self.rows.len());
        for (i, row) in self.rows.iter().enumerate() {
            self.check_row(i, row)?;
            let mut cells = Vec::with_capacity(self.columns.len());
            for (j, column) in self.columns.iter().enumerate() {
                let value = row.get(column).cloned().unwrap_or(Value::Null);
                if self.inline_values {
                    cells.push(value.to_inline_sql());
                } else {
                    let name = format!("p{}_{}", i, j);
                    cells.push(format!(":{}", name));
                    params.insert(name, value);
                }
            }
            tuples.push(format!("({})", cells.join(", ")));
        }

        let sql = format!(
            "INSERT INTO {} ({}) VALUES {}",
            self.table,
            self.columns.join(", "),
            tuples.join(", ")
        );
        let (sql, params) = process_literal(&sql, params)?;
        tracing::debug!(kind = "INSERT", rows = self.rows.len(), inline = self.inline_values, "built bulk insert");
        Ok(SqlStatement::new(sql, params, StatementKind::Insert))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params;

    #[test]
    fn test_bulk_insert_uses_positional_names() {
        let statement = InsertBulkQuery::new("users", &["name"])
            .add_row(params! { "name" => "A" })
            .add_row(params! { "name" => "B" })
            .build(None)
            .unwrap();

        assert_eq!(statement.sql, "INSERT INTO users (name) VALUES (:p0_0), (:p1_0)");
        assert_eq!(statement.params, params! { "p0_0" => "A", "p1_0" => "B" });
    }

    #[test]
    fn test_row_column_mismatch() {
        let missing = InsertBulkQuery::new("users", &["name", "email"])
            .add_row(params! { "name" => "A" })
            .build(None)
            .unwrap_err();
        assert!(missing.to_string().contains("row 0"));

        let extra = InsertBulkQuery::new("users", &["name"])
            .add_row(params! { "name" => "A" })
            .add_row(params! { "name" => "B", "age" => 3 })
            .build(None)
            .unwrap_err();
        assert!(extra.to_string().contains("row 1"));
    }

    #[test]
    fn test_extra_fields_when_allowed() {
        let statement = InsertBulkQuery::new("users", &["name"])
            .allow_extra_fields()
            .add_row(params! { "name" => "A", "age" => 3 })
            .build(None)
            .unwrap();
        assert_eq!(statement.params.len(), 1);
    }

    #[test]
    fn test_inline_mode_quotes_text() {
        let statement = InsertBulkQuery::new("users", &["name", "age"])
            .allow_inline_values()
            .add_row(params! { "name" => "O'Brien", "age" => 40 })
            .build(None)
            .unwrap();

        assert_eq!(statement.sql, "INSERT INTO users (name, age) VALUES ('O''Brien', 40)");
        assert!(statement.params.is_empty());
    }
}
