//! INSERT builder

use super::params::{param_name, set_column, unique_param_name};
use super::select::Query;
use super::substitution::process_literal;
use super::types::{SqlStatement, StatementKind, Updatable};
use crate::dialect::Dialect;
use crate::error::{OrmResult, QueryError};
use crate::value::{Params, Value};

/// `INSERT INTO table (cols) VALUES (:col, ...)`
#[derive(Debug, Clone)]
pub struct InsertQuery {
    table: String,
    columns: Vec<(String, Value)>,
}

impl InsertQuery {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            columns: Vec::new(),
        }
    }

    pub fn set(mut self, field: &str, value: impl Into<Value>) -> Self {
        set_column(&mut self.columns, field, value.into());
        self
    }

    /// Set several columns at once, in map order
    pub fn values(mut self, values: Params) -> Self {
        for (field, value) in values {
            set_column(&mut self.columns, &field, value);
        }
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn value(&self, field: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    /// A SELECT over the same table and columns matching the inserted
    /// values. Literal values are not compared.
    pub fn convert(&self) -> Query {
        let fields: Vec<&str> = self.columns().collect();
        let mut query = Query::new().table(&self.table).fields(&fields);
        for (field, value) in &self.columns {
            let name = param_name(field);
            query = match value {
                Value::Literal(_) => query,
                Value::Null => query.where_clause(&format!("{} IS NULL", field), Params::new()),
                other => {
                    let mut params = Params::new();
                    params.insert(name.clone(), other.clone());
                    query.where_clause(&format!("{} = :{}", field, name), params)
                }
            };
        }
        query
    }
}

impl Updatable for InsertQuery {
    fn build(&self, _dialect: Option<&dyn Dialect>) -> OrmResult<SqlStatement> {
        if self.columns.is_empty() {
            return Err(QueryError::MissingFields(format!(
                "INSERT into '{}' has no columns",
                self.table
            ))
            .into());
        }

        let mut params = Params::new();
        let mut names = Vec::with_capacity(self.columns.len());
        let mut placeholders = Vec::with_capacity(self.columns.len());
        for (field, value) in &self.columns {
            let name = unique_param_name(field, &params);
            names.push(field.as_str());
            placeholders.push(format!(":{}", name));
            params.insert(name, value.clone());
        }

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table,
            names.join(", "),
            placeholders.join(", ")
        );
        let (sql, params) = process_literal(&sql, params)?;
        tracing::debug!(kind = "INSERT", sql = %sql, "built query");
        Ok(SqlStatement::new(sql, params, StatementKind::Insert))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::literal::Literal;
    use crate::params;

    #[test]
    fn test_insert_with_literal() {
        let statement = InsertQuery::new("users")
            .set("name", "Ann")
            .set("created_at", Literal::new("NOW()"))
            .build(None)
            .unwrap();

        assert_eq!(
            statement.sql,
            "INSERT INTO users (name, created_at) VALUES (:name, NOW())"
        );
        assert_eq!(statement.params, params! { "name" => "Ann" });
        assert!(statement.allows_last_insert_id());
    }

    #[test]
    fn test_insert_requires_fields() {
        let err = InsertQuery::new("users").build(None).unwrap_err();
        assert!(err.is_build_error());
    }

    #[test]
    fn test_set_replaces_earlier_value() {
        let query = InsertQuery::new("users").set("name", "Ann").set("name", "Bob");
        assert_eq!(query.columns().count(), 1);
        assert_eq!(query.value("name"), Some(&Value::from("Bob")));
    }

    #[test]
    fn test_columns_with_the_same_param_name_keep_both_values() {
        let statement = InsertQuery::new("people")
            .set("first-name", "Ann")
            .set("first_name", "Bob")
            .build(None)
            .unwrap();

        assert_eq!(
            statement.sql,
            "INSERT INTO people (first-name, first_name) VALUES (:first_name, :first_name_1)"
        );
        assert_eq!(
            statement.params,
            params! { "first_name" => "Ann", "first_name_1" => "Bob" }
        );
    }

    #[test]
    fn test_convert_to_select() {
        let statement = InsertQuery::new("users")
            .set("name", "Ann")
            .set("manager_id", Value::Null)
            .set("created_at", Literal::new("NOW()"))
            .convert()
            .build(None)
            .unwrap();

        assert_eq!(
            statement.sql,
            "SELECT name, manager_id, created_at FROM users WHERE (name = :name) AND (manager_id IS NULL)"
        );
        assert_eq!(statement.params, params! { "name" => "Ann" });
    }
}
