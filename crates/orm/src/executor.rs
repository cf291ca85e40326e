//! Statement execution seam
//!
//! Repositories never talk to a driver directly; they hand built
//! [`SqlStatement`]s to an [`Executor`] and get [`Row`]s back.

use async_trait::async_trait;

use crate::dialect::Dialect;
use crate::error::OrmResult;
use crate::query::SqlStatement;
use crate::value::{Params, Value};

/// A result row with columns in select order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_columns(columns: Vec<(String, Value)>) -> Self {
        Self { columns }
    }

    pub fn push(&mut self, column: &str, value: impl Into<Value>) {
        self.columns.push((column.to_string(), value.into()));
    }

    pub fn with(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.push(column, value);
        self
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn first_value(&self) -> Option<&Value> {
        self.columns.first().map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Columns keyed by name; a repeated name keeps its last value
    pub fn into_params(self) -> Params {
        self.columns.into_iter().collect()
    }
}

#[async_trait]
pub trait Executor: Send + Sync {
    fn dialect(&self) -> &dyn Dialect;

    async fn fetch_all(&self, statement: &SqlStatement) -> OrmResult<Vec<Row>>;

    /// Run a statement and return the number of affected rows
    async fn execute(&self, statement: &SqlStatement) -> OrmResult<u64>;

    /// Run an INSERT and return the generated value of `primary_key`
    async fn insert_and_get_id(&self, statement: &SqlStatement, primary_key: &str) -> OrmResult<Value>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_access() {
        let row = Row::new().with("id", 7).with("name", "Ann");

        assert_eq!(row.len(), 2);
        assert_eq!(row.get("name"), Some(&Value::from("Ann")));
        assert_eq!(row.get("missing"), None);
        assert_eq!(row.first_value(), Some(&Value::from(7)));
        assert_eq!(row.column_names(), vec!["id", "name"]);
    }

    #[test]
    fn test_into_params() {
        let params = Row::new().with("b", 2).with("a", 1).into_params();
        assert_eq!(params.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(Row::new().into_params().is_empty());
    }
}
