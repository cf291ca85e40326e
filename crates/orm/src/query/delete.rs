//! DELETE builder

use super::basic::QueryBasic;
use super::select::Query;
use super::substitution::process_literal;
use super::types::{SqlStatement, StatementKind, Updatable};
use super::where_clause::WhereClause;
use crate::dialect::Dialect;
use crate::error::{OrmResult, QueryError};
use crate::value::{Params, Value};

/// `DELETE FROM table WHERE ...`
#[derive(Debug, Clone)]
pub struct DeleteQuery {
    table: String,
    filters: WhereClause,
    deferred_error: Option<QueryError>,
}

impl DeleteQuery {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            filters: WhereClause::new(),
            deferred_error: None,
        }
    }

    pub fn where_clause(mut self, filter: &str, params: Params) -> Self {
        if let Err(e) = self.filters.add(filter, params) {
            self.deferred_error.get_or_insert(e);
        }
        self
    }

    pub fn where_in<I, V>(mut self, field: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if let Err(e) = self.filters.add_in(field, values) {
            self.deferred_error.get_or_insert(e);
        }
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// The SELECT matching the rows this statement would delete
    pub fn convert(&self) -> Query {
        Query::from(
            QueryBasic::new()
                .table(&self.table)
                .with_filters(self.filters.clone()),
        )
    }
}

impl Updatable for DeleteQuery {
    fn build(&self, _dialect: Option<&dyn Dialect>) -> OrmResult<SqlStatement> {
        if let Some(e) = &self.deferred_error {
            return Err(e.clone().into());
        }
        let filter = self
            .filters
            .render(&[])
            .ok_or(QueryError::MissingWhere("DELETE"))?;

        let sql = format!("DELETE FROM {} WHERE {}", self.table, filter);
        let (sql, params) = process_literal(&sql, self.filters.params().clone())?;
        tracing::debug!(kind = "DELETE", sql = %sql, "built query");
        Ok(SqlStatement::new(sql, params, StatementKind::Delete))
    }
}
