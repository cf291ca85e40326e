//! UPDATE builder

use super::params::{merge_params, param_name, set_column, unique_param_name};
use super::substitution::process_literal;
use super::types::{SqlStatement, StatementKind, Updatable};
use super::where_clause::WhereClause;
use crate::dialect::Dialect;
use crate::error::{ModelError, OrmResult, QueryError};
use crate::mapper::Mapper;
use crate::value::{Params, Value};

/// `UPDATE table SET col = :col, ... WHERE ...`
#[derive(Debug, Clone)]
pub struct UpdateQuery {
    table: String,
    columns: Vec<(String, Value)>,
    filters: WhereClause,
    deferred_error: Option<QueryError>,
}

impl UpdateQuery {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            columns: Vec::new(),
            filters: WhereClause::new(),
            deferred_error: None,
        }
    }

    /// Build an update from column values, keyed by column name.
    ///
    /// Primary key columns are taken out of the SET list and become the
    /// WHERE clause.
    pub fn from_mapper(values: &Params, mapper: &Mapper) -> OrmResult<Self> {
        let primary_key = mapper.primary_key();
        let mut query = Self::new(mapper.table_name());

        for (field, value) in values {
            if !primary_key.iter().any(|pk| pk == field) {
                set_column(&mut query.columns, field, value.clone());
            }
        }

        for pk in primary_key {
            let value = values
                .get(pk)
                .filter(|v| !v.is_empty_key())
                .ok_or_else(|| {
                    ModelError::InvalidKey(format!(
                        "update of '{}' is missing primary key column '{}'",
                        mapper.table_name(),
                        pk
                    ))
                })?;
            let name = param_name(pk);
            let mut params = Params::new();
            params.insert(name.clone(), value.clone());
            query.filters.add(&format!("{} = :{}", pk, name), params)?;
        }

        Ok(query)
    }

    pub fn set(mut self, field: &str, value: impl Into<Value>) -> Self {
        set_column(&mut self.columns, field, value.into());
        self
    }

    pub fn values(mut self, values: Params) -> Self {
        for (field, value) in values {
            set_column(&mut self.columns, &field, value);
        }
        self
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

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn value(&self, field: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }
}

impl Updatable for UpdateQuery {
    fn build(&self, _dialect: Option<&dyn Dialect>) -> OrmResult<SqlStatement> {
        if let Some(e) = &self.deferred_error {
            return Err(e.clone().into());
        }
        if self.columns.is_empty() {
            return Err(QueryError::MissingFields(format!(
                "UPDATE of '{}' sets no columns",
                self.table
            ))
            .into());
        }
        let mut filter = self
            .filters
            .render(&[])
            .ok_or(QueryError::MissingWhere("UPDATE"))?;

        let mut params = Params::new();
        let assignments: Vec<String> = self
            .columns
            .iter()
            .map(|(field, value)| {
                let name = unique_param_name(field, &params);
                let assignment = format!("{} = :{}", field, name);
                params.insert(name, value.clone());
                assignment
            })
            .collect();

        merge_params(&mut params, &mut filter, self.filters.params().clone())?;

        let sql = format!(
            "UPDATE {} SET {} WHERE {}",
            self.table,
            assignments.join(", "),
            filter
        );
        let (sql, params) = process_literal(&sql, params)?;
        tracing::debug!(kind = "UPDATE", sql = %sql, "built query");
        Ok(SqlStatement::new(sql, params, StatementKind::Update))
    }
}
