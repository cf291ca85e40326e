//! SELECT core: fields, source, joins, filters
//!
//! [`QueryBasic`] is the part of a SELECT that can be combined in a union.
//! [`Query`](super::select::Query) adds the ordering, grouping and row
//! window tail on top of it.

use std::collections::BTreeSet;

use super::params::merge_params;
use super::recursive::Recursive;
use super::substitution::process_literal;
use super::types::{
    split_table_alias, AnyQuery, JoinClause, JoinType, SqlStatement, StatementKind, TableSource,
    Updatable,
};
use super::where_clause::WhereClause;
use crate::dialect::Dialect;
use crate::error::{OrmResult, QueryError};
use crate::mapper::Mapper;
use crate::value::{Params, Value};

/// Column of every soft-deletable table
pub const SOFT_DELETE_COLUMN: &str = "deleted_at";

#[derive(Debug, Clone, Default)]
pub struct QueryBasic {
    fields: Vec<String>,
    source: Option<TableSource>,
    alias: Option<String>,
    joins: Vec<JoinClause>,
    filters: WhereClause,
    recursive: Option<Recursive>,
    distinct: bool,
    soft_delete_tables: BTreeSet<String>,
    unsafe_query: bool,
    deferred_error: Option<QueryError>,
}

impl QueryBasic {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add column expressions to the select list
    pub fn fields(mut self, fields: &[&str]) -> Self {
        self.fields.extend(fields.iter().map(|f| f.to_string()));
        self
    }

    pub fn field(mut self, field: &str) -> Self {
        self.fields.push(field.to_string());
        self
    }

    /// Select every synced field of a mapper as `table.column as alias`
    pub fn fields_mapper(mut self, mapper: &Mapper) -> Self {
        self.fields.extend(mapper.select_fields());
        if mapper.has_soft_delete() {
            self.soft_delete_tables.insert(mapper.table_name().to_string());
        }
        self
    }

    /// Read from a named table, written either bare or as `users u`
    pub fn table(mut self, table: &str) -> Self {
        let (table, alias) = split_table_alias(table);
        self.source = Some(TableSource::Name(table));
        self.alias = alias;
        self
    }

    pub fn table_alias(mut self, table: &str, alias: &str) -> Self {
        self.source = Some(TableSource::Name(table.to_string()));
        self.alias = Some(alias.to_string());
        self
    }

    /// Read from a mapper's table under its alias, honouring soft delete
    pub fn table_mapper(mut self, mapper: &Mapper) -> Self {
        self.source = Some(TableSource::Name(mapper.table_name().to_string()));
        self.alias = mapper.table_alias().map(str::to_string);
        if mapper.has_soft_delete() {
            self.soft_delete_tables.insert(mapper.table_name().to_string());
        }
        self
    }

    /// Read from a nested query. The alias must not be empty.
    pub fn table_query(mut self, query: impl Into<AnyQuery>, alias: &str) -> Self {
        self.source = Some(TableSource::Query(Box::new(query.into())));
        self.alias = Some(alias.to_string()).filter(|a| !a.is_empty());
        self
    }

    pub fn join(self, table: &str, condition: &str) -> Self {
        self.join_clause(JoinClause::inner(table, condition))
    }

    pub fn left_join(self, table: &str, condition: &str) -> Self {
        self.join_clause(JoinClause::left(table, condition))
    }

    pub fn right_join(self, table: &str, condition: &str) -> Self {
        self.join_clause(JoinClause::right(table, condition))
    }

    pub fn cross_join(self, table: &str) -> Self {
        self.join_clause(JoinClause::cross(table))
    }

    /// Join a nested query under `alias`
    pub fn join_query(
        self,
        join_type: JoinType,
        query: impl Into<AnyQuery>,
        alias: &str,
        condition: Option<&str>,
    ) -> Self {
        let clause = JoinClause::subquery(join_type, query, condition);
        let clause = if alias.is_empty() { clause } else { clause.alias(alias) };
        self.join_clause(clause)
    }

    pub fn join_clause(mut self, clause: JoinClause) -> Self {
        self.joins.push(clause);
        self
    }

    /// Add a filter with its named parameters
    pub fn where_clause(mut self, filter: &str, params: Params) -> Self {
        if let Err(e) = self.filters.add(filter, params) {
            self.defer(e);
        }
        self
    }

    /// `field IN (...)`; an empty list leaves the filters unchanged
    pub fn where_in<I, V>(mut self, field: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if let Err(e) = self.filters.add_in(field, values) {
            self.defer(e);
        }
        self
    }

    pub fn with_recursive(mut self, recursive: Recursive) -> Self {
        self.recursive = Some(recursive);
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Treat `table` as soft-deletable wherever it appears in FROM or JOIN
    pub fn soft_delete(mut self, table: &str) -> Self {
        self.soft_delete_tables.insert(table.to_string());
        self
    }

    /// Skip soft-delete filtering for this query
    pub fn unsafe_query(mut self) -> Self {
        self.unsafe_query = true;
        self
    }

    pub fn is_unsafe(&self) -> bool {
        self.unsafe_query
    }

    pub fn table_name(&self) -> Option<&str> {
        self.source.as_ref().and_then(TableSource::table_name)
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn field_list(&self) -> &[String] {
        &self.fields
    }

    pub fn filters(&self) -> &WhereClause {
        &self.filters
    }

    /// Plain table names referenced by FROM and JOIN, in order
    pub fn referenced_tables(&self) -> Vec<&str> {
        self.table_name()
            .into_iter()
            .chain(self.joins.iter().filter_map(|j| j.source.table_name()))
            .collect()
    }

    pub(crate) fn with_filters(mut self, filters: WhereClause) -> Self {
        self.filters = filters;
        self
    }

    fn defer(&mut self, error: QueryError) {
        if self.deferred_error.is_none() {
            self.deferred_error = Some(error);
        }
    }

    fn soft_delete_predicates(&self) -> Vec<String> {
        if self.unsafe_query || self.soft_delete_tables.is_empty() {
            return Vec::new();
        }

        let from = self
            .table_name()
            .map(|table| (table, self.alias.as_deref().unwrap_or(table)));
        let joined = self.joins.iter().filter_map(|join| {
            join.source
                .table_name()
                .map(|table| (table, join.alias.as_deref().unwrap_or(table)))
        });

        let mut predicates: Vec<String> = Vec::new();
        for (table, reference) in from.into_iter().chain(joined) {
            if !self.soft_delete_tables.contains(table) {
                continue;
            }
            let predicate = format!("{}.{} IS NULL", reference, SOFT_DELETE_COLUMN);
            if !predicates.contains(&predicate) {
                predicates.push(predicate);
            }
        }
        predicates
    }

    /// Assemble the SELECT without running the literal pass.
    pub(crate) fn assemble(&self, dialect: Option<&dyn Dialect>) -> OrmResult<(String, Params)> {
        if let Some(e) = &self.deferred_error {
            return Err(e.clone().into());
        }

        let mut params = Params::new();
        let mut sql = String::new();

        if let Some(recursive) = &self.recursive {
            let (mut cte, cte_params) = recursive.render()?;
            merge_params(&mut params, &mut cte, cte_params)?;
            sql.push_str(&cte);
            sql.push(' ');
        }

        sql.push_str("SELECT ");
        if self.distinct {
            sql.push_str("DISTINCT ");
        }
        if self.fields.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&self.fields.join(", "));
        }

        match (&self.source, &self.recursive) {
            (Some(TableSource::Name(table)), _) => {
                sql.push_str(" FROM ");
                sql.push_str(table);
                if let Some(alias) = &self.alias {
                    sql.push(' ');
                    sql.push_str(alias);
                }
            }
            (Some(TableSource::Query(query)), _) => {
                let alias = self.alias.as_ref().ok_or(QueryError::MissingAlias("table"))?;
                let sub = query.build(dialect)?;
                let mut sub_sql = sub.sql;
                merge_params(&mut params, &mut sub_sql, sub.params)?;
                sql.push_str(&format!(" FROM ({}) {}", sub_sql, alias));
            }
            (None, Some(recursive)) => {
                sql.push_str(" FROM ");
                sql.push_str(recursive.name());
            }
            (None, None) => {}
        }

        for join in &self.joins {
            sql.push(' ');
            sql.push_str(&join.join_type.to_string());
            sql.push(' ');
            match &join.source {
                TableSource::Name(table) => sql.push_str(table),
                TableSource::Query(query) => {
                    if join.alias.is_none() {
                        return Err(QueryError::MissingAlias("join").into());
                    }
                    let sub = query.build(dialect)?;
                    let mut sub_sql = sub.sql;
                    merge_params(&mut params, &mut sub_sql, sub.params)?;
                    sql.push_str(&format!("({})", sub_sql));
                }
            }
            if let Some(alias) = &join.alias {
                sql.push(' ');
                sql.push_str(alias);
            }
            if join.join_type != JoinType::Cross {
                if let Some(condition) = &join.condition {
                    let mut condition = condition.clone();
                    merge_params(&mut params, &mut condition, join.params.clone())?;
                    sql.push_str(" ON ");
                    sql.push_str(&condition);
                }
            }
        }

        if let Some(mut filter) = self.filters.render(&self.soft_delete_predicates()) {
            merge_params(&mut params, &mut filter, self.filters.params().clone())?;
            sql.push_str(" WHERE ");
            sql.push_str(&filter);
        }

        Ok((sql, params))
    }
}

impl Updatable for QueryBasic {
    fn build(&self, dialect: Option<&dyn Dialect>) -> OrmResult<SqlStatement> {
        let (sql, params) = self.assemble(dialect)?;
        let (sql, params) = process_literal(&sql, params)?;
        tracing::debug!(kind = "SELECT", sql = %sql, "built query");
        Ok(SqlStatement::new(sql, params, StatementKind::Select))
    }
}
