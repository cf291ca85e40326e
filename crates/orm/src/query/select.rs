//! Full SELECT builder
//!
//! [`Query`] wraps a [`QueryBasic`] and adds GROUP BY, ORDER BY, the row
//! window (LIMIT or TOP) and row locking.

use super::basic::QueryBasic;
use super::recursive::Recursive;
use super::substitution::process_literal;
use super::types::{AnyQuery, JoinClause, JoinType, OrderDirection, SqlStatement, StatementKind, Updatable};
use crate::dialect::Dialect;
use crate::error::{OrmResult, QueryError};
use crate::mapper::Mapper;
use crate::value::{Params, Value};

#[derive(Debug, Clone, Default)]
pub struct Query {
    basic: QueryBasic,
    order_by: Vec<(String, OrderDirection)>,
    group_by: Vec<String>,
    limit: Option<(u64, u64)>,
    top: Option<u64>,
    for_update: bool,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fields(mut self, fields: &[&str]) -> Self {
        self.basic = self.basic.fields(fields);
        self
    }

    pub fn field(mut self, field: &str) -> Self {
        self.basic = self.basic.field(field);
        self
    }

    pub fn fields_mapper(mut self, mapper: &Mapper) -> Self {
        self.basic = self.basic.fields_mapper(mapper);
        self
    }

    pub fn table(mut self, table: &str) -> Self {
        self.basic = self.basic.table(table);
        self
    }

    pub fn table_alias(mut self, table: &str, alias: &str) -> Self {
        self.basic = self.basic.table_alias(table, alias);
        self
    }

    pub fn table_mapper(mut self, mapper: &Mapper) -> Self {
        self.basic = self.basic.table_mapper(mapper);
        self
    }

    pub fn table_query(mut self, query: impl Into<AnyQuery>, alias: &str) -> Self {
        self.basic = self.basic.table_query(query, alias);
        self
    }

    pub fn join(mut self, table: &str, condition: &str) -> Self {
        self.basic = self.basic.join(table, condition);
        self
    }

    pub fn left_join(mut self, table: &str, condition: &str) -> Self {
        self.basic = self.basic.left_join(table, condition);
        self
    }

    pub fn right_join(mut self, table: &str, condition: &str) -> Self {
        self.basic = self.basic.right_join(table, condition);
        self
    }

    pub fn cross_join(mut self, table: &str) -> Self {
        self.basic = self.basic.cross_join(table);
        self
    }

    pub fn join_query(
        mut self,
        join_type: JoinType,
        query: impl Into<AnyQuery>,
        alias: &str,
        condition: Option<&str>,
    ) -> Self {
        self.basic = self.basic.join_query(join_type, query, alias, condition);
        self
    }

    pub fn join_clause(mut self, clause: JoinClause) -> Self {
        self.basic = self.basic.join_clause(clause);
        self
    }

    pub fn where_clause(mut self, filter: &str, params: Params) -> Self {
        self.basic = self.basic.where_clause(filter, params);
        self
    }

    pub fn where_in<I, V>(mut self, field: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.basic = self.basic.where_in(field, values);
        self
    }

    pub fn with_recursive(mut self, recursive: Recursive) -> Self {
        self.basic = self.basic.with_recursive(recursive);
        self
    }

    pub fn distinct(mut self) -> Self {
        self.basic = self.basic.distinct();
        self
    }

    pub fn soft_delete(mut self, table: &str) -> Self {
        self.basic = self.basic.soft_delete(table);
        self
    }

    pub fn unsafe_query(mut self) -> Self {
        self.basic = self.basic.unsafe_query();
        self
    }

    /// Add ORDER BY clause (ascending)
    pub fn order_by(mut self, column: &str) -> Self {
        self.order_by.push((column.to_string(), OrderDirection::Asc));
        self
    }

    /// Add ORDER BY clause (descending)
    pub fn order_by_desc(mut self, column: &str) -> Self {
        self.order_by.push((column.to_string(), OrderDirection::Desc));
        self
    }

    /// Add GROUP BY clause
    pub fn group_by(mut self, column: &str) -> Self {
        self.group_by.push(column.to_string());
        self
    }

    /// Skip `offset` rows and return at most `count` rows
    pub fn limit(mut self, offset: u64, count: u64) -> Self {
        self.limit = Some((offset, count));
        self
    }

    pub fn top(mut self, count: u64) -> Self {
        self.top = Some(count);
        self
    }

    pub fn for_update(mut self) -> Self {
        self.for_update = true;
        self
    }

    /// The union-compatible part of this query, without the tail
    pub fn get_query_basic(&self) -> QueryBasic {
        self.basic.clone()
    }

    pub fn basic(&self) -> &QueryBasic {
        &self.basic
    }

    pub fn table_name(&self) -> Option<&str> {
        self.basic.table_name()
    }

    pub fn is_unsafe(&self) -> bool {
        self.basic.is_unsafe()
    }

    fn has_tail(&self) -> bool {
        !self.order_by.is_empty()
            || !self.group_by.is_empty()
            || self.limit.is_some()
            || self.top.is_some()
            || self.for_update
    }

    /// Append GROUP BY, ORDER BY, the row window and row locking.
    pub(crate) fn apply_tail(&self, sql: String, dialect: Option<&dyn Dialect>) -> OrmResult<String> {
        let mut sql = sql;

        if !self.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.group_by.join(", "));
        }

        if !self.order_by.is_empty() {
            let order: Vec<String> = self
                .order_by
                .iter()
                .map(|(column, direction)| format!("{} {}", column, direction))
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&order.join(", "));
        }

        if self.top.is_some() && self.limit.is_some() {
            return Err(QueryError::TopAndLimit.into());
        }

        if let Some((offset, count)) = self.limit {
            if count == 0 {
                return Err(QueryError::InvalidParameter(format!(
                    "limit at offset {} must return at least one row",
                    offset
                ))
                .into());
            }
            let dialect = dialect.ok_or(QueryError::MissingDialect("LIMIT"))?;
            sql = dialect.limit(&sql, offset, count);
        }

        if let Some(count) = self.top {
            let dialect = dialect.ok_or(QueryError::MissingDialect("TOP"))?;
            sql = dialect.top(&sql, count);
        }

        if self.for_update {
            let dialect = dialect.ok_or(QueryError::MissingDialect("FOR UPDATE"))?;
            sql = dialect.for_update(&sql);
        }

        Ok(sql)
    }

    /// Text appended after the FROM target when this query only carries a tail.
    pub(crate) fn tail_after_placeholder(&self, dialect: Option<&dyn Dialect>) -> OrmResult<String> {
        const PLACEHOLDER: &str = "__TMP__";
        if !self.has_tail() {
            return Ok(String::new());
        }
        let sql = self.apply_tail(format!("SELECT * FROM {}", PLACEHOLDER), dialect)?;
        Ok(sql
            .split_once(PLACEHOLDER)
            .map(|(_, tail)| tail.to_string())
            .unwrap_or_default())
    }
}

impl From<QueryBasic> for Query {
    fn from(basic: QueryBasic) -> Self {
        Self {
            basic,
            ..Self::default()
        }
    }
}

impl Updatable for Query {
    fn build(&self, dialect: Option<&dyn Dialect>) -> OrmResult<SqlStatement> {
        let (sql, params) = self.basic.assemble(dialect)?;
        let sql = self.apply_tail(sql, dialect)?;
        let (sql, params) = process_literal(&sql, params)?;
        tracing::debug!(kind = "SELECT", sql = %sql, "built query");
        Ok(SqlStatement::new(sql, params, StatementKind::Select))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::SqlDialect;
    use crate::literal::Literal;
    use crate::params;

    #[test]
    fn test_simple_select_with_param() {
        let statement = Query::new()
            .table("users")
            .where_clause("id = :id", params! { "id" => 5 })
            .build(None)
            .unwrap();

        assert_eq!(statement.sql, "SELECT * FROM users WHERE id = :id");
        assert_eq!(statement.params, params! { "id" => 5 });
    }

    #[test]
    fn test_literal_param_is_inlined() {
        let statement = Query::new()
            .table("codes")
            .where_clause("field = :field", params! { "field" => Literal::new("ABC") })
            .build(None)
            .unwrap();

        assert_eq!(statement.sql, "SELECT * FROM codes WHERE field = ABC");
        assert!(statement.params.is_empty());
    }

    #[test]
    fn test_tail_rendering() {
        let statement = Query::new()
            .fields(&["country", "COUNT(*)"])
            .table("users")
            .group_by("country")
            .order_by_desc("country")
            .limit(10, 10)
            .build(Some(&SqlDialect::PostgreSQL))
            .unwrap();

        assert_eq!(
            statement.sql,
            "SELECT country, COUNT(*) FROM users GROUP BY country ORDER BY country DESC LIMIT 10 OFFSET 10"
        );
    }

    #[test]
    fn test_limit_takes_offset_and_row_count() {
        let statement = Query::new()
            .table("users")
            .limit(20, 10)
            .build(Some(&SqlDialect::MySQL))
            .unwrap();
        assert_eq!(statement.sql, "SELECT * FROM users LIMIT 20, 10");

        let err = Query::new()
            .table("users")
            .limit(5, 0)
            .build(Some(&SqlDialect::MySQL))
            .unwrap_err();
        assert!(err.is_build_error());
    }

    #[test]
    fn test_top_and_limit_conflict() {
        let err = Query::new()
            .table("users")
            .top(5)
            .limit(0, 5)
            .build(Some(&SqlDialect::MySQL))
            .unwrap_err();
        assert!(err.is_build_error());
    }

    #[test]
    fn test_modifiers_need_a_dialect() {
        for query in [
            Query::new().table("users").top(1),
            Query::new().table("users").limit(0, 1),
            Query::new().table("users").for_update(),
        ] {
            assert!(query.build(None).unwrap_err().is_build_error());
        }

        let sql = Query::new()
            .table("users")
            .where_clause("id = :id", params! { "id" => 1 })
            .for_update()
            .build(Some(&SqlDialect::MySQL))
            .unwrap()
            .sql;
        assert_eq!(sql, "SELECT * FROM users WHERE id = :id FOR UPDATE");
    }

    #[test]
    fn test_get_query_basic_drops_tail() {
        let query = Query::new().table("users").order_by("name");
        let basic = query.get_query_basic();
        assert_eq!(basic.build(None).unwrap().sql, "SELECT * FROM users");
    }
}
