//! UNION of basic queries with a shared tail

use super::params::merge_params;
use super::select::Query;
use super::types::{AnyQuery, SqlStatement, StatementKind, Updatable};
use crate::dialect::Dialect;
use crate::error::{OrmResult, QueryError};
use crate::value::Params;

/// `member UNION member ... [GROUP BY] [ORDER BY] [LIMIT/TOP]`
///
/// Members must be [`QueryBasic`](super::basic::QueryBasic) values; a
/// [`Query`] carrying its own tail is rejected at build time. Use
/// [`Query::get_query_basic`] to downgrade one.
#[derive(Debug, Clone, Default)]
pub struct Union {
    members: Vec<AnyQuery>,
    tail: Query,
}

impl Union {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, query: impl Into<AnyQuery>) -> Self {
        self.members.push(query.into());
        self
    }

    pub fn order_by(mut self, column: &str) -> Self {
        self.tail = self.tail.order_by(column);
        self
    }

    pub fn order_by_desc(mut self, column: &str) -> Self {
        self.tail = self.tail.order_by_desc(column);
        self
    }

    pub fn group_by(mut self, column: &str) -> Self {
        self.tail = self.tail.group_by(column);
        self
    }

    pub fn limit(mut self, offset: u64, count: u64) -> Self {
        self.tail = self.tail.limit(offset, count);
        self
    }

    pub fn top(mut self, count: u64) -> Self {
        self.tail = self.tail.top(count);
        self
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl Updatable for Union {
    fn build(&self, dialect: Option<&dyn Dialect>) -> OrmResult<SqlStatement> {
        if self.members.is_empty() {
            return Err(QueryError::EmptyUnion.into());
        }

        let mut params = Params::new();
        let mut parts = Vec::with_capacity(self.members.len());
        for member in &self.members {
            let basic = match member {
                AnyQuery::Basic(basic) => basic,
                other => return Err(QueryError::InvalidUnionMember(other.kind_name()).into()),
            };
            let statement = basic.build(dialect)?;
            let mut sql = statement.sql;
            merge_params(&mut params, &mut sql, statement.params)?;
            parts.push(sql);
        }

        let mut sql = parts.join(" UNION ");
        sql.push_str(&self.tail.tail_after_placeholder(dialect)?);

        tracing::debug!(kind = "SELECT", members = self.members.len(), sql = %sql, "built union");
        Ok(SqlStatement::new(sql, params, StatementKind::Select))
    }
}
