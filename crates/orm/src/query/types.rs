//! Query Builder shared types

use std::fmt;

use serde::{Deserialize, Serialize};

use super::basic::QueryBasic;
use super::raw::QueryRaw;
use super::select::Query;
use crate::dialect::Dialect;
use crate::error::OrmResult;
use crate::value::Params;

/// Types of JOIN operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Cross,
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinType::Inner => write!(f, "INNER JOIN"),
            JoinType::Left => write!(f, "LEFT JOIN"),
            JoinType::Right => write!(f, "RIGHT JOIN"),
            JoinType::Cross => write!(f, "CROSS JOIN"),
        }
    }
}

/// Sort direction for ORDER BY
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderDirection::Asc => write!(f, "ASC"),
            OrderDirection::Desc => write!(f, "DESC"),
        }
    }
}

/// What a FROM or JOIN refers to
#[derive(Debug, Clone)]
pub enum TableSource {
    Name(String),
    Query(Box<AnyQuery>),
}

impl TableSource {
    pub fn table_name(&self) -> Option<&str> {
        match self {
            TableSource::Name(name) => Some(name),
            TableSource::Query(_) => None,
        }
    }
}

/// JOIN clause representation
#[derive(Debug, Clone)]
pub struct JoinClause {
    pub join_type: JoinType,
    pub source: TableSource,
    pub alias: Option<String>,
    pub condition: Option<String>,
    pub params: Params,
}

/// Split `orders o` or `orders AS o` into the table name and its alias.
/// Anything else is kept whole as the table name.
pub(crate) fn split_table_alias(table: &str) -> (String, Option<String>) {
    let parts: Vec<&str> = table.split_whitespace().collect();
    match parts.as_slice() {
        [name, alias] => (name.to_string(), Some(alias.to_string())),
        [name, keyword, alias] if keyword.eq_ignore_ascii_case("as") => {
            (name.to_string(), Some(alias.to_string()))
        }
        [name] => (name.to_string(), None),
        _ => (table.to_string(), None),
    }
}

impl JoinClause {
    /// A join against a named table. The table may carry its alias,
    /// as in `orders o`.
    pub fn new(join_type: JoinType, table: &str, condition: Option<&str>) -> Self {
        let (table, alias) = split_table_alias(table);
        Self {
            join_type,
            source: TableSource::Name(table),
            alias,
            condition: condition.map(str::to_string),
            params: Params::new(),
        }
    }

    pub fn inner(table: &str, condition: &str) -> Self {
        Self::new(JoinType::Inner, table, Some(condition))
    }

    pub fn left(table: &str, condition: &str) -> Self {
        Self::new(JoinType::Left, table, Some(condition))
    }

    pub fn right(table: &str, condition: &str) -> Self {
        Self::new(JoinType::Right, table, Some(condition))
    }

    pub fn cross(table: &str) -> Self {
        Self::new(JoinType::Cross, table, None)
    }

    /// Join against a nested query. The alias is checked at build time.
    pub fn subquery(join_type: JoinType, query: impl Into<AnyQuery>, condition: Option<&str>) -> Self {
        Self {
            join_type,
            source: TableSource::Query(Box::new(query.into())),
            alias: None,
            condition: condition.map(str::to_string),
            params: Params::new(),
        }
    }

    pub fn alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.to_string());
        self
    }

    /// Parameters referenced by the join condition
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Name used to qualify columns of the joined table
    pub fn reference(&self) -> Option<&str> {
        self.alias.as_deref().or_else(|| self.source.table_name())
    }
}

/// Statement kinds produced by the builders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatementKind::Select => write!(f, "SELECT"),
            StatementKind::Insert => write!(f, "INSERT"),
            StatementKind::Update => write!(f, "UPDATE"),
            StatementKind::Delete => write!(f, "DELETE"),
        }
    }
}

/// A built statement: SQL text with `:name` placeholders and their values
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub sql: String,
    pub params: Params,
    pub kind: StatementKind,
}

impl SqlStatement {
    pub fn new(sql: impl Into<String>, params: Params, kind: StatementKind) -> Self {
        Self {
            sql: sql.into(),
            params,
            kind,
        }
    }

    pub fn select(sql: impl Into<String>, params: Params) -> Self {
        Self::new(sql, params, StatementKind::Select)
    }

    /// Only inserts can report a generated key
    pub fn allows_last_insert_id(&self) -> bool {
        self.kind == StatementKind::Insert
    }
}

impl fmt::Display for SqlStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// Common contract of every builder: produce a statement for a dialect.
pub trait Updatable {
    fn build(&self, dialect: Option<&dyn Dialect>) -> OrmResult<SqlStatement>;
}

/// Any query usable as a source (FROM, JOIN, union member, insert-select)
#[derive(Debug, Clone)]
pub enum AnyQuery {
    Basic(QueryBasic),
    Query(Query),
    Raw(QueryRaw),
}

impl AnyQuery {
    pub fn kind_name(&self) -> &'static str {
        match self {
            AnyQuery::Basic(_) => "QueryBasic",
            AnyQuery::Query(_) => "Query",
            AnyQuery::Raw(_) => "QueryRaw",
        }
    }
}

impl Updatable for AnyQuery {
    fn build(&self, dialect: Option<&dyn Dialect>) -> OrmResult<SqlStatement> {
        match self {
            AnyQuery::Basic(query) => query.build(dialect),
            AnyQuery::Query(query) => query.build(dialect),
            AnyQuery::Raw(query) => query.build(dialect),
        }
    }
}

impl From<QueryBasic> for AnyQuery {
    fn from(query: QueryBasic) -> Self {
        AnyQuery::Basic(query)
    }
}

impl From<Query> for AnyQuery {
    fn from(query: Query) -> Self {
        AnyQuery::Query(query)
    }
}

impl From<QueryRaw> for AnyQuery {
    fn from(query: QueryRaw) -> Self {
        AnyQuery::Raw(query)
    }
}
