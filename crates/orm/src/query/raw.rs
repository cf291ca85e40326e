//! Hand-written SQL with named parameters

use super::substitution::process_literal;
use super::types::{SqlStatement, StatementKind, Updatable};
use crate::dialect::Dialect;
use crate::error::OrmResult;
use crate::value::Params;

/// SQL text used verbatim. Literal parameters are still inlined.
#[derive(Debug, Clone)]
pub struct QueryRaw {
    sql: String,
    params: Params,
    kind: StatementKind,
}

impl QueryRaw {
    pub fn new(sql: &str, params: Params) -> Self {
        Self {
            sql: sql.to_string(),
            params,
            kind: StatementKind::Select,
        }
    }

    /// Mark the statement as something other than a SELECT.
    pub fn with_kind(mut self, kind: StatementKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &Params {
        &self.params
    }
}

impl Updatable for QueryRaw {
    fn build(&self, _dialect: Option<&dyn Dialect>) -> OrmResult<SqlStatement> {
        let (sql, params) = process_literal(&self.sql, self.params.clone())?;
        tracing::debug!(kind = %self.kind, sql = %sql, "built raw query");
        Ok(SqlStatement::new(sql, params, self.kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::literal::Literal;
    use crate::params;

    #[test]
    fn test_raw_query_keeps_text_and_inlines_literals() {
        let raw = QueryRaw::new(
            "SELECT * FROM logs WHERE created < :now AND level = :level",
            params! { "now" => Literal::new("NOW()"), "level" => "warn" },
        );

        let statement = raw.build(None).unwrap();
        assert_eq!(statement.sql, "SELECT * FROM logs WHERE created < NOW() AND level = :level");
        assert_eq!(statement.params.len(), 1);
        assert_eq!(statement.kind, StatementKind::Select);
    }
}
