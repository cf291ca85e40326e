//! SQL dialect helpers
//!
//! Builders stay dialect-neutral until `build`. Anything that differs
//! between databases (identifier quoting, TOP/LIMIT, FOR UPDATE, the current
//! timestamp, binary literals) is rendered through a [`Dialect`].

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Database-specific SQL rendering.
pub trait Dialect: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// Quote a table name, keeping `schema.table` qualifiers.
    fn delimit_table(&self, table: &str) -> String;

    /// Quote a column name, keeping `table.column` qualifiers.
    fn delimit_field(&self, field: &str) -> String;

    /// Apply `TOP n` to a complete SELECT statement.
    fn top(&self, sql: &str, count: u64) -> String;

    /// Apply a row window of `count` rows after skipping `offset` rows.
    fn limit(&self, sql: &str, offset: u64, count: u64) -> String;

    /// Apply row locking to a complete SELECT statement.
    fn for_update(&self, sql: &str) -> String;

    /// SQL expression for the current timestamp.
    fn now(&self) -> String;

    /// Binary literal for an upper-case hex string.
    fn hex_literal(&self, hex: &str) -> String;
}

/// SQL dialect enumeration for generating database-specific SQL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlDialect {
    #[default]
    #[serde(alias = "postgres")]
    PostgreSQL,
    MySQL,
    SQLite,
}

impl SqlDialect {
    /// Get the quote character for identifiers in this dialect
    pub fn identifier_quote(&self) -> char {
        match self {
            SqlDialect::PostgreSQL => '"',
            SqlDialect::MySQL => '`',
            SqlDialect::SQLite => '"',
        }
    }

    /// URL schemes accepted for connections in this dialect
    pub fn url_schemes(&self) -> &'static [&'static str] {
        match self {
            SqlDialect::PostgreSQL => &["postgres", "postgresql"],
            SqlDialect::MySQL => &["mysql", "mariadb"],
            SqlDialect::SQLite => &["sqlite"],
        }
    }
}

impl Dialect for SqlDialect {
    fn name(&self) -> &'static str {
        match self {
            SqlDialect::PostgreSQL => "postgresql",
            SqlDialect::MySQL => "mysql",
            SqlDialect::SQLite => "sqlite",
        }
    }

    fn delimit_table(&self, table: &str) -> String {
        crate::security::escape_identifier_with(table, self.identifier_quote())
    }

    fn delimit_field(&self, field: &str) -> String {
        crate::security::escape_identifier_with(field, self.identifier_quote())
    }

    fn top(&self, sql: &str, count: u64) -> String {
        // None of the supported dialects has TOP; LIMIT is equivalent.
        self.limit(sql, 0, count)
    }

    fn limit(&self, sql: &str, offset: u64, count: u64) -> String {
        match self {
            SqlDialect::PostgreSQL => {
                if offset == 0 {
                    format!("{} LIMIT {}", sql, count)
                } else {
                    format!("{} LIMIT {} OFFSET {}", sql, count, offset)
                }
            }
            SqlDialect::MySQL | SqlDialect::SQLite => {
                if offset == 0 {
                    format!("{} LIMIT {}", sql, count)
                } else {
                    format!("{} LIMIT {}, {}", sql, offset, count)
                }
            }
        }
    }

    fn for_update(&self, sql: &str) -> String {
        match self {
            // SQLite locks the whole database on write; no row locking clause.
            SqlDialect::SQLite => sql.to_string(),
            SqlDialect::PostgreSQL | SqlDialect::MySQL => format!("{} FOR UPDATE", sql),
        }
    }

    fn now(&self) -> String {
        match self {
            SqlDialect::PostgreSQL => "NOW()".to_string(),
            SqlDialect::MySQL => "CURRENT_TIMESTAMP".to_string(),
            SqlDialect::SQLite => "datetime('now')".to_string(),
        }
    }

    fn hex_literal(&self, hex: &str) -> String {
        match self {
            SqlDialect::PostgreSQL => format!("decode('{}', 'hex')", hex),
            SqlDialect::MySQL | SqlDialect::SQLite => format!("X'{}'", hex),
        }
    }
}

impl fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SqlDialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgresql" | "postgres" | "pg" => Ok(SqlDialect::PostgreSQL),
            "mysql" | "mariadb" => Ok(SqlDialect::MySQL),
            "sqlite" => Ok(SqlDialect::SQLite),
            _ => Err(format!("Unsupported SQL dialect: {}", s)),
        }
    }
}
