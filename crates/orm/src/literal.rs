//! Raw SQL literals
//!
//! A [`Literal`] stored in a parameter map is never bound: every placeholder
//! that references it is replaced by its text when a statement is built.

use std::fmt;

use uuid::Uuid;

use crate::dialect::Dialect;
use crate::error::{ModelError, OrmResult};

/// Raw SQL text that is substituted into the statement instead of bound.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Literal(String);

impl Literal {
    pub fn new(sql: impl Into<String>) -> Self {
        Self(sql.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::new(value)
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal(value)
    }
}

/// Helpers for UUIDs stored as 16-byte binary columns.
///
/// Writes go through a dialect-rendered hex literal, reads come back as
/// upper-case hyphenated strings.
pub struct HexUuidLiteral;

impl HexUuidLiteral {
    /// Build a binary literal from a UUID string in any accepted notation.
    pub fn from_uuid_str(value: &str, dialect: Option<&dyn Dialect>) -> OrmResult<Literal> {
        let uuid = Uuid::parse_str(value.trim())?;
        Ok(Self::from_uuid(&uuid, dialect))
    }

    pub fn from_uuid(uuid: &Uuid, dialect: Option<&dyn Dialect>) -> Literal {
        let hex = uuid.simple().to_string().to_uppercase();
        match dialect {
            Some(dialect) => Literal::new(dialect.hex_literal(&hex)),
            None => Literal::new(format!("X'{}'", hex)),
        }
    }

    pub fn from_bytes(bytes: &[u8], dialect: Option<&dyn Dialect>) -> OrmResult<Literal> {
        let uuid = Uuid::from_slice(bytes)?;
        Ok(Self::from_uuid(&uuid, dialect))
    }

    /// Format 16 raw bytes as `XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX`.
    pub fn format_bytes(bytes: &[u8]) -> OrmResult<String> {
        if bytes.len() != 16 {
            return Err(ModelError::Mapping(format!(
                "binary uuid must be 16 bytes, got {}",
                bytes.len()
            )));
        }
        let uuid = Uuid::from_slice(bytes)?;
        Ok(Self::format_uuid(&uuid))
    }

    pub fn format_uuid(uuid: &Uuid) -> String {
        uuid.hyphenated().to_string().to_uppercase()
    }

    /// Canonical form of a UUID string, upper-case and hyphenated.
    pub fn normalize(value: &str) -> OrmResult<String> {
        let uuid = Uuid::parse_str(value.trim())?;
        Ok(Self::format_uuid(&uuid))
    }

    pub fn generate() -> String {
        Self::format_uuid(&Uuid::new_v4())
    }
}
