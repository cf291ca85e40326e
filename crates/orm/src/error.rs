//! Error types for the ORM system
//!
//! Provides error handling for query building, relationship resolution,
//! entity mapping and repository operations.

use thiserror::Error;

pub use crate::event_error::EventError;

/// Result type alias for model operations
pub type ModelResult<T> = Result<T, ModelError>;

/// ORM error type alias
pub type OrmError = ModelError;

/// ORM result type alias
pub type OrmResult<T> = ModelResult<T>;

/// Error types for ORM operations
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    /// Database connection or statement error
    #[error("Database error: {0}")]
    Database(String),
    /// Row not found in database
    #[error("Record not found in table '{0}'")]
    NotFound(String),
    /// A builder was asked to produce malformed SQL
    #[error(transparent)]
    Query(#[from] QueryError),
    /// Relationship graph could not satisfy a request
    #[error(transparent)]
    Relationship(#[from] RelationshipError),
    /// Observer failure surfaced outside of the subject
    #[error(transparent)]
    Event(#[from] EventError),
    /// A field transform or row conversion failed
    #[error("Mapping error: {0}")]
    Mapping(String),
    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// An update constraint rejected the change
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
    /// Write attempted through a read-only repository
    #[error("Repository for table '{0}' is read-only")]
    ReadOnly(String),
    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// Primary key is missing or invalid
    #[error("Invalid key error: {0}")]
    InvalidKey(String),
    /// Mapper or identifier validation failed
    #[error("Validation error: {0}")]
    Validation(String),
}

impl ModelError {
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, ModelError::ConstraintViolation(_))
    }

    pub fn is_read_only(&self) -> bool {
        matches!(self, ModelError::ReadOnly(_))
    }

    /// True when the error was raised while building a statement.
    pub fn is_build_error(&self) -> bool {
        matches!(self, ModelError::Query(_))
    }
}

// Convert from sqlx errors
impl From<sqlx::Error> for ModelError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ModelError::NotFound("unknown".to_string()),
            other => ModelError::Database(other.to_string()),
        }
    }
}

// Convert from serde_json errors
impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Serialization(err.to_string())
    }
}

impl From<uuid::Error> for ModelError {
    fn from(err: uuid::Error) -> Self {
        ModelError::Mapping(format!("invalid uuid: {}", err))
    }
}

/// Error types for query builder operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("{0} statement requires a WHERE clause")]
    MissingWhere(&'static str),
    #[error("Missing fields: {0}")]
    MissingFields(String),
    #[error("TOP and LIMIT cannot be combined")]
    TopAndLimit,
    #[error("{0} requires a dialect")]
    MissingDialect(&'static str),
    #[error("Subquery used as {0} requires an alias")]
    MissingAlias(&'static str),
    #[error("Union members must be basic queries, got {0}")]
    InvalidUnionMember(&'static str),
    #[error("Union requires at least one query")]
    EmptyUnion,
    #[error("Insert-select requires exactly one source query")]
    InvalidSource,
    #[error("Bulk insert row {row}: {message}")]
    BulkRowMismatch { row: usize, message: String },
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Invalid SQL: {0}")]
    InvalidSql(String),
}

/// Error types for relationship operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelationshipError {
    #[error("No relationship path between '{from}' and '{to}'")]
    NoPath { from: String, to: String },
    #[error("Relationship '{0}' has no resolved primary key")]
    IncompleteRelationship(String),
    #[error("At least one table is required")]
    NoTables,
    #[error("Invalid relationship configuration: {0}")]
    InvalidConfiguration(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_error_converts_to_build_error() {
        let err: ModelError = QueryError::MissingWhere("UPDATE").into();
        assert!(err.is_build_error());
        assert_eq!(err.to_string(), "UPDATE statement requires a WHERE clause");
    }

    #[test]
    fn test_error_kinds_are_distinct() {
        let constraint = ModelError::ConstraintViolation("email".into());
        let read_only = ModelError::ReadOnly("audit".into());

        assert!(constraint.is_constraint_violation());
        assert!(!constraint.is_read_only());
        assert!(read_only.is_read_only());
        assert!(!read_only.is_build_error());
    }

    #[test]
    fn test_relationship_error_display() {
        let err = RelationshipError::NoPath {
            from: "users".into(),
            to: "invoices".into(),
        };
        assert_eq!(
            err.to_string(),
            "No relationship path between 'users' and 'invoices'"
        );
    }
}
