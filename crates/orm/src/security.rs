//! Security utilities for SQL injection prevention
//!
//! This module provides functions for:
//! - Escaping SQL identifiers (table names, column names)
//! - Validating identifier names handed to mappers
//! - Quoting string literals for the inline bulk insert mode

use crate::error::ModelError;

/// Characters allowed in SQL identifiers (alphanumeric, underscore, dollar)
const ALLOWED_IDENTIFIER_CHARS: &str =
    "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789_$";

/// Statement keywords rejected as bare identifiers
static SQL_KEYWORDS: &[&str] = &[
    "SELECT", "INSERT", "UPDATE", "DELETE", "FROM", "WHERE", "JOIN", "UNION", "DROP", "CREATE",
    "ALTER", "GRANT", "REVOKE", "TRUNCATE", "EXEC", "EXECUTE", "DECLARE",
];

/// Escape a SQL identifier (table name, column name, etc.) with double quotes
///
/// # Examples
/// ```
/// use micro_orm::security::escape_identifier;
///
/// assert_eq!(escape_identifier("user_table"), "\"user_table\"");
/// assert_eq!(escape_identifier("public.users"), "\"public\".\"users\"");
/// ```
pub fn escape_identifier(identifier: &str) -> String {
    escape_identifier_with(identifier, '"')
}

/// Escape a possibly qualified identifier with the given quote character.
///
/// Each dot-separated segment is quoted on its own; quote characters inside
/// a segment are doubled and a `*` segment is left bare.
pub fn escape_identifier_with(identifier: &str, quote: char) -> String {
    let doubled = format!("{}{}", quote, quote);
    identifier
        .split('.')
        .map(|segment| {
            if segment == "*" {
                segment.to_string()
            } else {
                format!(
                    "{}{}{}",
                    quote,
                    segment.replace(quote, &doubled),
                    quote
                )
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Validate that an identifier is safe for use in SQL
///
/// Qualified names (`schema.table`) are validated segment by segment.
pub fn validate_identifier(identifier: &str) -> Result<(), ModelError> {
    if identifier.is_empty() {
        return Err(ModelError::Validation(
            "Identifier cannot be empty".to_string(),
        ));
    }

    for segment in identifier.split('.') {
        validate_segment(identifier, segment)?;
    }

    Ok(())
}

fn validate_segment(identifier: &str, segment: &str) -> Result<(), ModelError> {
    let first = match segment.chars().next() {
        Some(c) => c,
        None => {
            return Err(ModelError::Validation(format!(
                "Identifier '{}' has an empty segment",
                identifier
            )))
        }
    };

    // PostgreSQL limit is 63 characters
    if segment.len() > 63 {
        return Err(ModelError::Validation(format!(
            "Identifier '{}' is too long (max 63 characters)",
            identifier
        )));
    }

    if let Some(c) = segment.chars().find(|c| !ALLOWED_IDENTIFIER_CHARS.contains(*c)) {
        return Err(ModelError::Validation(format!(
            "Identifier '{}' contains invalid character '{}'",
            identifier, c
        )));
    }

    if first.is_ascii_digit() {
        return Err(ModelError::Validation(format!(
            "Identifier '{}' cannot start with a number",
            identifier
        )));
    }

    if SQL_KEYWORDS.contains(&segment.to_uppercase().as_str()) {
        return Err(ModelError::Validation(format!(
            "Identifier '{}' is a reserved SQL keyword",
            identifier
        )));
    }

    Ok(())
}

/// Quote a value as a SQL string literal, doubling embedded single quotes.
pub fn quote_string_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
