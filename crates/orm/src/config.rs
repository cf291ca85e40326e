//! ORM configuration
//!
//! Loaded from environment variables with [`OrmConfig::from_env`], or
//! deserialized by the host from its own configuration file.

use std::env;

use serde::Deserialize;
use thiserror::Error;

use crate::dialect::SqlDialect;
use crate::error::ModelError;
use crate::query::InsertBulkQuery;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for field '{field}': '{value}'. Expected: {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },
}

impl From<ConfigError> for ModelError {
    fn from(err: ConfigError) -> Self {
        ModelError::Configuration(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OrmConfig {
    pub dialect: SqlDialect,
    pub database_url: Option<String>,
    pub max_connections: u32,
    /// Let bulk inserts inline values instead of binding them
    pub bulk_insert_inline: bool,
}

impl Default for OrmConfig {
    fn default() -> Self {
        Self {
            dialect: SqlDialect::PostgreSQL,
            database_url: None,
            max_connections: 10,
            bulk_insert_inline: false,
        }
    }
}

impl OrmConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `ORM_DIALECT`, `DATABASE_URL`, `ORM_MAX_CONNECTIONS` and
    /// `ORM_BULK_INSERT_INLINE`. Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from any key lookup, using the same keys as [`from_env`](Self::from_env)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new();

        if let Some(dialect) = lookup("ORM_DIALECT") {
            config.dialect = dialect.parse().map_err(|_| ConfigError::InvalidValue {
                field: "dialect".to_string(),
                value: dialect.clone(),
                expected: "postgresql, mysql or sqlite".to_string(),
            })?;
        }

        config.database_url = lookup("DATABASE_URL");

        if let Some(max) = lookup("ORM_MAX_CONNECTIONS") {
            config.max_connections = max.parse().map_err(|_| ConfigError::InvalidValue {
                field: "max_connections".to_string(),
                value: max.clone(),
                expected: "positive integer".to_string(),
            })?;
        }

        if let Some(inline) = lookup("ORM_BULK_INSERT_INLINE") {
            config.bulk_insert_inline = match inline.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "bulk_insert_inline".to_string(),
                        value: inline,
                        expected: "true or false".to_string(),
                    })
                }
            };
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_connections".to_string(),
                value: "0".to_string(),
                expected: "positive integer".to_string(),
            });
        }

        if let Some(database_url) = &self.database_url {
            let invalid = |expected: String| ConfigError::InvalidValue {
                field: "database_url".to_string(),
                value: database_url.clone(),
                expected,
            };
            let parsed = url::Url::parse(database_url).map_err(|e| invalid(format!("valid URL ({})", e)))?;
            let schemes = self.dialect.url_schemes();
            if !schemes.contains(&parsed.scheme()) {
                return Err(invalid(format!("{}:// URL for {}", schemes[0], self.dialect)));
            }
        }

        Ok(())
    }

    /// Bulk insert builder honouring `bulk_insert_inline`
    pub fn bulk_insert(&self, table: &str, columns: &[&str]) -> InsertBulkQuery {
        let query = InsertBulkQuery::new(table, columns);
        if self.bulk_insert_inline {
            query.allow_inline_values()
        } else {
            query
        }
    }

    pub fn require_database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .ok_or_else(|| ConfigError::MissingRequired {
                field: "database_url".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = OrmConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, OrmConfig::default());
        assert!(!config.bulk_insert_inline);
        assert!(config.require_database_url().is_err());
    }

    #[test]
    fn test_full_lookup() {
        let config = OrmConfig::from_lookup(lookup(&[
            ("ORM_DIALECT", "mysql"),
            ("DATABASE_URL", "mysql://root@localhost/shop"),
            ("ORM_MAX_CONNECTIONS", "4"),
            ("ORM_BULK_INSERT_INLINE", "true"),
        ]))
        .unwrap();

        assert_eq!(config.dialect, SqlDialect::MySQL);
        assert_eq!(config.max_connections, 4);
        assert!(config.bulk_insert_inline);
        assert_eq!(config.require_database_url().unwrap(), "mysql://root@localhost/shop");
    }

    #[test]
    fn test_invalid_values() {
        let err = OrmConfig::from_lookup(lookup(&[("ORM_MAX_CONNECTIONS", "many")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "max_connections"));

        let err = OrmConfig::from_lookup(lookup(&[("ORM_DIALECT", "oracle")])).unwrap_err();
        assert!(err.to_string().contains("dialect"));
    }

    #[test]
    fn test_url_scheme_must_match_dialect() {
        let err = OrmConfig::from_lookup(lookup(&[("DATABASE_URL", "mysql://localhost/db")])).unwrap_err();
        assert!(err.to_string().contains("postgres://"));

        assert!(OrmConfig::from_lookup(lookup(&[("DATABASE_URL", "postgresql://localhost/db")])).is_ok());
    }

    #[test]
    fn test_bulk_insert_follows_inline_flag() {
        use crate::params;
        use crate::query::Updatable;

        let row = params! { "name" => "Ann" };
        let safe = OrmConfig::new()
            .bulk_insert("users", &["name"])
            .add_row(row.clone())
            .build(None)
            .unwrap();
        assert_eq!(safe.sql, "INSERT INTO users (name) VALUES (:p0_0)");

        let config = OrmConfig {
            bulk_insert_inline: true,
            ..OrmConfig::default()
        };
        let inline = config.bulk_insert("users", &["name"]).add_row(row).build(None).unwrap();
        assert_eq!(inline.sql, "INSERT INTO users (name) VALUES ('Ann')");
    }

    #[test]
    fn test_deserialize_partial() {
        let config: OrmConfig = serde_json::from_str(r#"{"dialect": "sqlite"}"#).unwrap();
        assert_eq!(config.dialect, SqlDialect::SQLite);
        assert_eq!(config.max_connections, 10);
    }
}
