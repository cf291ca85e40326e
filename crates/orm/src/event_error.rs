use thiserror::Error;

/// Failure raised by an observer while processing a table event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    #[error("Validation error: {message}{}", hint_suffix(.hint))]
    Validation {
        message: String,
        hint: Option<String>,
    },
    #[error("Database error: {message}")]
    Database { message: String },
    #[error("Observer error: {message}")]
    Observer { message: String },
    #[error("Observer for '{table}' is already registered")]
    DuplicateObserver { table: String },
}

fn hint_suffix(hint: &Option<String>) -> String {
    hint.as_ref()
        .map(|h| format!(" (hint: {})", h))
        .unwrap_or_default()
}

impl EventError {
    pub fn validation(message: &str) -> Self {
        Self::Validation {
            message: message.to_string(),
            hint: None,
        }
    }

    pub fn validation_with_hint(message: &str, hint: &str) -> Self {
        Self::Validation {
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    pub fn database(message: &str) -> Self {
        Self::Database {
            message: message.to_string(),
        }
    }

    pub fn observer(message: &str) -> Self {
        Self::Observer {
            message: message.to_string(),
        }
    }

    pub fn duplicate(table: &str) -> Self {
        Self::DuplicateObserver {
            table: table.to_string(),
        }
    }
}

impl From<sqlx::Error> for EventError {
    fn from(err: sqlx::Error) -> Self {
        Self::database(&err.to_string())
    }
}

impl From<crate::error::ModelError> for EventError {
    fn from(err: crate::error::ModelError) -> Self {
        match err {
            crate::error::ModelError::Event(inner) => inner,
            crate::error::ModelError::Database(message) => Self::Database { message },
            other => Self::observer(&other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;

    #[test]
    fn test_event_error_validation_with_hint() {
        let error = EventError::validation_with_hint("Invalid total", "Use a positive amount");

        match &error {
            EventError::Validation { message, hint } => {
                assert_eq!(message, "Invalid total");
                assert_eq!(hint.as_deref(), Some("Use a positive amount"));
            }
            _ => panic!("Expected validation error"),
        }
        assert_eq!(
            error.to_string(),
            "Validation error: Invalid total (hint: Use a positive amount)"
        );
    }

    #[test]
    fn test_event_error_from_model_error() {
        let error: EventError = ModelError::Database("connection reset".into()).into();
        assert_eq!(error, EventError::database("connection reset"));

        let error: EventError = ModelError::ReadOnly("audit".into()).into();
        assert!(matches!(error, EventError::Observer { .. }));
    }
}
