//! Observer contract and the change data passed to observers

use std::fmt;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::event_error::EventError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObserverEvent {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for ObserverEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObserverEvent::Insert => write!(f, "insert"),
            ObserverEvent::Update => write!(f, "update"),
            ObserverEvent::Delete => write!(f, "delete"),
        }
    }
}

/// A change published for one table.
///
/// `data` is the row after the write (absent for deletes), `old_data` the
/// row before it (absent for inserts).
#[derive(Debug, Clone, PartialEq)]
pub struct ObserverData {
    pub table: String,
    pub event: ObserverEvent,
    pub data: Option<JsonValue>,
    pub old_data: Option<JsonValue>,
}

impl ObserverData {
    pub fn new(table: &str, event: ObserverEvent) -> Self {
        Self {
            table: table.to_string(),
            event,
            data: None,
            old_data: None,
        }
    }

    pub fn with_data(mut self, data: JsonValue) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_old_data(mut self, old_data: JsonValue) -> Self {
        self.old_data = Some(old_data);
        self
    }
}

#[async_trait]
pub trait Observer: Send + Sync {
    /// Table whose changes this observer receives
    fn observed_table(&self) -> &str;

    async fn process(&self, data: &ObserverData) -> Result<(), EventError>;

    /// Called with the error `process` returned. The failure never reaches
    /// the code that published the change.
    async fn on_error(&self, error: &EventError, data: &ObserverData) {
        tracing::warn!(
            table = %data.table,
            event = %data.event,
            error = %error,
            "observer failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone)]
    struct TestObserver {
        events: Arc<Mutex<Vec<String>>>,
    }

    impl TestObserver {
        fn new() -> Self {
            Self {
                events: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn get_events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Observer for TestObserver {
        fn observed_table(&self) -> &str {
            "users"
        }

        async fn process(&self, data: &ObserverData) -> Result<(), EventError> {
            let name = data
                .data
                .as_ref()
                .and_then(|d| d["name"].as_str())
                .unwrap_or("-")
                .to_string();
            self.events
                .lock()
                .unwrap()
                .push(format!("{}: {}", data.event, name));
            Ok(())
        }
    }

    #[test]
    fn test_observer_data_builder() {
        let data = ObserverData::new("users", ObserverEvent::Update)
            .with_data(json!({"name": "new"}))
            .with_old_data(json!({"name": "old"}));

        assert_eq!(data.table, "users");
        assert_eq!(data.event, ObserverEvent::Update);
        assert_eq!(data.old_data, Some(json!({"name": "old"})));
    }

    #[test]
    fn test_event_display() {
        assert_eq!(ObserverEvent::Insert.to_string(), "insert");
        assert_eq!(ObserverEvent::Delete.to_string(), "delete");
    }

    #[tokio::test]
    async fn test_observer_process() {
        let observer = TestObserver::new();
        let data = ObserverData::new("users", ObserverEvent::Insert).with_data(json!({"name": "Ann"}));

        observer.process(&data).await.unwrap();
        observer
            .process(&ObserverData::new("users", ObserverEvent::Delete))
            .await
            .unwrap();

        assert_eq!(observer.get_events(), vec!["insert: Ann", "delete: -"]);
    }

    #[tokio::test]
    async fn test_default_on_error_is_silent() {
        let observer = TestObserver::new();
        let data = ObserverData::new("users", ObserverEvent::Insert);
        observer
            .on_error(&EventError::observer("boom"), &data)
            .await;
        assert!(observer.get_events().is_empty());
    }
}
