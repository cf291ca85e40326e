//! Table-keyed registry that notifies observers of entity changes

use std::sync::Arc;

use dashmap::DashMap;

use crate::event_error::EventError;
use crate::events::{Observer, ObserverData};

/// In-process change bus keyed by table name.
///
/// Observers are called one after another in registration order. A failing
/// observer gets its own `on_error` call and the remaining observers still
/// run.
#[derive(Default, Clone)]
pub struct OrmSubject {
    observers: Arc<DashMap<String, Vec<Arc<dyn Observer>>>>,
}

impl OrmSubject {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer for its `observed_table`. Registering the same
    /// observer twice is an error.
    pub fn add_observer(&self, observer: Arc<dyn Observer>) -> Result<(), EventError> {
        let table = observer.observed_table().to_string();
        let mut entry = self.observers.entry(table.clone()).or_default();
        if entry.iter().any(|existing| Arc::ptr_eq(existing, &observer)) {
            return Err(EventError::duplicate(&table));
        }
        entry.push(observer);
        Ok(())
    }

    pub fn remove_observer(&self, observer: &Arc<dyn Observer>) -> bool {
        let Some(mut entry) = self.observers.get_mut(observer.observed_table()) else {
            return false;
        };
        let before = entry.len();
        entry.retain(|existing| !Arc::ptr_eq(existing, observer));
        before != entry.len()
    }

    pub fn observer_count(&self, table: &str) -> usize {
        self.observers.get(table).map(|o| o.len()).unwrap_or(0)
    }

    pub async fn notify(&self, data: &ObserverData) {
        // Clone the list so no map guard is held across an await point
        let observers: Vec<Arc<dyn Observer>> = match self.observers.get(&data.table) {
            Some(entry) => entry.clone(),
            None => return,
        };

        tracing::debug!(
            table = %data.table,
            event = %data.event,
            observers = observers.len(),
            "notifying observers"
        );

        for observer in observers {
            if let Err(error) = observer.process(data).await {
                tracing::warn!(
                    table = %data.table,
                    event = %data.event,
                    error = %error,
                    "observer failed, routing to on_error"
                );
                observer.on_error(&error, data).await;
            }
        }
    }
}

impl std::fmt::Debug for OrmSubject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tables: Vec<String> = self.observers.iter().map(|e| e.key().clone()).collect();
        f.debug_struct("OrmSubject").field("tables", &tables).finish()
    }
}
