use super::storage::{EventStorage, InMemoryEventStorage};
use crate::core::analytics::{AnalyticsEvent, EventQuery, TrackedEvent};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Thread-safe, bounded, append-only log of analytics events.
///
/// Cloning is cheap and every clone writes to the same storage.
#[derive(Clone)]
pub struct EventLog {
    storage: Arc<dyn EventStorage>,
}

impl EventLog {
    pub fn new(max_events: usize) -> Self {
        Self::with_storage(Arc::new(InMemoryEventStorage::new(max_events)))
    }

    pub fn with_storage(storage: Arc<dyn EventStorage>) -> Self {
        Self { storage }
    }

    pub fn record(&self, name: &str, parameters: HashMap<String, String>) {
        if name.is_empty() {
            warn!(?parameters, "Dropping analytics event without a name");
            return;
        }
        let event = AnalyticsEvent::new(name, parameters);
        debug!(event = %event.name, parameters = ?event.parameters, "Analytics event");
        self.storage.save(event);
    }

    pub fn record_event(&self, event: &impl TrackedEvent) {
        self.record(event.name(), event.parameters());
    }

    /// Matching events, newest first.
    pub fn query(&self, query: &EventQuery) -> Vec<AnalyticsEvent> {
        // reversed insertion order keeps same-instant events newest first after the stable sort
        let mut events: Vec<_> = self
            .storage
            .snapshot()
            .into_iter()
            .rev()
            .filter(|e| query.matches(e))
            .collect();
        events.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
        events
    }

    pub fn events(&self) -> Vec<AnalyticsEvent> {
        self.query(&EventQuery::all())
    }

    pub fn event_count(&self) -> usize {
        self.storage.count()
    }

    pub fn clear(&self) {
        self.storage.clear();
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::with_storage(Arc::new(InMemoryEventStorage::default()))
    }
}
