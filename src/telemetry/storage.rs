use crate::core::analytics::AnalyticsEvent;
use std::collections::VecDeque;
use std::sync::RwLock;
use tracing::warn;

pub const DEFAULT_MAX_EVENTS: usize = 10_000;

/// Backing store for analytics events.
pub trait EventStorage: Send + Sync {
    fn save(&self, event: AnalyticsEvent);
    /// All events in insertion order, oldest first.
    fn snapshot(&self) -> Vec<AnalyticsEvent>;
    fn clear(&self);
    fn count(&self) -> usize;
}

/// Bounded in-memory storage; inserting beyond the cap evicts the oldest events
/// under the same write lock.
pub struct InMemoryEventStorage {
    events: RwLock<VecDeque<AnalyticsEvent>>,
    max_events: usize,
}

impl InMemoryEventStorage {
    pub fn new(max_events: usize) -> Self {
        Self {
            events: RwLock::new(VecDeque::new()),
            max_events,
        }
    }
}

impl Default for InMemoryEventStorage {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_EVENTS)
    }
}

impl EventStorage for InMemoryEventStorage {
    fn save(&self, event: AnalyticsEvent) {
        // a panicking writer cannot leave the deque half-updated, so keep going
        let mut events = self.events.write().unwrap_or_else(|e| e.into_inner());
        events.push_back(event);
        if events.len() > self.max_events {
            let excess = events.len() - self.max_events;
            events.drain(..excess);
        }
    }

    fn snapshot(&self) -> Vec<AnalyticsEvent> {
        match self.events.read() {
            Ok(events) => events.iter().cloned().collect(),
            Err(e) => {
                warn!("Event storage lock poisoned, reading anyway");
                e.into_inner().iter().cloned().collect()
            }
        }
    }

    fn clear(&self) {
        self.events
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    fn count(&self) -> usize {
        self.events.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}
