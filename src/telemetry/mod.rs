//! In-process audit trail of analytics events

pub mod event_log;
pub mod storage;

pub use event_log::EventLog;
pub use storage::{DEFAULT_MAX_EVENTS, EventStorage, InMemoryEventStorage};
