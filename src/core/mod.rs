//! Core domain types and the abstractions the services are built on

pub mod analytics;
pub mod config;
pub mod connectivity;
pub mod log;
pub mod models;
pub mod network;
pub mod store;

// Re-export main types for cleaner imports
pub use analytics::{AnalyticsEvent, EventQuery, RateEvent, StorageErrorEvent, TrackedEvent};
pub use connectivity::Connectivity;
pub use models::{CurrentBalance, PaginationInfo, Rate};
pub use network::{Endpoint, HttpMethod, NetworkError, RateSource};
pub use store::{RecordStore, StorageError};
