//! Analytics event records and the structured events emitted around the rate lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

pub const RATE_UPDATED: &str = "bitcoin_rate_updated";
pub const PERIODIC_UPDATES_STARTED: &str = "bitcoin_rate_periodic_updates_started";
pub const PERIODIC_UPDATES_STOPPED: &str = "bitcoin_rate_periodic_updates_stopped";
pub const FORCE_UPDATE: &str = "bitcoin_rate_force_update";
pub const ONLINE_ATTEMPT: &str = "bitcoin_rate_update_online_attempt";
pub const ONLINE_SUCCESS: &str = "bitcoin_rate_update_online_success";
pub const ONLINE_FAILURE: &str = "bitcoin_rate_update_online_failure";
pub const OFFLINE_SUCCESS: &str = "bitcoin_rate_update_offline_success";
pub const OFFLINE_FAILURE: &str = "bitcoin_rate_update_offline_failure";
pub const STORAGE_ERROR: &str = "storage_error";

/// Parameter every event carries.
pub const TIMESTAMP: &str = "timestamp";

/// A named, timestamped record of a notable action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    pub id: Uuid,
    pub name: String,
    pub parameters: HashMap<String, String>,
    pub occurred_at: DateTime<Utc>,
}

impl AnalyticsEvent {
    pub fn new(name: impl Into<String>, parameters: HashMap<String, String>) -> Self {
        Self::at(name, parameters, Utc::now())
    }

    pub fn at(
        name: impl Into<String>,
        parameters: HashMap<String, String>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            parameters,
            occurred_at,
        }
    }
}

/// Anything that can be turned into an analytics event.
pub trait TrackedEvent {
    fn name(&self) -> &str;
    fn parameters(&self) -> HashMap<String, String>;
}

/// Seconds since the epoch with millisecond precision, e.g. `1760000000.123`.
pub fn epoch_seconds(at: DateTime<Utc>) -> String {
    format!("{:.3}", at.timestamp_millis() as f64 / 1000.0)
}

fn params<const N: usize>(pairs: [(&str, String); N]) -> HashMap<String, String> {
    let mut map: HashMap<String, String> = pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    map.entry(TIMESTAMP.to_string())
        .or_insert_with(|| epoch_seconds(Utc::now()));
    map
}

/// Events emitted by the rate fetcher and repository.
#[derive(Debug, Clone, PartialEq)]
pub enum RateEvent {
    RateUpdated { rate: String },
    PeriodicUpdatesStarted { interval: Duration },
    PeriodicUpdatesStopped,
    ForceUpdate,
    OnlineAttempt,
    OnlineSuccess,
    OnlineFailure { error: String },
    OfflineSuccess { cached_date: DateTime<Utc> },
    OfflineFailure,
}

impl TrackedEvent for RateEvent {
    fn name(&self) -> &str {
        match self {
            RateEvent::RateUpdated { .. } => RATE_UPDATED,
            RateEvent::PeriodicUpdatesStarted { .. } => PERIODIC_UPDATES_STARTED,
            RateEvent::PeriodicUpdatesStopped => PERIODIC_UPDATES_STOPPED,
            RateEvent::ForceUpdate => FORCE_UPDATE,
            RateEvent::OnlineAttempt => ONLINE_ATTEMPT,
            RateEvent::OnlineSuccess => ONLINE_SUCCESS,
            RateEvent::OnlineFailure { .. } => ONLINE_FAILURE,
            RateEvent::OfflineSuccess { .. } => OFFLINE_SUCCESS,
            RateEvent::OfflineFailure => OFFLINE_FAILURE,
        }
    }

    fn parameters(&self) -> HashMap<String, String> {
        match self {
            RateEvent::RateUpdated { rate } => params([("rate", rate.clone())]),
            RateEvent::PeriodicUpdatesStarted { interval } => params([(
                "interval_seconds",
                format!("{:.1}", interval.as_secs_f64()),
            )]),
            RateEvent::PeriodicUpdatesStopped
            | RateEvent::ForceUpdate
            | RateEvent::OnlineAttempt => params([]),
            RateEvent::OnlineSuccess => params([("source", "internet".to_string())]),
            RateEvent::OnlineFailure { error } => params([
                ("source", "internet".to_string()),
                ("error", error.clone()),
            ]),
            RateEvent::OfflineSuccess { cached_date } => params([
                ("source", "cached".to_string()),
                ("cached_date", epoch_seconds(*cached_date)),
            ]),
            RateEvent::OfflineFailure => params([
                ("source", "cached".to_string()),
                ("error", "no_cached_rate_available".to_string()),
            ]),
        }
    }
}

/// A failed storage operation, recorded instead of being propagated.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageErrorEvent {
    pub operation: String,
    pub error: String,
    pub extra: HashMap<String, String>,
}

impl StorageErrorEvent {
    pub fn new(operation: impl Into<String>, error: impl ToString) -> Self {
        Self {
            operation: operation.into(),
            error: error.to_string(),
            extra: HashMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.extra.insert(key.to_string(), value.to_string());
        self
    }
}

impl TrackedEvent for StorageErrorEvent {
    fn name(&self) -> &str {
        STORAGE_ERROR
    }

    fn parameters(&self) -> HashMap<String, String> {
        let mut map = params([
            ("operation", self.operation.clone()),
            ("error", self.error.clone()),
        ]);
        map.extend(self.extra.clone());
        map
    }
}

/// Filter for event retrieval. All provided filters are ANDed; bounds are inclusive.
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
    pub name: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl EventQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::default().name(name)
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn from(mut self, from: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self
    }

    pub fn to(mut self, to: DateTime<Utc>) -> Self {
        self.to = Some(to);
        self
    }

    pub fn matches(&self, event: &AnalyticsEvent) -> bool {
        // an empty name means no name filter
        let name_ok = match self.name.as_deref() {
            Some(name) if !name.is_empty() => event.name == name,
            _ => true,
        };
        name_ok
            && self.from.is_none_or(|from| event.occurred_at >= from)
            && self.to.is_none_or(|to| event.occurred_at <= to)
    }
}
