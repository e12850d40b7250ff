//! Best-effort persistence for rates and the balance singleton.
//!
//! Backend failures never reach the caller: each one is turned into a
//! `storage_error` analytics event and the call yields an empty result.

use crate::core::analytics::StorageErrorEvent;
use crate::core::models::{CurrentBalance, Rate};
use crate::core::store::{RecordStore, StorageError};
use crate::telemetry::EventLog;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;

#[derive(Clone)]
pub struct PersistentCache {
    store: Arc<dyn RecordStore>,
    events: EventLog,
}

impl PersistentCache {
    pub fn new(store: Arc<dyn RecordStore>, events: EventLog) -> Self {
        Self { store, events }
    }

    /// Logs a failed operation and hands back `None`.
    fn absorb<T>(
        &self,
        operation: &str,
        result: Result<T, StorageError>,
        extra: &[(&str, String)],
    ) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                error!(operation, error = %e, "Storage operation failed");
                let event = extra.iter().fold(
                    StorageErrorEvent::new(operation, &e),
                    |event, (key, value)| event.with(key, value),
                );
                self.events.record_event(&event);
                None
            }
        }
    }

    pub fn latest_rate(&self) -> Option<Rate> {
        let rate = self
            .absorb("latest_rate", self.store.latest_rate(), &[])
            .flatten();
        debug!(hit = rate.is_some(), "Cache lookup for latest rate");
        rate
    }

    pub fn rates(&self) -> Vec<Rate> {
        self.absorb("rates", self.store.rates(), &[])
            .unwrap_or_default()
    }

    pub fn put_rate(&self, rate: &Rate) {
        self.absorb(
            "put_rate",
            self.store.append_rate(rate),
            &[("rate_id", rate.id().to_string())],
        );
    }

    pub fn delete_rate(&self, id: Uuid) {
        self.absorb(
            "delete_rate",
            self.store.delete_rate(id),
            &[("rate_id", id.to_string())],
        );
    }

    pub fn clear_rates(&self) {
        self.absorb("clear_rates", self.store.clear_rates(), &[]);
    }

    pub fn balance(&self) -> Option<CurrentBalance> {
        self.absorb("balance", self.store.balance(), &[]).flatten()
    }

    pub fn save_balance(&self, balance: &CurrentBalance) {
        self.absorb(
            "save_balance",
            self.store.save_balance(balance),
            &[("balance", balance.balance.to_string())],
        );
    }

    /// Deposits (positive) or withdraws (negative) `delta`, creating the singleton
    /// when absent. Returns the new balance, or `None` if the write failed.
    pub fn adjust_balance(&self, delta: Decimal) -> Option<CurrentBalance> {
        self.absorb(
            "adjust_balance",
            self.store.adjust_balance(delta),
            &[("amount", delta.to_string())],
        )
    }

    pub fn clear_balance(&self) {
        self.absorb("clear_balance", self.store.clear_balance(), &[]);
    }
}
