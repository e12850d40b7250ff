use crate::core::models::{CurrentBalance, Rate};
use crate::core::store::{RecordStore, StorageError};
use rust_decimal::Decimal;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

#[derive(Default)]
struct Records {
    rates: Vec<Rate>,
    balance: Option<CurrentBalance>,
}

/// Non-durable record store, used when no data directory is available and in tests.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Records>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> Result<MutexGuard<'_, Records>, StorageError> {
        self.inner.lock().map_err(|_| StorageError::Poisoned)
    }
}

impl RecordStore for MemoryStore {
    fn latest_rate(&self) -> Result<Option<Rate>, StorageError> {
        let records = self.records()?;
        Ok(records.rates.iter().max_by_key(|r| r.observed_at()).cloned())
    }

    fn rates(&self) -> Result<Vec<Rate>, StorageError> {
        let mut rates = self.records()?.rates.clone();
        rates.sort_by(|a, b| b.observed_at().cmp(&a.observed_at()));
        Ok(rates)
    }

    fn append_rate(&self, rate: &Rate) -> Result<(), StorageError> {
        self.records()?.rates.push(rate.clone());
        debug!(rate = %rate.value(), "Memory store PUT rate");
        Ok(())
    }

    fn delete_rate(&self, id: Uuid) -> Result<(), StorageError> {
        self.records()?.rates.retain(|r| r.id() != id);
        Ok(())
    }

    fn clear_rates(&self) -> Result<(), StorageError> {
        self.records()?.rates.clear();
        Ok(())
    }

    fn balance(&self) -> Result<Option<CurrentBalance>, StorageError> {
        Ok(self.records()?.balance.clone())
    }

    fn save_balance(&self, balance: &CurrentBalance) -> Result<(), StorageError> {
        self.records()?.balance = Some(balance.clone());
        Ok(())
    }

    fn adjust_balance(&self, delta: Decimal) -> Result<CurrentBalance, StorageError> {
        let mut records = self.records()?;
        let updated = match &records.balance {
            Some(existing) => existing.adjusted(delta),
            None => CurrentBalance::new(delta),
        };
        records.balance = Some(updated.clone());
        Ok(updated)
    }

    fn clear_balance(&self) -> Result<(), StorageError> {
        self.records()?.balance = None;
        Ok(())
    }
}
