use crate::core::models::{CurrentBalance, Rate};
use crate::core::store::{RecordStore, StorageError};
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use rust_decimal::Decimal;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

const RATES_PARTITION: &str = "rates";
const BALANCE_PARTITION: &str = "balance";
const BALANCE_KEY: &[u8] = b"current";

/// Rate history and balance singleton persisted in a fjall keyspace.
///
/// Rate keys are the observation time (order-preserving big-endian) followed by the
/// rate id, so the last key in the partition is always the latest rate.
pub struct FjallStore {
    keyspace: Keyspace,
    rates: PartitionHandle,
    balance: PartitionHandle,
    // serialises read-modify-write on the balance singleton
    balance_lock: Mutex<()>,
}

impl FjallStore {
    pub fn open(db_path: &Path) -> Result<Self, StorageError> {
        std::fs::create_dir_all(db_path).map_err(|e| StorageError::Backend(e.to_string()))?;

        let keyspace = fjall::Config::new(db_path.join("fjall_db")).open()?;
        let rates = keyspace.open_partition(RATES_PARTITION, PartitionCreateOptions::default())?;
        let balance =
            keyspace.open_partition(BALANCE_PARTITION, PartitionCreateOptions::default())?;
        debug!("Opened record store at {}", db_path.display());

        Ok(Self {
            keyspace,
            rates,
            balance,
            balance_lock: Mutex::new(()),
        })
    }

    fn rate_key(rate: &Rate) -> Vec<u8> {
        let micros = rate.observed_at().timestamp_micros();
        // flip the sign bit so negative timestamps sort before positive ones
        let ordered = (micros as u64) ^ (1 << 63);
        let mut key = Vec::with_capacity(24);
        key.extend_from_slice(&ordered.to_be_bytes());
        key.extend_from_slice(rate.id().as_bytes());
        key
    }

    /// Flushes the journal to disk. The preceding write is already committed and
    /// visible, so a failed sync is logged rather than reported as a failed write.
    fn sync(&self) {
        if let Err(e) = self.keyspace.persist(PersistMode::SyncAll) {
            warn!(error = %e, "Failed to sync record store to disk");
        }
    }

    fn write_balance(&self, balance: &CurrentBalance) -> Result<(), StorageError> {
        self.balance
            .insert(BALANCE_KEY, serde_json::to_vec(balance)?)?;
        self.sync();
        Ok(())
    }
}

impl RecordStore for FjallStore {
    fn latest_rate(&self) -> Result<Option<Rate>, StorageError> {
        match self.rates.last_key_value()? {
            Some((_, value)) => Ok(Some(serde_json::from_slice(&value)?)),
            None => {
                debug!("Record store MISS for latest rate");
                Ok(None)
            }
        }
    }

    fn rates(&self) -> Result<Vec<Rate>, StorageError> {
        self.rates
            .iter()
            .rev()
            .map(|kv| -> Result<Rate, StorageError> {
                let (_, value) = kv?;
                Ok(serde_json::from_slice(&value)?)
            })
            .collect()
    }

    fn append_rate(&self, rate: &Rate) -> Result<(), StorageError> {
        self.rates
            .insert(Self::rate_key(rate), serde_json::to_vec(rate)?)?;
        self.sync();
        debug!(rate = %rate.value(), "Record store PUT rate");
        Ok(())
    }

    fn delete_rate(&self, id: Uuid) -> Result<(), StorageError> {
        let mut batch = self.keyspace.batch();
        for kv in self.rates.iter() {
            let (key, _) = kv?;
            if key.ends_with(id.as_bytes()) {
                batch.remove(&self.rates, key);
            }
        }
        batch.commit()?;
        self.sync();
        Ok(())
    }

    fn clear_rates(&self) -> Result<(), StorageError> {
        let mut batch = self.keyspace.batch();
        for kv in self.rates.iter() {
            let (key, _) = kv?;
            batch.remove(&self.rates, key);
        }
        batch.commit()?;
        self.sync();
        Ok(())
    }

    fn balance(&self) -> Result<Option<CurrentBalance>, StorageError> {
        match self.balance.get(BALANCE_KEY)? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    fn save_balance(&self, balance: &CurrentBalance) -> Result<(), StorageError> {
        let _guard = self.balance_lock.lock().map_err(|_| StorageError::Poisoned)?;
        self.write_balance(balance)
    }

    fn adjust_balance(&self, delta: Decimal) -> Result<CurrentBalance, StorageError> {
        let _guard = self.balance_lock.lock().map_err(|_| StorageError::Poisoned)?;
        let updated = match self.balance()? {
            Some(existing) => existing.adjusted(delta),
            None => CurrentBalance::new(delta),
        };
        self.write_balance(&updated)?;
        debug!(balance = %updated.balance, "Record store adjusted balance");
        Ok(updated)
    }

    fn clear_balance(&self) -> Result<(), StorageError> {
        let _guard = self.balance_lock.lock().map_err(|_| StorageError::Poisoned)?;
        self.balance.remove(BALANCE_KEY)?;
        self.sync();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    #[test]
    fn test_fjall_store_latest_rate() {
        let dir = tempdir().unwrap();
        let store = FjallStore::open(dir.path()).unwrap();

        // Initially, store is empty
        assert!(store.latest_rate().unwrap().is_none());

        let now = Utc::now();
        let latest = Rate::observed(dec!(67250.25), now).unwrap();
        let older = Rate::observed(dec!(65000), now - Duration::minutes(2)).unwrap();
        // insertion order must not matter
        store.append_rate(&latest).unwrap();
        store.append_rate(&older).unwrap();

        assert_eq!(store.latest_rate().unwrap(), Some(latest.clone()));
        assert_eq!(store.rates().unwrap(), vec![latest, older]);
    }

    #[test]
    fn test_fjall_store_orders_pre_epoch_rates_first() {
        let dir = tempdir().unwrap();
        let store = FjallStore::open(dir.path()).unwrap();

        let before = Rate::observed(dec!(1), Utc.timestamp_opt(-100, 0).unwrap()).unwrap();
        let after = Rate::observed(dec!(2), Utc.timestamp_opt(100, 0).unwrap()).unwrap();
        store.append_rate(&after).unwrap();
        store.append_rate(&before).unwrap();

        assert_eq!(store.latest_rate().unwrap(), Some(after));
    }

    #[test]
    fn test_fjall_store_delete_and_clear_rates() {
        let dir = tempdir().unwrap();
        let store = FjallStore::open(dir.path()).unwrap();

        let now = Utc::now();
        let a = Rate::observed(dec!(1), now - Duration::seconds(1)).unwrap();
        let b = Rate::observed(dec!(2), now).unwrap();
        store.append_rate(&a).unwrap();
        store.append_rate(&b).unwrap();

        store.delete_rate(b.id()).unwrap();
        assert_eq!(store.latest_rate().unwrap(), Some(a));

        store.clear_rates().unwrap();
        assert!(store.latest_rate().unwrap().is_none());
    }

    #[test]
    fn test_fjall_store_balance_singleton() {
        let dir = tempdir().unwrap();
        let store = FjallStore::open(dir.path()).unwrap();

        assert!(store.balance().unwrap().is_none());
        let created = store.adjust_balance(dec!(50)).unwrap();
        assert_eq!(created.balance, dec!(50));

        let updated = store.adjust_balance(dec!(-20)).unwrap();
        assert_eq!(updated.balance, dec!(30));
        assert!(updated.last_updated > created.last_updated);
        assert_eq!(store.balance().unwrap(), Some(updated));

        store.save_balance(&CurrentBalance::new(dec!(7))).unwrap();
        assert_eq!(store.balance().unwrap().unwrap().balance, dec!(7));

        store.clear_balance().unwrap();
        assert!(store.balance().unwrap().is_none());
    }

    #[test]
    fn test_fjall_store_successful_write_is_committed() {
        let dir = tempdir().unwrap();
        let store = FjallStore::open(dir.path()).unwrap();

        // an Ok from a write means the record is visible, whatever the sync did
        let mut expected = Decimal::ZERO;
        for delta in [dec!(1.5), dec!(-0.25), dec!(10)] {
            expected += delta;
            let returned = store.adjust_balance(delta).unwrap();
            assert_eq!(returned.balance, expected);
            assert_eq!(store.balance().unwrap(), Some(returned));

            let rate = Rate::new(dec!(60000) + delta.abs()).unwrap();
            store.append_rate(&rate).unwrap();
            assert!(store.rates().unwrap().contains(&rate));
        }
        assert_eq!(store.rates().unwrap().len(), 3);
    }

    #[test]
    fn test_fjall_store_survives_reopen() {
        let dir = tempdir().unwrap();
        let rate = Rate::new(dec!(43521.5)).unwrap();
        {
            let store = FjallStore::open(dir.path()).unwrap();
            store.append_rate(&rate).unwrap();
            store.adjust_balance(dec!(12.5)).unwrap();
        }

        let store = FjallStore::open(dir.path()).unwrap();
        assert_eq!(store.latest_rate().unwrap(), Some(rate));
        assert_eq!(store.balance().unwrap().unwrap().balance, dec!(12.5));
    }
}
