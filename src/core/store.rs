//! Storage abstractions for rates and the balance singleton

use crate::core::models::{CurrentBalance, Rate};
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("Storage backend error: {0}")]
    Backend(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Storage lock poisoned")]
    Poisoned,
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

impl From<fjall::Error> for StorageError {
    fn from(err: fjall::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}

/// A durable home for rate history and the balance singleton.
///
/// Every call is atomic: it either fully applies or leaves prior state.
pub trait RecordStore: Send + Sync {
    /// Most recent rate by `observed_at`.
    fn latest_rate(&self) -> Result<Option<Rate>, StorageError>;
    /// All rates, newest first.
    fn rates(&self) -> Result<Vec<Rate>, StorageError>;
    fn append_rate(&self, rate: &Rate) -> Result<(), StorageError>;
    fn delete_rate(&self, id: Uuid) -> Result<(), StorageError>;
    fn clear_rates(&self) -> Result<(), StorageError>;

    fn balance(&self) -> Result<Option<CurrentBalance>, StorageError>;
    /// Replaces the singleton.
    fn save_balance(&self, balance: &CurrentBalance) -> Result<(), StorageError>;
    /// Adds `delta` to the singleton, creating it when absent.
    fn adjust_balance(&self, delta: Decimal) -> Result<CurrentBalance, StorageError>;
    fn clear_balance(&self) -> Result<(), StorageError>;
}
