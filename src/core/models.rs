//! Domain records shared by the cache, the repository and the CLI.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Rate must be positive, got {0}")]
pub struct InvalidRate(pub Decimal);

/// A timestamped USD-per-BTC price sample.
///
/// Rates are never mutated; a newer sample supersedes an older one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredRate")]
pub struct Rate {
    id: Uuid,
    value: Decimal,
    observed_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct StoredRate {
    id: Uuid,
    value: Decimal,
    observed_at: DateTime<Utc>,
}

impl TryFrom<StoredRate> for Rate {
    type Error = InvalidRate;

    fn try_from(stored: StoredRate) -> Result<Self, Self::Error> {
        Rate::with_id(stored.id, stored.value, stored.observed_at)
    }
}

impl Rate {
    pub fn new(value: Decimal) -> Result<Self, InvalidRate> {
        Self::observed(value, Utc::now())
    }

    pub fn observed(value: Decimal, observed_at: DateTime<Utc>) -> Result<Self, InvalidRate> {
        Self::with_id(Uuid::new_v4(), value, observed_at)
    }

    fn with_id(
        id: Uuid,
        value: Decimal,
        observed_at: DateTime<Utc>,
    ) -> Result<Self, InvalidRate> {
        if value <= Decimal::ZERO {
            return Err(InvalidRate(value));
        }
        Ok(Self {
            id,
            value,
            observed_at,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn value(&self) -> Decimal {
        self.value
    }

    pub fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }
}

/// The single current-balance record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentBalance {
    pub id: Uuid,
    pub balance: Decimal,
    pub last_updated: DateTime<Utc>,
}

impl CurrentBalance {
    pub fn new(balance: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            balance,
            last_updated: Utc::now(),
        }
    }

    /// Returns a copy with `delta` applied and `last_updated` refreshed.
    pub fn adjusted(&self, delta: Decimal) -> Self {
        let now = Utc::now();
        Self {
            id: self.id,
            balance: self.balance + delta,
            // keep the timestamp strictly increasing even on coarse clocks
            last_updated: if now > self.last_updated {
                now
            } else {
                self.last_updated + chrono::Duration::microseconds(1)
            },
        }
    }
}

/// Paging state of a listing, recomputed on every page load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationInfo {
    pub current_page: usize,
    pub page_size: usize,
    pub total_items: usize,
    pub has_more_pages: bool,
}

impl PaginationInfo {
    pub fn new(
        current_page: usize,
        page_size: usize,
        total_items: usize,
        has_more_pages: bool,
    ) -> Self {
        Self {
            current_page,
            page_size,
            total_items,
            has_more_pages,
        }
    }

    /// Projects the total count against how many items are already loaded.
    pub fn for_page(
        current_page: usize,
        page_size: usize,
        total_items: usize,
        loaded_items: usize,
    ) -> Self {
        Self::new(
            current_page,
            page_size,
            total_items,
            loaded_items < total_items,
        )
    }

    pub fn total_pages(&self) -> usize {
        if self.page_size == 0 {
            return 0;
        }
        self.total_items.div_ceil(self.page_size)
    }

    pub fn is_first_page(&self) -> bool {
        self.current_page == 0
    }

    pub fn is_last_page(&self) -> bool {
        !self.has_more_pages
    }
}
