//! In-memory trade store for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::RwLock;

use crate::application::ports::{DaySnapshot, PersistenceError, TradeStore};

/// In-memory implementation of `TradeStore`.
///
/// Suitable for testing and development. Not for production use.
#[derive(Debug, Default)]
pub struct InMemoryTradeStore {
    days: RwLock<HashMap<NaiveDate, DaySnapshot>>,
    saves: AtomicUsize,
}

impl InMemoryTradeStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a day (for test setup).
    pub fn insert(&self, snapshot: DaySnapshot) {
        self.days.write().insert(snapshot.trading_date, snapshot);
    }

    /// Number of `save` calls so far.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TradeStore for InMemoryTradeStore {
    async fn load(&self, trading_date: NaiveDate) -> Result<DaySnapshot, PersistenceError> {
        Ok(self
            .days
            .read()
            .get(&trading_date)
            .cloned()
            .unwrap_or_else(|| DaySnapshot::empty(trading_date)))
    }

    async fn save(&self, snapshot: &DaySnapshot) -> Result<(), PersistenceError> {
        self.days
            .write()
            .insert(snapshot.trading_date, snapshot.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::test_support::long_signal;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 12).unwrap()
    }

    #[tokio::test]
    async fn unknown_day_loads_empty() {
        let store = InMemoryTradeStore::new();
        assert_eq!(store.load(date()).await.unwrap(), DaySnapshot::empty(date()));
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn save_overwrites_day() {
        let store = InMemoryTradeStore::new();
        let mut snapshot = DaySnapshot::empty(date());
        store.save(&snapshot).await.unwrap();
        snapshot.signals.push(long_signal());
        store.save(&snapshot).await.unwrap();

        assert_eq!(store.load(date()).await.unwrap(), snapshot);
        assert_eq!(store.save_count(), 2);
    }
}
