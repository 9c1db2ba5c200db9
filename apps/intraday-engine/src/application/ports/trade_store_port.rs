//! Trade Store Port (Driven Port)
//!
//! Durable per-day snapshots of trades and signals.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::order_execution::Trade;
use crate::domain::trade_signal::TradeSignal;

/// Everything the engine needs to resume a trading day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySnapshot {
    /// Exchange-local trading date.
    pub trading_date: NaiveDate,
    /// Trades in registration order.
    pub trades: Vec<Trade>,
    /// Signals in registration order.
    pub signals: Vec<TradeSignal>,
}

impl DaySnapshot {
    /// Empty day.
    #[must_use]
    pub const fn empty(trading_date: NaiveDate) -> Self {
        Self {
            trading_date,
            trades: Vec::new(),
            signals: Vec::new(),
        }
    }
}

/// Persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// Filesystem error.
    #[error("I/O error on '{path}': {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Document could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Port for trade and signal persistence.
#[async_trait]
pub trait TradeStore: Send + Sync {
    /// Load a day's trades and signals. A day never saved loads empty.
    async fn load(&self, trading_date: NaiveDate) -> Result<DaySnapshot, PersistenceError>;

    /// Overwrite a day's trades and signals.
    async fn save(&self, snapshot: &DaySnapshot) -> Result<(), PersistenceError>;
}
