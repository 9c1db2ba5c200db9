//! JSON file trade store.
//!
//! One pair of files per trading day under `<root>/data/trades/`:
//! `trades_YYYY-MM-DD.json` and `trade_signals_YYYY-MM-DD.json`. Each file is
//! written to a temporary sibling and renamed over the target, so a crash
//! mid-write leaves the previous version intact.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::application::ports::{DaySnapshot, PersistenceError, TradeStore};

/// File-backed `TradeStore`.
#[derive(Debug, Clone)]
pub struct JsonTradeStore {
    dir: PathBuf,
}

impl JsonTradeStore {
    /// Store rooted at `storage_dir`.
    #[must_use]
    pub fn new(storage_dir: impl AsRef<Path>) -> Self {
        Self {
            dir: storage_dir.as_ref().join("data").join("trades"),
        }
    }

    /// Path of the trades file for `date`.
    #[must_use]
    pub fn trades_path(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(format!("trades_{}.json", date.format("%Y-%m-%d")))
    }

    /// Path of the signals file for `date`.
    #[must_use]
    pub fn signals_path(&self, date: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("trade_signals_{}.json", date.format("%Y-%m-%d")))
    }

    async fn read_list<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, PersistenceError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(source) => Err(PersistenceError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    async fn write_list<T: Serialize>(path: &Path, items: &[T]) -> Result<(), PersistenceError> {
        let bytes = serde_json::to_vec_pretty(items)?;
        let tmp = path.with_extension("json.tmp");
        let io_err = |source| PersistenceError::Io {
            path: path.to_path_buf(),
            source,
        };
        tokio::fs::write(&tmp, bytes).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, path).await.map_err(io_err)
    }
}

#[async_trait]
impl TradeStore for JsonTradeStore {
    async fn load(&self, trading_date: NaiveDate) -> Result<DaySnapshot, PersistenceError> {
        let trades = Self::read_list(&self.trades_path(trading_date)).await?;
        let signals = Self::read_list(&self.signals_path(trading_date)).await?;
        tracing::info!(
            %trading_date,
            trades = trades.len(),
            signals = signals.len(),
            "Loaded trading day"
        );
        Ok(DaySnapshot {
            trading_date,
            trades,
            signals,
        })
    }

    async fn save(&self, snapshot: &DaySnapshot) -> Result<(), PersistenceError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| PersistenceError::Io {
                path: self.dir.clone(),
                source,
            })?;
        Self::write_list(&self.trades_path(snapshot.trading_date), &snapshot.trades).await?;
        Self::write_list(&self.signals_path(snapshot.trading_date), &snapshot.signals).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::test_support::long_signal;
    use crate::domain::order_execution::services::ChargeSchedule;
    use crate::domain::order_execution::{
        LegState, OrderLeg, OrderRequest, OrderSide, ProductType, Trade, TradeState, exit_reason,
    };
    use crate::domain::shared::BrokerOrderId;
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 12).unwrap()
    }

    fn opened_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 12, 4, 30, 0).unwrap()
    }

    fn working_trade() -> Trade {
        let signal = long_signal();
        let request = OrderRequest::limit(
            signal.exchange(),
            signal.trading_symbol.clone(),
            OrderSide::Buy,
            10,
            dec!(100),
        );
        let entry = OrderLeg::placed(BrokerOrderId::new("E-1"), &request, opened_at());
        Trade::from_signal(&signal, ProductType::Intraday, entry, opened_at())
    }

    /// Long trade stopped out: filled entry, executed stop-loss, cancelled target.
    fn stopped_out_trade() -> Trade {
        let mut trade = working_trade();
        let filled_at = opened_at() + TimeDelta::seconds(4);
        trade.entry_order.state = LegState::Complete;
        trade.entry_order.filled_quantity = 10;
        trade.entry_order.pending_quantity = 0;
        trade.entry_order.average_price = Some(dec!(100.05));
        trade.entry = Some(dec!(100.05));
        trade.filled_quantity = 10;
        trade.order_complete_at = Some(filled_at);

        let sl_request = OrderRequest::stop_loss(
            trade.exchange.clone(),
            trade.trading_symbol.clone(),
            OrderSide::Sell,
            10,
            dec!(95),
            dec!(94.95),
        );
        let mut sl = OrderLeg::placed(BrokerOrderId::new("SL-1"), &sl_request, filled_at);
        sl.state = LegState::Complete;
        sl.average_price = Some(dec!(94.9));
        sl.filled_quantity = 10;
        sl.pending_quantity = 0;
        trade.sl_order = Some(sl);
        trade.last_sl_updated_at = Some(filled_at);

        let target_request = OrderRequest::limit(
            trade.exchange.clone(),
            trade.trading_symbol.clone(),
            OrderSide::Sell,
            10,
            dec!(110),
        );
        let mut target = OrderLeg::placed(BrokerOrderId::new("T-1"), &target_request, filled_at);
        target.record_modify(dec!(109.5), filled_at + TimeDelta::seconds(20));
        target.record_cancelled();
        trade.target_order = Some(target);

        trade.exit_reason = Some(exit_reason::SL_HIT.to_string());
        trade.settle(Some(dec!(94.9)), &ChargeSchedule::default());
        trade
            .close(TradeState::SlHit, opened_at() + TimeDelta::minutes(42))
            .unwrap();
        trade
    }

    #[tokio::test]
    async fn missing_files_load_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonTradeStore::new(dir.path());

        assert_eq!(store.load(date()).await.unwrap(), DaySnapshot::empty(date()));
    }

    #[tokio::test]
    async fn save_writes_dated_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonTradeStore::new(dir.path());
        let mut snapshot = DaySnapshot::empty(date());
        snapshot.signals.push(long_signal());

        store.save(&snapshot).await.unwrap();

        let signals = dir.path().join("data/trades/trade_signals_2024-03-12.json");
        let trades = dir.path().join("data/trades/trades_2024-03-12.json");
        assert!(signals.exists());
        assert_eq!(std::fs::read_to_string(trades).unwrap().trim(), "[]");
        assert!(!dir.path().join("data/trades/trades_2024-03-12.json.tmp").exists());
        assert_eq!(store.load(date()).await.unwrap(), snapshot);
    }

    #[tokio::test]
    async fn populated_day_reloads_identically() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonTradeStore::new(dir.path());
        let mut triggered = long_signal();
        triggered.is_triggered = true;
        let mut snapshot = DaySnapshot::empty(date());
        snapshot.signals.push(triggered);
        snapshot.trades.push(stopped_out_trade());
        snapshot.trades.push(working_trade());

        let closed = &snapshot.trades[0];
        assert_eq!(closed.state(), TradeState::SlHit);
        assert!(closed.end_timestamp.is_some());
        assert!(closed.pl_percentage.is_some());
        assert!(closed.exit.is_some());

        store.save(&snapshot).await.unwrap();
        let loaded = store.load(date()).await.unwrap();

        assert_eq!(loaded, snapshot);
        assert_eq!(loaded.trades[1].state(), TradeState::Active);
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonTradeStore::new(dir.path());
        std::fs::create_dir_all(dir.path().join("data/trades")).unwrap();
        std::fs::write(store.trades_path(date()), "{not json").unwrap();

        assert!(matches!(
            store.load(date()).await,
            Err(PersistenceError::Serialization(_))
        ));
    }
}
