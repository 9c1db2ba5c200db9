//! Snapshot Writer
//!
//! Persists the day's trades and signals off the engine task. The engine
//! publishes snapshots into a `watch` channel (latest wins) and a dedicated
//! task writes them, so a slow disk never delays a reconciliation tick.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::application::ports::{DaySnapshot, TradeStore};

/// Throttled, asynchronous snapshot persistence.
pub struct SnapshotWriter {
    tx: Option<watch::Sender<Option<DaySnapshot>>>,
    task: Option<JoinHandle<()>>,
    min_interval: Duration,
    last_publish: Option<Instant>,
}

impl SnapshotWriter {
    /// Spawn the writer task. Unforced saves are skipped until
    /// `min_interval` has passed since the last one.
    #[must_use]
    pub fn spawn(store: Arc<dyn TradeStore>, min_interval: Duration) -> Self {
        let (tx, mut rx) = watch::channel::<Option<DaySnapshot>>(None);
        let task = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let snapshot = rx.borrow_and_update().clone();
                let Some(snapshot) = snapshot else {
                    continue;
                };
                match store.save(&snapshot).await {
                    Ok(()) => tracing::debug!(
                        trading_date = %snapshot.trading_date,
                        trades = snapshot.trades.len(),
                        signals = snapshot.signals.len(),
                        "Snapshot saved"
                    ),
                    Err(e) => tracing::error!(
                        trading_date = %snapshot.trading_date,
                        error = %e,
                        "Snapshot save failed"
                    ),
                }
            }
        });

        Self {
            tx: Some(tx),
            task: Some(task),
            min_interval,
            last_publish: None,
        }
    }

    /// Queue a snapshot for writing.
    ///
    /// `snapshot` is only built when the save goes ahead. Returns whether it
    /// was queued.
    pub fn persist(&mut self, force: bool, snapshot: impl FnOnce() -> DaySnapshot) -> bool {
        let Some(tx) = self.tx.as_ref() else {
            return false;
        };
        let due = self
            .last_publish
            .is_none_or(|last| last.elapsed() >= self.min_interval);
        if !force && !due {
            return false;
        }
        tx.send_replace(Some(snapshot()));
        self.last_publish = Some(Instant::now());
        true
    }

    /// Stop accepting snapshots and wait for the last one to be written.
    pub async fn close(&mut self) {
        self.tx.take();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            tracing::error!(error = %e, "Snapshot writer task failed");
        }
    }
}
