//! Algo Manager
//!
//! Administrative front for the engine: broker login/logout and per-broker
//! start/stop of algorithmic trading. One engine serves every running
//! broker; it is rebuilt from the store whenever trading starts with no
//! engine running, and stopped when the last broker stops.

use std::collections::BTreeSet;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::engine::EngineBuilder;
use super::engine_handle::EngineHandle;
use crate::domain::shared::BrokerName;

/// Reply to a start/stop request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AlgoStatus {
    /// Whether the broker is now trading.
    pub is_algo_running: bool,
}

/// Failed admin request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{error}")]
pub struct AlgoError {
    /// Human-readable reason.
    pub error: String,
}

impl AlgoError {
    fn new(error: impl std::fmt::Display) -> Self {
        Self {
            error: error.to_string(),
        }
    }
}

#[derive(Default)]
struct AlgoState {
    engine: Option<(EngineHandle, JoinHandle<()>)>,
    running: BTreeSet<BrokerName>,
}

/// Owns the engine lifecycle.
pub struct AlgoManager {
    builder: EngineBuilder,
    state: Mutex<AlgoState>,
    shutdown: CancellationToken,
}

impl AlgoManager {
    /// Create a manager. `shutdown` is handed to every engine it starts.
    #[must_use]
    pub fn new(builder: EngineBuilder, shutdown: CancellationToken) -> Self {
        Self {
            builder,
            state: Mutex::new(AlgoState::default()),
            shutdown,
        }
    }

    /// Open a broker session.
    pub async fn login(&self, broker: &BrokerName) -> Result<(), AlgoError> {
        let entry = self.builder.brokers().get(broker).map_err(AlgoError::new)?;
        entry.broker.login().await.map_err(AlgoError::new)?;
        tracing::info!(broker = %broker, "Broker logged in");
        Ok(())
    }

    /// Close a broker session.
    pub async fn logout(&self, broker: &BrokerName) -> Result<(), AlgoError> {
        let entry = self.builder.brokers().get(broker).map_err(AlgoError::new)?;
        entry.broker.logout().await.map_err(AlgoError::new)?;
        tracing::info!(broker = %broker, "Broker logged out");
        Ok(())
    }

    /// Start trading on `broker`.
    ///
    /// Refused when the broker is not logged in or the market is closed for
    /// the day.
    pub async fn start(&self, broker: &BrokerName) -> Result<AlgoStatus, AlgoError> {
        let entry = self.builder.brokers().get(broker).map_err(AlgoError::new)?;
        if !entry.broker.is_logged_in() {
            return Err(AlgoError::new(format!("broker {broker} is not logged in")));
        }
        let now = self.builder.clock().now();
        if self.builder.settings().session.is_market_closed_for_day(now) {
            return Err(AlgoError::new("market is closed for the day"));
        }

        let mut state = self.state.lock().await;
        let engine_running = state
            .engine
            .as_ref()
            .is_some_and(|(handle, _)| handle.is_running());
        if !engine_running {
            state.running.clear();
            let (engine, handle) = self.builder.build().await.map_err(AlgoError::new)?;
            let task = engine.spawn(self.shutdown.child_token());
            state.engine = Some((handle, task));
        }
        state.running.insert(broker.clone());
        tracing::info!(broker = %broker, running = state.running.len(), "Algo started");
        Ok(AlgoStatus {
            is_algo_running: true,
        })
    }

    /// Stop trading on `broker`. The engine stops with the last broker,
    /// squaring off first when `exit_all`.
    pub async fn stop(&self, broker: &BrokerName, exit_all: bool) -> Result<AlgoStatus, AlgoError> {
        self.builder.brokers().get(broker).map_err(AlgoError::new)?;

        let mut state = self.state.lock().await;
        state.running.remove(broker);
        if state.running.is_empty()
            && let Some((handle, task)) = state.engine.take()
        {
            stop_engine(handle, task, exit_all).await;
        }
        tracing::info!(broker = %broker, running = state.running.len(), "Algo stopped");
        Ok(AlgoStatus {
            is_algo_running: false,
        })
    }

    /// Whether `broker` is trading.
    pub async fn is_running(&self, broker: &BrokerName) -> bool {
        let state = self.state.lock().await;
        state.running.contains(broker)
            && state
                .engine
                .as_ref()
                .is_some_and(|(handle, _)| handle.is_running())
    }

    /// Handle to the running engine, if any.
    pub async fn engine(&self) -> Option<EngineHandle> {
        let state = self.state.lock().await;
        state
            .engine
            .as_ref()
            .map(|(handle, _)| handle.clone())
            .filter(EngineHandle::is_running)
    }

    /// Stop everything. Used on process shutdown.
    pub async fn shutdown(&self, exit_all: bool) {
        let mut state = self.state.lock().await;
        state.running.clear();
        if let Some((handle, task)) = state.engine.take() {
            stop_engine(handle, task, exit_all).await;
        }
    }
}

async fn stop_engine(handle: EngineHandle, task: JoinHandle<()>, exit_all: bool) {
    if handle.is_running()
        && let Err(e) = handle.stop(exit_all).await
    {
        tracing::warn!(error = %e, "Engine already stopped");
    }
    if let Err(e) = task.await {
        tracing::error!(error = %e, "Engine task failed");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::application::services::{BrokerRegistry, EngineSettings, StrategyRegistry};
    use crate::infrastructure::broker::PaperBroker;
    use crate::infrastructure::clock::ManualClock;
    use crate::infrastructure::persistence::InMemoryTradeStore;
    use chrono::{TimeZone, Utc};

    fn manager(at: chrono::DateTime<Utc>) -> AlgoManager {
        let paper = Arc::new(PaperBroker::new(BrokerName::new("paper")));
        let mut brokers = BrokerRegistry::new();
        brokers.register(paper.clone(), paper);
        let builder = EngineBuilder::new(
            brokers,
            StrategyRegistry::new(),
            Arc::new(InMemoryTradeStore::new()),
            Arc::new(ManualClock::new(at)),
            EngineSettings::default(),
        );
        AlgoManager::new(builder, CancellationToken::new())
    }

    fn tuesday_morning() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 12, 4, 30, 0).unwrap()
    }

    #[tokio::test]
    async fn start_requires_login() {
        let manager = manager(tuesday_morning());
        let paper = BrokerName::new("paper");

        let error = manager.start(&paper).await.unwrap_err();
        assert!(error.error.contains("not logged in"));

        manager.login(&paper).await.unwrap();
        assert!(manager.start(&paper).await.unwrap().is_algo_running);
        assert!(manager.is_running(&paper).await);
        assert!(manager.engine().await.is_some());

        assert!(!manager.stop(&paper, false).await.unwrap().is_algo_running);
        assert!(manager.engine().await.is_none());
    }

    #[tokio::test]
    async fn start_refused_after_close() {
        // 16:00 IST
        let manager = manager(Utc.with_ymd_and_hms(2024, 3, 12, 10, 30, 0).unwrap());
        let paper = BrokerName::new("paper");
        manager.login(&paper).await.unwrap();

        let error = manager.start(&paper).await.unwrap_err();
        assert_eq!(error.error, "market is closed for the day");
    }

    #[tokio::test]
    async fn unknown_broker_is_reported() {
        let manager = manager(tuesday_morning());
        let error = manager.login(&BrokerName::new("ghost")).await.unwrap_err();
        assert!(error.error.contains("unknown broker"));
    }
}
