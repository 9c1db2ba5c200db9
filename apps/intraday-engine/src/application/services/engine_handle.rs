//! Engine Handle
//!
//! Cloneable request/response front for the engine task. Every query and
//! mutation is a message answered over a oneshot channel, so callers never
//! touch the trade book directly.

use tokio::sync::{mpsc, oneshot};

use crate::application::ports::DaySnapshot;
use crate::domain::order_execution::Trade;
use crate::domain::shared::{BrokerName, SignalId, Symbol};
use crate::domain::trade_signal::{AddOutcome, TradeSignal};
use crate::error::EngineError;

pub(crate) enum EngineCommand {
    AddSignal {
        signal: Box<TradeSignal>,
        reply: oneshot::Sender<Result<AddOutcome, EngineError>>,
    },
    DisableSignal {
        signal_id: SignalId,
        reply: oneshot::Sender<Result<(), EngineError>>,
    },
    SameSignal {
        signal: Box<TradeSignal>,
        reply: oneshot::Sender<Option<TradeSignal>>,
    },
    OppositeSignal {
        signal: Box<TradeSignal>,
        reply: oneshot::Sender<Option<TradeSignal>>,
    },
    IsTradeAlreadyPlaced {
        signal: Box<TradeSignal>,
        strategy: String,
        reply: oneshot::Sender<bool>,
    },
    CountStocksTraded {
        strategy: String,
        reply: oneshot::Sender<usize>,
    },
    ListStocksTraded {
        strategy: String,
        reply: oneshot::Sender<Vec<Symbol>>,
    },
    ActiveTrades {
        broker: BrokerName,
        reply: oneshot::Sender<Vec<Trade>>,
    },
    CompletedTrades {
        broker: BrokerName,
        reply: oneshot::Sender<Vec<Trade>>,
    },
    RegisterSymbols {
        symbols: Vec<Symbol>,
        reply: oneshot::Sender<()>,
    },
    UnregisterSymbols {
        symbols: Vec<Symbol>,
        reply: oneshot::Sender<()>,
    },
    Snapshot {
        reply: oneshot::Sender<DaySnapshot>,
    },
    Stop {
        exit_all: bool,
        reply: oneshot::Sender<()>,
    },
}

/// Handle to a running engine.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineCommand>,
}

impl std::fmt::Debug for EngineCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::AddSignal { .. } => "AddSignal",
            Self::DisableSignal { .. } => "DisableSignal",
            Self::SameSignal { .. } => "SameSignal",
            Self::OppositeSignal { .. } => "OppositeSignal",
            Self::IsTradeAlreadyPlaced { .. } => "IsTradeAlreadyPlaced",
            Self::CountStocksTraded { .. } => "CountStocksTraded",
            Self::ListStocksTraded { .. } => "ListStocksTraded",
            Self::ActiveTrades { .. } => "ActiveTrades",
            Self::CompletedTrades { .. } => "CompletedTrades",
            Self::RegisterSymbols { .. } => "RegisterSymbols",
            Self::UnregisterSymbols { .. } => "UnregisterSymbols",
            Self::Snapshot { .. } => "Snapshot",
            Self::Stop { .. } => "Stop",
        };
        f.write_str(name)
    }
}

impl EngineHandle {
    pub(crate) const fn new(tx: mpsc::Sender<EngineCommand>) -> Self {
        Self { tx }
    }

    /// Whether the engine task is still accepting commands.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.tx.is_closed()
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> EngineCommand,
    ) -> Result<T, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(command(reply))
            .await
            .map_err(|_| EngineError::EngineStopped)?;
        rx.await.map_err(|_| EngineError::EngineStopped)
    }

    /// Register a signal. Its symbol is subscribed on the live feed.
    ///
    /// # Errors
    ///
    /// `Configuration` for an unknown strategy or broker; `EngineStopped`
    /// if the engine is gone.
    pub async fn add_signal(&self, signal: TradeSignal) -> Result<AddOutcome, EngineError> {
        self.request(|reply| EngineCommand::AddSignal {
            signal: Box::new(signal),
            reply,
        })
        .await?
    }

    /// Disable a signal.
    pub async fn disable_signal(&self, signal_id: SignalId) -> Result<(), EngineError> {
        self.request(|reply| EngineCommand::DisableSignal { signal_id, reply })
            .await?
    }

    /// Registered signal with the same shape as `signal`.
    pub async fn same_signal(&self, signal: TradeSignal) -> Result<Option<TradeSignal>, EngineError> {
        self.request(|reply| EngineCommand::SameSignal {
            signal: Box::new(signal),
            reply,
        })
        .await
    }

    /// Registered opposite-direction twin of `signal`.
    pub async fn opposite_signal(
        &self,
        signal: TradeSignal,
    ) -> Result<Option<TradeSignal>, EngineError> {
        self.request(|reply| EngineCommand::OppositeSignal {
            signal: Box::new(signal),
            reply,
        })
        .await
    }

    /// Whether `strategy` already traded this signal's symbol and direction.
    pub async fn is_trade_already_placed(
        &self,
        signal: TradeSignal,
        strategy: impl Into<String>,
    ) -> Result<bool, EngineError> {
        let strategy = strategy.into();
        self.request(|reply| EngineCommand::IsTradeAlreadyPlaced {
            signal: Box::new(signal),
            strategy,
            reply,
        })
        .await
    }

    /// Distinct symbols traded today by `strategy`.
    pub async fn count_stocks_traded(&self, strategy: impl Into<String>) -> Result<usize, EngineError> {
        let strategy = strategy.into();
        self.request(|reply| EngineCommand::CountStocksTraded { strategy, reply })
            .await
    }

    /// Symbols traded today by `strategy`.
    pub async fn list_stocks_traded(
        &self,
        strategy: impl Into<String>,
    ) -> Result<Vec<Symbol>, EngineError> {
        let strategy = strategy.into();
        self.request(|reply| EngineCommand::ListStocksTraded { strategy, reply })
            .await
    }

    /// Active trades for `broker`, marked to the latest quote.
    pub async fn active_trades(&self, broker: BrokerName) -> Result<Vec<Trade>, EngineError> {
        self.request(|reply| EngineCommand::ActiveTrades { broker, reply })
            .await
    }

    /// Closed trades for `broker` that actually traded.
    pub async fn completed_trades(&self, broker: BrokerName) -> Result<Vec<Trade>, EngineError> {
        self.request(|reply| EngineCommand::CompletedTrades { broker, reply })
            .await
    }

    /// Watch extra symbols on the live feed.
    pub async fn register_symbols(&self, symbols: Vec<Symbol>) -> Result<(), EngineError> {
        self.request(|reply| EngineCommand::RegisterSymbols { symbols, reply })
            .await
    }

    /// Stop watching symbols.
    pub async fn unregister_symbols(&self, symbols: Vec<Symbol>) -> Result<(), EngineError> {
        self.request(|reply| EngineCommand::UnregisterSymbols { symbols, reply })
            .await
    }

    /// Copy of the current trades and signals.
    pub async fn snapshot(&self) -> Result<DaySnapshot, EngineError> {
        self.request(|reply| EngineCommand::Snapshot { reply }).await
    }

    /// Stop the engine, squaring off every position first when `exit_all`.
    ///
    /// Resolves once the engine has persisted its final state.
    pub async fn stop(&self, exit_all: bool) -> Result<(), EngineError> {
        self.request(|reply| EngineCommand::Stop { exit_all, reply })
            .await
    }
}
