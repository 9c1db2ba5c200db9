//! Application Services
//!
//! Long-running orchestration built on the use cases: the reconciliation
//! engine actor, its command handle, the live quote listener and the
//! administrative algo manager.

mod algo_manager;
mod broker_registry;
mod engine;
mod engine_handle;
mod quote_listener;
mod snapshot_writer;
mod strategy_registry;

pub use algo_manager::{AlgoError, AlgoManager, AlgoStatus};
pub use broker_registry::{BrokerEntry, BrokerRegistry};
pub use engine::{EngineBuilder, EngineSettings, TradeEngine};
pub use engine_handle::EngineHandle;
pub use quote_listener::{FeedEvent, FeedEventKind, FeedForwarder, QuoteCache, QuoteListener};
pub use snapshot_writer::SnapshotWriter;
pub use strategy_registry::StrategyRegistry;
