//! Shared Domain Types
//!
//! Value objects shared across bounded contexts.

pub mod pricing;
pub mod value_objects;

pub use value_objects::{BrokerName, BrokerOrderId, CorrelationId, SignalId, Symbol, TradeId};
