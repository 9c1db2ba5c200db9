//! Shared value objects.

mod identifiers;
mod symbol;

pub use identifiers::{BrokerName, BrokerOrderId, CorrelationId, SignalId, TradeId};
pub use symbol::Symbol;
