//! Engine error taxonomy.
//!
//! | Variant | Raised by | Handling |
//! |---------|-----------|----------|
//! | `BrokerCall` | any broker call | retried next tick inside tracking; surfaced only for entry placement |
//! | `OrderTerminal` | entry placement | trade never created |
//! | `Configuration` | startup, unknown broker/strategy | fatal at construction, rejected for signals |
//! | `InvariantViolation` | executing a disabled/triggered signal | rejected synchronously |
//! | `Persistence` | trade store | logged; loop continues |
//! | `EngineStopped` | engine handle | the loop is no longer running |

use thiserror::Error;

use crate::application::ports::{BrokerError, FeedError, PersistenceError};
use crate::domain::order_execution::{OrderError, OrderStatus};
use crate::domain::shared::BrokerOrderId;
use crate::domain::trade_signal::SignalError;

/// Errors surfaced by the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A broker call failed.
    #[error("Broker call failed: {0}")]
    BrokerCall(#[from] BrokerError),

    /// An order ended rejected or cancelled.
    #[error("Order {order_id} ended {status}")]
    OrderTerminal {
        /// Broker order ID.
        order_id: BrokerOrderId,
        /// Terminal status.
        status: OrderStatus,
    },

    /// Missing or inconsistent configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Operation would break an engine invariant.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Trade store failure.
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Live feed failure.
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    /// The reconciliation loop is not running.
    #[error("Trade engine is not running")]
    EngineStopped,
}

impl From<OrderError> for EngineError {
    fn from(err: OrderError) -> Self {
        Self::InvariantViolation(err.to_string())
    }
}

impl From<SignalError> for EngineError {
    fn from(err: SignalError) -> Self {
        Self::InvariantViolation(err.to_string())
    }
}
