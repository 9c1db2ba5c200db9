//! Broker Port (Driven Port)
//!
//! Interface for placing and tracking orders with one broker. Adapters
//! normalize their wire format to these shapes.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order_execution::{OrderRequest, OrderSnapshot, OrderStatus, ProductType};
use crate::domain::shared::{BrokerName, BrokerOrderId};

/// Acknowledgment from broker after placing, modifying or cancelling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAck {
    /// Broker order ID.
    pub order_id: BrokerOrderId,
    /// Status at acknowledgment time, when the broker reports one.
    pub status: Option<OrderStatus>,
}

/// Fields to change on a working order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifyOrder {
    /// New limit price.
    pub new_price: Option<Decimal>,
    /// New quantity.
    pub new_quantity: Option<u32>,
}

impl ModifyOrder {
    /// Change only the price.
    #[must_use]
    pub const fn price(new_price: Decimal) -> Self {
        Self {
            new_price: Some(new_price),
            new_quantity: None,
        }
    }
}

/// Broker port error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BrokerError {
    /// Connection error.
    #[error("Broker connection error: {message}")]
    ConnectionError {
        /// Error details.
        message: String,
    },

    /// Session missing or expired.
    #[error("Broker session not logged in")]
    NotLoggedIn,

    /// Order rejected by broker.
    #[error("Order rejected: {reason}")]
    OrderRejected {
        /// Rejection reason.
        reason: String,
    },

    /// Order not found.
    #[error("Order not found: {order_id}")]
    OrderNotFound {
        /// The missing order ID.
        order_id: String,
    },

    /// Insufficient funds.
    #[error("Insufficient margin")]
    InsufficientFunds,

    /// Rate limited.
    #[error("Rate limited by broker")]
    RateLimited,

    /// Unknown error.
    #[error("Broker error: {message}")]
    Unknown {
        /// Error details.
        message: String,
    },
}

/// Port for broker interactions.
#[async_trait]
pub trait BrokerPort: Send + Sync {
    /// Configured name of this broker.
    fn name(&self) -> &BrokerName;

    /// Open a session.
    async fn login(&self) -> Result<(), BrokerError>;

    /// Close the session.
    async fn logout(&self) -> Result<(), BrokerError>;

    /// Whether a session is open.
    fn is_logged_in(&self) -> bool;

    /// Place an entry or target order.
    async fn place_order(
        &self,
        request: &OrderRequest,
        product: ProductType,
    ) -> Result<OrderAck, BrokerError>;

    /// Place a stop-loss order.
    async fn place_sl_order(
        &self,
        request: &OrderRequest,
        product: ProductType,
    ) -> Result<OrderAck, BrokerError>;

    /// Change price and/or quantity of a working order.
    async fn modify_order(
        &self,
        order_id: &BrokerOrderId,
        changes: ModifyOrder,
    ) -> Result<OrderAck, BrokerError>;

    /// Convert a working order to a market order.
    async fn modify_order_to_market(&self, order_id: &BrokerOrderId)
    -> Result<OrderAck, BrokerError>;

    /// Cancel a working order.
    async fn cancel_order(&self, order_id: &BrokerOrderId) -> Result<OrderAck, BrokerError>;

    /// Current state of an order, resolved from its history.
    async fn get_order(&self, order_id: &BrokerOrderId) -> Result<OrderSnapshot, BrokerError>;
}
