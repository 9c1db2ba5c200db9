//! Order request sent to a broker.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{OrderKind, OrderSide};
use crate::domain::shared::Symbol;

/// Everything a broker needs to place one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Exchange segment (e.g. `NSE`).
    pub exchange: String,
    /// Instrument.
    pub trading_symbol: Symbol,
    /// Buy or sell.
    pub side: OrderSide,
    /// Market, limit or stop.
    pub kind: OrderKind,
    /// Number of shares.
    pub quantity: u32,
    /// Limit price; absent for market orders.
    pub price: Option<Decimal>,
    /// Stop trigger price.
    pub trigger_price: Option<Decimal>,
}

impl OrderRequest {
    /// Limit order.
    #[must_use]
    pub fn limit(
        exchange: impl Into<String>,
        trading_symbol: Symbol,
        side: OrderSide,
        quantity: u32,
        price: Decimal,
    ) -> Self {
        Self {
            exchange: exchange.into(),
            trading_symbol,
            side,
            kind: OrderKind::Limit,
            quantity,
            price: Some(price),
            trigger_price: None,
        }
    }

    /// Market order.
    #[must_use]
    pub fn market(
        exchange: impl Into<String>,
        trading_symbol: Symbol,
        side: OrderSide,
        quantity: u32,
    ) -> Self {
        Self {
            exchange: exchange.into(),
            trading_symbol,
            side,
            kind: OrderKind::Market,
            quantity,
            price: None,
            trigger_price: None,
        }
    }

    /// Stop-loss market order with a protective limit.
    #[must_use]
    pub fn stop_loss(
        exchange: impl Into<String>,
        trading_symbol: Symbol,
        side: OrderSide,
        quantity: u32,
        trigger_price: Decimal,
        price: Decimal,
    ) -> Self {
        Self {
            exchange: exchange.into(),
            trading_symbol,
            side,
            kind: OrderKind::StopLossMarket,
            quantity,
            price: Some(price),
            trigger_price: Some(trigger_price),
        }
    }
}
