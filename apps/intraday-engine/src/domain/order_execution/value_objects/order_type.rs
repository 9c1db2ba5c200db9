//! Order side, kind, product and trade direction.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeType {
    /// Bought first, sold to exit.
    Long,
    /// Sold first, bought to exit.
    Short,
}

impl TradeType {
    /// Direction for a signal's buy flag.
    #[must_use]
    pub const fn from_is_buy(is_buy: bool) -> Self {
        if is_buy { Self::Long } else { Self::Short }
    }

    /// Side of the entry order.
    #[must_use]
    pub const fn entry_side(&self) -> OrderSide {
        match self {
            Self::Long => OrderSide::Buy,
            Self::Short => OrderSide::Sell,
        }
    }

    /// Side of the SL and target orders.
    #[must_use]
    pub const fn exit_side(&self) -> OrderSide {
        self.entry_side().opposite()
    }
}

impl fmt::Display for TradeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long => write!(f, "LONG"),
            Self::Short => write!(f, "SHORT"),
        }
    }
}

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSide {
    /// Buy.
    Buy,
    /// Sell.
    Sell,
}

impl OrderSide {
    /// The other side.
    #[must_use]
    pub const fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// Order pricing kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderKind {
    /// Execute at market.
    Market,
    /// Execute at the limit price or better.
    Limit,
    /// Stop order that goes to market once triggered.
    StopLossMarket,
}

/// Broker product for the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductType {
    /// Plain intraday (MIS).
    #[default]
    Intraday,
    /// Broker-native cover order; the broker owns the SL leg.
    Cover,
    /// Broker-native bracket order; the broker owns SL and target.
    Bracket,
}
