//! Live quote value object.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::shared::Symbol;

/// Latest tick for one symbol, replaced wholesale on every update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveQuote {
    /// Symbol the quote belongs to.
    pub trading_symbol: Symbol,
    /// Current market price (last traded price).
    pub cmp: Decimal,
    /// Session open.
    pub open: Decimal,
    /// Session high.
    pub high: Decimal,
    /// Session low.
    pub low: Decimal,
    /// Previous close.
    pub close: Decimal,
    /// Traded volume.
    pub volume: u64,
    /// Volume-weighted average traded price.
    pub average_price: Decimal,
    /// Percentage change from previous close.
    pub change: Decimal,
}

impl LiveQuote {
    /// Quote carrying only a last traded price; OHLC collapse to it.
    #[must_use]
    pub fn at_price(trading_symbol: Symbol, cmp: Decimal) -> Self {
        Self {
            trading_symbol,
            cmp,
            open: cmp,
            high: cmp,
            low: cmp,
            close: cmp,
            volume: 0,
            average_price: cmp,
            change: Decimal::ZERO,
        }
    }
}
