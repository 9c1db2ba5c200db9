//! Entry reprice policy for unfilled limit orders.
//!
//! An unfilled entry chases the market in the adverse direction only, and
//! never further than a fixed percentage past the originally requested
//! price.

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::domain::order_execution::value_objects::TradeType;
use crate::domain::shared::pricing::round_to_tick;

/// Limits on chasing an unfilled entry order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepricePolicy {
    /// Minimum time between two modifications.
    pub interval: TimeDelta,
    /// Maximum number of modifications per order.
    pub max_attempts: u32,
    /// Maximum adverse move from the requested entry, in percent.
    pub limit_percent: Decimal,
}

impl Default for RepricePolicy {
    fn default() -> Self {
        Self {
            interval: TimeDelta::seconds(20),
            max_attempts: 5,
            limit_percent: dec!(0.3),
        }
    }
}

impl RepricePolicy {
    /// Whether another modification may be sent now.
    #[must_use]
    pub fn is_due(&self, last_change: DateTime<Utc>, attempts: u32, now: DateTime<Utc>) -> bool {
        attempts < self.max_attempts && now - last_change >= self.interval
    }

    /// Furthest price the entry may be moved to.
    #[must_use]
    pub fn price_cap(&self, trade_type: TradeType, requested_entry: Decimal) -> Decimal {
        let move_by = requested_entry * self.limit_percent / dec!(100);
        match trade_type {
            TradeType::Long => round_to_tick(requested_entry + move_by),
            TradeType::Short => round_to_tick(requested_entry - move_by),
        }
    }

    /// New entry price for the current market, or `None` when no modify
    /// should be sent.
    #[must_use]
    pub fn next_price(
        &self,
        trade_type: TradeType,
        requested_entry: Decimal,
        cmp: Decimal,
        current_price: Option<Decimal>,
    ) -> Option<Decimal> {
        let cap = self.price_cap(trade_type, requested_entry);
        let new_price = match trade_type {
            TradeType::Long if cmp > requested_entry => round_to_tick(cmp).min(cap),
            TradeType::Short if cmp < requested_entry => round_to_tick(cmp).max(cap),
            _ => return None,
        };
        (current_price != Some(new_price)).then_some(new_price)
    }
}
