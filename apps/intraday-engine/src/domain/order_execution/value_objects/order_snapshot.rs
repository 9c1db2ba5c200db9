//! Broker-reported view of one order.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::OrderStatus;
use crate::domain::shared::BrokerOrderId;

/// One row of an order's broker-side history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSnapshot {
    /// Broker order ID.
    pub order_id: BrokerOrderId,
    /// Normalized status.
    pub status: OrderStatus,
    /// Limit price, if any.
    pub price: Option<Decimal>,
    /// Trigger price for stop orders.
    pub trigger_price: Option<Decimal>,
    /// Average execution price; absent until something fills.
    pub average_price: Option<Decimal>,
    /// Ordered quantity.
    pub quantity: u32,
    /// Quantity filled so far.
    pub filled_quantity: u32,
    /// Quantity still pending.
    pub pending_quantity: u32,
    /// When the broker recorded this row.
    pub updated_at: DateTime<Utc>,
}

/// Pick the current row from an order's history.
///
/// Highest status priority wins; ties go to the latest `updated_at`, then to
/// the row that appears later in the broker's response.
#[must_use]
pub fn select_latest(rows: &[OrderSnapshot]) -> Option<&OrderSnapshot> {
    rows.iter()
        .enumerate()
        .max_by_key(|(index, row)| (row.status.priority(), row.updated_at, *index))
        .map(|(_, row)| row)
}
