//! Order leg entity.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order_execution::errors::OrderError;
use crate::domain::order_execution::services::LegStateMachine;
use crate::domain::order_execution::value_objects::{
    LegState, OrderKind, OrderRequest, OrderSide, OrderSnapshot, OrderStatus,
};
use crate::domain::shared::BrokerOrderId;

/// One broker order belonging to a trade (entry, SL or target).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLeg {
    /// Broker order ID.
    pub order_id: BrokerOrderId,
    /// Buy or sell.
    pub side: OrderSide,
    /// Market, limit or stop.
    pub kind: OrderKind,
    /// Working limit price.
    pub price: Option<Decimal>,
    /// Stop trigger price.
    pub trigger_price: Option<Decimal>,
    /// Ordered quantity.
    pub quantity: u32,
    /// Quantity filled.
    pub filled_quantity: u32,
    /// Quantity still pending.
    pub pending_quantity: u32,
    /// Average execution price.
    pub average_price: Option<Decimal>,
    /// Lifecycle state.
    pub state: LegState,
    /// Last status the broker reported.
    pub broker_status: Option<OrderStatus>,
    /// When the order was placed.
    pub placed_at: DateTime<Utc>,
    /// When the last modification was sent.
    pub last_modified_at: Option<DateTime<Utc>>,
    /// Modifications sent so far.
    pub num_modify_requests: u32,
}

impl OrderLeg {
    /// Leg for an order the broker just accepted.
    #[must_use]
    pub fn placed(order_id: BrokerOrderId, request: &OrderRequest, now: DateTime<Utc>) -> Self {
        Self {
            order_id,
            side: request.side,
            kind: request.kind,
            price: request.price,
            trigger_price: request.trigger_price,
            quantity: request.quantity,
            filled_quantity: 0,
            pending_quantity: request.quantity,
            average_price: None,
            state: LegState::Placed,
            broker_status: None,
            placed_at: now,
            last_modified_at: None,
            num_modify_requests: 0,
        }
    }

    /// Fold a broker report into the leg.
    ///
    /// # Errors
    ///
    /// Returns error, leaving the leg untouched, if the report would move
    /// the leg out of a terminal state.
    pub fn apply_snapshot(&mut self, snapshot: &OrderSnapshot) -> Result<LegState, OrderError> {
        let next = LegStateMachine::next_state(self.state, LegState::from_status(snapshot.status))?;
        self.state = next;
        self.broker_status = Some(snapshot.status);
        self.quantity = snapshot.quantity;
        self.filled_quantity = snapshot.filled_quantity;
        self.pending_quantity = snapshot.pending_quantity;
        if snapshot.average_price.is_some() {
            self.average_price = snapshot.average_price;
        }
        Ok(next)
    }

    /// Record an accepted price modification.
    pub fn record_modify(&mut self, new_price: Decimal, now: DateTime<Utc>) {
        self.price = Some(new_price);
        self.touch_modified(now);
    }

    /// Record an accepted conversion to a market order.
    pub fn record_market_conversion(&mut self, now: DateTime<Utc>) {
        self.kind = OrderKind::Market;
        self.price = None;
        self.touch_modified(now);
    }

    /// Record an accepted cancel for a leg of a trade that is closing.
    ///
    /// A later execution report still moves the leg to complete.
    pub fn record_cancelled(&mut self) {
        if self.state.is_working() {
            self.state = LegState::Cancelled;
        }
    }

    /// Treat the executed part of a cancelled order as the whole order.
    ///
    /// Returns false, leaving the leg untouched, unless the leg is cancelled
    /// with a non-zero fill.
    pub fn adopt_partial_fill(&mut self) -> bool {
        if self.state != LegState::Cancelled || self.filled_quantity == 0 {
            return false;
        }
        self.state = LegState::Complete;
        self.quantity = self.filled_quantity;
        self.pending_quantity = 0;
        true
    }

    /// Reference time for the reprice interval.
    #[must_use]
    pub fn last_change_at(&self) -> DateTime<Utc> {
        self.last_modified_at.unwrap_or(self.placed_at)
    }

    /// Returns true once the leg can no longer execute.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Returns true while the order rests at the exchange.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self.state, LegState::Open | LegState::Modified)
    }

    fn touch_modified(&mut self, now: DateTime<Utc>) {
        self.last_modified_at = Some(now);
        self.num_modify_requests += 1;
        if let Ok(next) = LegStateMachine::next_state(self.state, LegState::Modified) {
            self.state = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::shared::Symbol;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 12, 4, 0, 0).unwrap()
    }

    fn leg() -> OrderLeg {
        let request = OrderRequest::limit("NSE", Symbol::new("SBIN"), OrderSide::Buy, 10, dec!(100));
        OrderLeg::placed(BrokerOrderId::new("ord-1"), &request, now())
    }

    fn snapshot(status: OrderStatus, filled: u32) -> OrderSnapshot {
        OrderSnapshot {
            order_id: BrokerOrderId::new("ord-1"),
            status,
            price: Some(dec!(100)),
            trigger_price: None,
            average_price: (filled > 0).then_some(dec!(99.95)),
            quantity: 10,
            filled_quantity: filled,
            pending_quantity: 10 - filled,
            updated_at: now(),
        }
    }

    #[test]
    fn snapshot_moves_leg_to_open_then_complete() {
        let mut leg = leg();
        assert_eq!(leg.apply_snapshot(&snapshot(OrderStatus::Open, 0)).unwrap(), LegState::Open);
        assert_eq!(
            leg.apply_snapshot(&snapshot(OrderStatus::Complete, 10)).unwrap(),
            LegState::Complete
        );
        assert_eq!(leg.average_price, Some(dec!(99.95)));
        assert_eq!(leg.filled_quantity, 10);
    }

    #[test]
    fn terminal_leg_rejects_reopen() {
        let mut leg = leg();
        leg.apply_snapshot(&snapshot(OrderStatus::Cancelled, 0)).unwrap();
        assert!(leg.apply_snapshot(&snapshot(OrderStatus::Open, 0)).is_err());
        assert_eq!(leg.state, LegState::Cancelled);
    }

    #[test]
    fn modify_counts_and_marks_modified() {
        let mut leg = leg();
        leg.apply_snapshot(&snapshot(OrderStatus::Open, 0)).unwrap();
        let later = now() + chrono::TimeDelta::seconds(30);
        leg.record_modify(dec!(100.30), later);
        assert_eq!(leg.state, LegState::Modified);
        assert_eq!(leg.num_modify_requests, 1);
        assert_eq!(leg.last_change_at(), later);
        assert_eq!(leg.price, Some(dec!(100.30)));
    }

    #[test]
    fn market_conversion_drops_limit() {
        let mut leg = leg();
        leg.apply_snapshot(&snapshot(OrderStatus::Open, 0)).unwrap();
        leg.record_market_conversion(now());
        assert_eq!(leg.kind, OrderKind::Market);
        assert!(leg.price.is_none());
    }

    #[test]
    fn partly_filled_cancel_is_adopted_as_complete() {
        let mut leg = leg();
        leg.apply_snapshot(&snapshot(OrderStatus::Cancelled, 4)).unwrap();
        assert!(leg.adopt_partial_fill());
        assert_eq!(leg.state, LegState::Complete);
        assert_eq!(leg.quantity, 4);
        assert_eq!(leg.pending_quantity, 0);
    }

    #[test]
    fn unfilled_cancel_is_not_adopted() {
        let mut leg = leg();
        leg.apply_snapshot(&snapshot(OrderStatus::Cancelled, 0)).unwrap();
        assert!(!leg.adopt_partial_fill());
        assert_eq!(leg.state, LegState::Cancelled);
    }

    #[test]
    fn late_fill_replaces_recorded_cancel() {
        let mut leg = leg();
        leg.apply_snapshot(&snapshot(OrderStatus::Open, 0)).unwrap();
        leg.record_cancelled();
        assert_eq!(
            leg.apply_snapshot(&snapshot(OrderStatus::Complete, 10)).unwrap(),
            LegState::Complete
        );
        assert_eq!(leg.filled_quantity, 10);
    }
}
