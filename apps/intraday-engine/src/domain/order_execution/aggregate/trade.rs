//! Trade Aggregate Root
//!
//! An executed position together with its entry, stop-loss and target
//! legs. A trade is active from the moment its entry order is accepted
//! until exactly one terminal cause closes it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::OrderLeg;
use crate::domain::order_execution::errors::OrderError;
use crate::domain::order_execution::services::{ChargeSchedule, TradePnl};
use crate::domain::order_execution::value_objects::{LegState, ProductType, TradeState, TradeType};
use crate::domain::shared::{BrokerName, CorrelationId, SignalId, Symbol, TradeId};
use crate::domain::trade_signal::TradeSignal;

/// Trade aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    /// Engine-assigned ID.
    pub id: TradeId,
    state: TradeState,
    /// Free-text exit annotation ("SL HIT", "SQUARE OFF", ...).
    pub exit_reason: Option<String>,

    /// Broker holding the position.
    pub broker: BrokerName,
    /// Strategy that produced the signal.
    pub strategy: String,
    /// Instrument.
    pub trading_symbol: Symbol,
    /// Exchange segment.
    pub exchange: String,
    /// Long or short.
    pub trade_type: TradeType,
    /// Broker product.
    pub product: ProductType,

    /// Quantity confirmed by the broker.
    pub quantity: u32,
    /// Quantity the signal asked for.
    pub requested_quantity: u32,
    /// Quantity actually filled on entry.
    pub filled_quantity: u32,

    /// Price the signal triggered at.
    pub requested_entry: Decimal,
    /// Average entry fill price.
    pub entry: Option<Decimal>,
    /// Average exit fill price.
    pub exit: Option<Decimal>,
    /// Last known market price.
    pub cmp: Decimal,
    /// Current stop-loss price.
    pub stop_loss: Decimal,
    /// Target price.
    pub target: Decimal,
    /// Stop-loss at entry time.
    pub initial_stop_loss: Decimal,

    /// When the entry was placed.
    pub start_timestamp: DateTime<Utc>,
    /// When the trade closed.
    pub end_timestamp: Option<DateTime<Utc>>,
    /// When the stop-loss price last changed.
    pub last_sl_updated_at: Option<DateTime<Utc>>,
    /// When the entry order completed.
    pub order_complete_at: Option<DateTime<Utc>>,

    /// Entry order.
    pub entry_order: OrderLeg,
    /// Stop-loss order; only placed after the entry completes.
    pub sl_order: Option<OrderLeg>,
    /// Target order; only placed after the entry completes.
    pub target_order: Option<OrderLeg>,

    /// Chase an unfilled entry.
    pub change_entry_price_if_order_not_filled: bool,
    /// Trailing stop-loss instead of a fixed target.
    pub is_trailing_sl: bool,
    /// No target leg.
    pub no_target: bool,
    /// Signal that opened the trade.
    pub signal_id: Option<SignalId>,
    /// Correlation of the opening signal.
    pub correlation_id: Option<CorrelationId>,
    /// Opening signal allowed its opposite to trade.
    pub consider_opposite_trade: bool,

    /// Gross P/L.
    pub profit_loss: Decimal,
    /// Charges.
    pub charges: Decimal,
    /// Net P/L.
    pub net_profit_loss: Decimal,
    /// Net P/L as percent of entry value.
    pub pl_percentage: Option<Decimal>,
}

impl Trade {
    /// Open a trade from a signal whose entry order was accepted.
    #[must_use]
    pub fn from_signal(signal: &TradeSignal, product: ProductType, entry_order: OrderLeg, now: DateTime<Utc>) -> Self {
        Self {
            id: TradeId::generate(),
            state: TradeState::Active,
            exit_reason: None,
            broker: signal.broker.clone(),
            strategy: signal.strategy.clone(),
            trading_symbol: signal.trading_symbol.clone(),
            exchange: signal.exchange().to_string(),
            trade_type: signal.trade_type(),
            product,
            quantity: signal.quantity,
            requested_quantity: signal.quantity,
            filled_quantity: 0,
            requested_entry: signal.trigger,
            entry: None,
            exit: None,
            cmp: Decimal::ZERO,
            stop_loss: signal.stop_loss,
            target: signal.target,
            initial_stop_loss: signal.stop_loss,
            start_timestamp: now,
            end_timestamp: None,
            last_sl_updated_at: Some(now),
            order_complete_at: None,
            entry_order,
            sl_order: None,
            target_order: None,
            change_entry_price_if_order_not_filled: signal.change_entry_price_if_order_not_filled,
            is_trailing_sl: signal.is_trailing_sl,
            no_target: signal.no_target,
            signal_id: Some(signal.id.clone()),
            correlation_id: signal.correlation_id.clone(),
            consider_opposite_trade: signal.consider_opposite_trade,
            profit_loss: Decimal::ZERO,
            charges: Decimal::ZERO,
            net_profit_loss: Decimal::ZERO,
            pl_percentage: None,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> TradeState {
        self.state
    }

    /// Returns true until a terminal cause closes the trade.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self.state, TradeState::Active)
    }

    /// Closed because an order was cancelled.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self.state, TradeState::Cancelled)
    }

    /// Closed because the entry was rejected.
    #[must_use]
    pub const fn is_rejected(&self) -> bool {
        matches!(self.state, TradeState::Rejected)
    }

    /// Entry leg fully executed.
    #[must_use]
    pub fn is_entry_complete(&self) -> bool {
        self.entry_order.state == LegState::Complete
    }

    /// Broker owns the protective legs (cover/bracket orders).
    #[must_use]
    pub const fn is_broker_managed(&self) -> bool {
        !matches!(self.product, ProductType::Intraday)
    }

    /// Whether this trade places a target leg during normal tracking.
    #[must_use]
    pub const fn wants_target(&self) -> bool {
        !self.is_trailing_sl && !self.no_target && !self.is_broker_managed()
    }

    /// Exit reason text, empty when unset.
    #[must_use]
    pub fn exit_reason(&self) -> &str {
        self.exit_reason.as_deref().unwrap_or_default()
    }

    /// Close the trade. Happens exactly once.
    ///
    /// # Errors
    ///
    /// Returns error if the trade is already closed.
    pub fn close(&mut self, state: TradeState, now: DateTime<Utc>) -> Result<(), OrderError> {
        if self.state.is_terminal() {
            return Err(OrderError::TradeAlreadyClosed {
                trade_id: self.id.clone(),
                state: self.state,
            });
        }
        self.state = state;
        self.end_timestamp = Some(now);
        Ok(())
    }

    /// Record the exit fill and compute final P&L.
    pub fn settle(&mut self, exit_price: Option<Decimal>, schedule: &ChargeSchedule) {
        if exit_price.is_some() {
            self.exit = exit_price;
        }
        if let (Some(entry), Some(exit)) = (self.entry, self.exit) {
            let pnl = schedule.pnl(self.trade_type, entry, exit, self.filled_quantity);
            self.apply_pnl(pnl);
        }
    }

    /// Refresh `cmp` and, for an open position, the running P&L.
    pub fn mark_to_market(&mut self, cmp: Decimal, schedule: &ChargeSchedule) {
        self.cmp = cmp;
        if !self.is_active() || cmp.is_zero() {
            return;
        }
        if let Some(entry) = self.entry {
            let pnl = schedule.open_pnl(self.trade_type, entry, cmp, self.filled_quantity);
            self.apply_pnl(pnl);
        }
    }

    fn apply_pnl(&mut self, pnl: TradePnl) {
        self.profit_loss = pnl.profit_loss;
        self.charges = pnl.charges;
        self.net_profit_loss = pnl.net_profit_loss;
        self.pl_percentage = pnl.pl_percentage;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order_execution::value_objects::{OrderRequest, OrderSide};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 12, 4, 0, 0).unwrap()
    }

    fn trade() -> Trade {
        let signal = TradeSignal::new(
            BrokerName::new("paper"),
            "trigger-cross",
            Symbol::new("SBIN"),
            true,
            dec!(100),
            dec!(98),
            dec!(105),
            100,
        );
        let request = OrderRequest::limit("NSE", Symbol::new("SBIN"), OrderSide::Buy, 100, dec!(100));
        let leg = OrderLeg::placed("ord-1".into(), &request, now());
        Trade::from_signal(&signal, ProductType::Intraday, leg, now())
    }

    #[test]
    fn new_trade_is_active_with_requested_entry() {
        let trade = trade();
        assert!(trade.is_active());
        assert_eq!(trade.requested_entry, dec!(100));
        assert_eq!(trade.initial_stop_loss, dec!(98));
        assert_eq!(trade.exchange, "NSE");
        assert!(trade.sl_order.is_none());
        assert!(trade.target_order.is_none());
    }

    #[test]
    fn close_happens_once() {
        let mut trade = trade();
        trade.close(TradeState::TargetHit, now()).unwrap();
        assert!(!trade.is_active());
        let err = trade.close(TradeState::Cancelled, now()).unwrap_err();
        assert!(matches!(err, OrderError::TradeAlreadyClosed { state: TradeState::TargetHit, .. }));
        assert_eq!(trade.state(), TradeState::TargetHit);
    }

    #[test]
    fn settle_computes_pnl() {
        let mut trade = trade();
        trade.entry = Some(dec!(100));
        trade.filled_quantity = 100;
        trade.settle(Some(dec!(105)), &ChargeSchedule::default());
        assert_eq!(trade.profit_loss, dec!(500));
        assert_eq!(trade.net_profit_loss, dec!(493.52));
        assert_eq!(trade.pl_percentage, Some(dec!(4.94)));
    }

    #[test]
    fn mark_to_market_without_fill_only_sets_cmp() {
        let mut trade = trade();
        trade.mark_to_market(dec!(101), &ChargeSchedule::default());
        assert_eq!(trade.cmp, dec!(101));
        assert_eq!(trade.profit_loss, Decimal::ZERO);
    }

    #[test]
    fn broker_managed_trades_skip_target() {
        let mut trade = trade();
        assert!(trade.wants_target());
        trade.product = ProductType::Cover;
        assert!(!trade.wants_target());
    }
}
