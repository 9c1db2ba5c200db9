//! Trade book.
//!
//! Today's trades and signals together, with the read queries strategies
//! use to decide whether a signal may trade.

use std::collections::BTreeSet;

use super::order_execution::Trade;
use super::shared::{BrokerName, Symbol};
use super::trade_signal::{SignalRegistry, TradeSignal};

/// Trades and signals for one trading day.
#[derive(Debug, Clone, Default)]
pub struct TradeBook {
    trades: Vec<Trade>,
    signals: SignalRegistry,
}

impl TradeBook {
    /// Book restored from persisted state.
    #[must_use]
    pub fn new(trades: Vec<Trade>, signals: Vec<TradeSignal>) -> Self {
        Self {
            trades,
            signals: SignalRegistry::from_signals(signals),
        }
    }

    /// Trades in registration order.
    #[must_use]
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    /// Mutable trades, for reconciliation.
    pub fn trades_mut(&mut self) -> &mut [Trade] {
        &mut self.trades
    }

    /// Append a newly opened trade.
    pub fn push_trade(&mut self, trade: Trade) {
        self.trades.push(trade);
    }

    /// Signal registry.
    #[must_use]
    pub const fn signals(&self) -> &SignalRegistry {
        &self.signals
    }

    /// Mutable signal registry.
    pub fn signals_mut(&mut self) -> &mut SignalRegistry {
        &mut self.signals
    }

    /// Whether any trade is still active.
    #[must_use]
    pub fn has_active_trades(&self) -> bool {
        self.trades.iter().any(Trade::is_active)
    }

    /// A trade exists for this strategy, symbol and direction.
    #[must_use]
    pub fn is_trade_already_placed(&self, signal: &TradeSignal, strategy: &str) -> bool {
        self.trades.iter().any(|trade| {
            trade.strategy == strategy
                && trade.trading_symbol == signal.trading_symbol
                && trade.trade_type == signal.trade_type()
        })
    }

    /// Distinct symbols traded by a strategy, in first-trade order.
    #[must_use]
    pub fn list_stocks_traded(&self, strategy: &str) -> Vec<Symbol> {
        let mut seen = BTreeSet::new();
        self.trades
            .iter()
            .filter(|trade| trade.strategy == strategy)
            .filter(|trade| seen.insert(trade.trading_symbol.clone()))
            .map(|trade| trade.trading_symbol.clone())
            .collect()
    }

    /// Number of distinct symbols traded by a strategy.
    #[must_use]
    pub fn count_stocks_traded(&self, strategy: &str) -> usize {
        self.list_stocks_traded(strategy).len()
    }

    /// Active trades on a broker.
    pub fn active_trades<'a>(&'a self, broker: &'a BrokerName) -> impl Iterator<Item = &'a Trade> {
        self.trades
            .iter()
            .filter(move |trade| &trade.broker == broker && trade.is_active())
    }

    /// Closed trades on a broker that actually traded.
    pub fn completed_trades<'a>(
        &'a self,
        broker: &'a BrokerName,
    ) -> impl Iterator<Item = &'a Trade> {
        self.trades.iter().filter(move |trade| {
            &trade.broker == broker
                && !trade.is_active()
                && !trade.is_cancelled()
                && !trade.is_rejected()
        })
    }

    /// Symbols the live feed must watch: pending signals and active trades.
    #[must_use]
    pub fn watched_symbols(&self) -> BTreeSet<Symbol> {
        self.signals
            .pending_symbols()
            .cloned()
            .chain(
                self.trades
                    .iter()
                    .filter(|trade| trade.is_active())
                    .map(|trade| trade.trading_symbol.clone()),
            )
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order_execution::{
        OrderLeg, OrderRequest, OrderSide, ProductType, TradeState,
    };
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn signal(symbol: &str, is_buy: bool) -> TradeSignal {
        TradeSignal::new(
            BrokerName::new("paper"),
            "trigger-cross",
            Symbol::new(symbol),
            is_buy,
            dec!(100),
            dec!(98),
            dec!(104),
            10,
        )
    }

    fn trade(signal: &TradeSignal) -> Trade {
        let now = Utc.with_ymd_and_hms(2024, 3, 12, 4, 0, 0).unwrap();
        let request = OrderRequest::limit(
            "NSE",
            signal.trading_symbol.clone(),
            OrderSide::Buy,
            signal.quantity,
            signal.trigger,
        );
        Trade::from_signal(
            signal,
            ProductType::Intraday,
            OrderLeg::placed("ord".into(), &request, now),
            now,
        )
    }

    #[test]
    fn already_placed_matches_direction() {
        let long = signal("SBIN", true);
        let book = TradeBook::new(vec![trade(&long)], vec![]);
        assert!(book.is_trade_already_placed(&long, "trigger-cross"));
        assert!(!book.is_trade_already_placed(&signal("SBIN", false), "trigger-cross"));
        assert!(!book.is_trade_already_placed(&long, "other"));
    }

    #[test]
    fn stocks_traded_are_distinct() {
        let sbin = signal("SBIN", true);
        let infy = signal("INFY", true);
        let book = TradeBook::new(vec![trade(&sbin), trade(&infy), trade(&sbin)], vec![]);
        assert_eq!(
            book.list_stocks_traded("trigger-cross"),
            vec![Symbol::new("SBIN"), Symbol::new("INFY")]
        );
        assert_eq!(book.count_stocks_traded("trigger-cross"), 2);
    }

    #[test]
    fn completed_excludes_cancelled() {
        let now = Utc.with_ymd_and_hms(2024, 3, 12, 9, 0, 0).unwrap();
        let mut done = trade(&signal("SBIN", true));
        done.close(TradeState::TargetHit, now).unwrap();
        let mut cancelled = trade(&signal("INFY", true));
        cancelled.close(TradeState::Cancelled, now).unwrap();
        let open = trade(&signal("TCS", true));
        let book = TradeBook::new(vec![done, cancelled, open], vec![]);
        let broker = BrokerName::new("paper");
        assert_eq!(book.completed_trades(&broker).count(), 1);
        assert_eq!(book.active_trades(&broker).count(), 1);
    }

    #[test]
    fn watched_symbols_union() {
        let sbin = signal("SBIN", true);
        let infy = signal("INFY", true);
        let book = TradeBook::new(vec![trade(&sbin)], vec![infy]);
        let watched = book.watched_symbols();
        assert!(watched.contains(&Symbol::new("SBIN")));
        assert!(watched.contains(&Symbol::new("INFY")));
    }
}
