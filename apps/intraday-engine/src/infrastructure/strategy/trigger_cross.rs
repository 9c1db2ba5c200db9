//! Trigger-cross reference strategy.

use crate::application::ports::Strategy;
use crate::domain::market::LiveQuote;
use crate::domain::trade_book::TradeBook;
use crate::domain::trade_signal::TradeSignal;

/// Enters when the live price crosses the signal's trigger.
///
/// Buy signals fire above the trigger, sell signals below it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerCrossStrategy {
    name: String,
    max_trades_per_day: Option<usize>,
    consider_equal: bool,
}

impl TriggerCrossStrategy {
    /// Strategy with no daily limit that fires on a strict cross.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            max_trades_per_day: None,
            consider_equal: false,
        }
    }

    /// Cap the number of distinct symbols traded per day.
    #[must_use]
    pub const fn with_max_trades_per_day(mut self, max: usize) -> Self {
        self.max_trades_per_day = Some(max);
        self
    }

    /// Also fire when the price touches the trigger exactly.
    #[must_use]
    pub const fn consider_equal(mut self, consider_equal: bool) -> Self {
        self.consider_equal = consider_equal;
        self
    }

    fn crossed(&self, signal: &TradeSignal, quote: &LiveQuote) -> bool {
        match (signal.is_buy, self.consider_equal) {
            (true, false) => quote.cmp > signal.trigger,
            (true, true) => quote.cmp >= signal.trigger,
            (false, false) => quote.cmp < signal.trigger,
            (false, true) => quote.cmp <= signal.trigger,
        }
    }

    fn under_daily_limit(&self, signal: &TradeSignal, book: &TradeBook) -> bool {
        let Some(max) = self.max_trades_per_day else {
            return true;
        };
        let traded = book.list_stocks_traded(&self.name);
        traded.contains(&signal.trading_symbol) || traded.len() < max
    }
}

impl Strategy for TriggerCrossStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn should_place_trade(&self, signal: &TradeSignal, quote: &LiveQuote, book: &TradeBook) -> bool {
        if !self.crossed(signal, quote) {
            return false;
        }
        if book.is_trade_already_placed(signal, &self.name) {
            tracing::debug!(signal_id = %signal.id, "Trade already placed for signal");
            return false;
        }
        let opposite_triggered = book
            .signals()
            .opposite_of(signal)
            .is_some_and(|opposite| opposite.is_triggered);
        if opposite_triggered && !signal.consider_opposite_trade {
            tracing::debug!(signal_id = %signal.id, "Opposite signal already triggered");
            return false;
        }
        if !self.under_daily_limit(signal, book) {
            tracing::debug!(
                strategy = %self.name,
                symbol = %signal.trading_symbol,
                "Daily symbol limit reached"
            );
            return false;
        }
        true
    }
}
