//! Strategy Port (Driver Port)
//!
//! Strategies decide when an untriggered signal should become a trade. The
//! engine calls back into them on every tick for a watched symbol.

use crate::domain::market::LiveQuote;
use crate::domain::trade_book::TradeBook;
use crate::domain::trade_signal::TradeSignal;

/// Decision hook implemented by each strategy.
pub trait Strategy: Send + Sync {
    /// Name signals refer to.
    fn name(&self) -> &str;

    /// Whether `signal` should be executed at this quote.
    ///
    /// `book` exposes today's trades and signals for the strategy protocol
    /// queries (already placed, stocks traded, opposite signal).
    fn should_place_trade(&self, signal: &TradeSignal, quote: &LiveQuote, book: &TradeBook) -> bool;
}
