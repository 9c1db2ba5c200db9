//! Market Context
//!
//! Live quotes and the trading session calendar.

mod live_quote;
mod session;

pub use live_quote::LiveQuote;
pub use session::{IST_OFFSET_SECS, MarketSession};
