//! Application Use Cases
//!
//! Each use case is one step of the trade lifecycle, written against the
//! ports so the reconciliation loop can drive any broker.

mod execute_trade;
mod forced_exit;
mod track_trade;

#[cfg(test)]
pub(crate) mod test_support;

pub use execute_trade::{EntryPlan, ExecuteTradeUseCase, entry_price};
pub use forced_exit::ForcedExitUseCase;
pub use track_trade::{TrackOutcome, TrackTradeUseCase};
