//! Paper broker configuration.

use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Paper broker settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperConfig {
    /// Ticks of adverse slippage applied to market and stop fills.
    pub slippage_ticks: u32,
    /// Random-walk step interval.
    pub tick_interval: Duration,
    /// Starting price for symbols the walk has not seen.
    pub base_price: Decimal,
    /// Seed for the random walk, for reproducible sessions.
    pub seed: Option<u64>,
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            slippage_ticks: 0,
            tick_interval: Duration::from_secs(1),
            base_price: dec!(100),
            seed: None,
        }
    }
}
