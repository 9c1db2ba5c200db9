//! Trade terminal state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Human-readable exit annotations kept on the trade.
pub mod exit_reason {
    /// Stop-loss executed.
    pub const SL_HIT: &str = "SL HIT";
    /// Stop-loss executed while a trailing square-off was in progress.
    pub const TRAIL_SL_HIT: &str = "TRAIL SL HIT";
    /// Target executed.
    pub const TARGET_HIT: &str = "TARGET HIT";
    /// Forced exit before session close.
    pub const SQUARE_OFF: &str = "SQUARE OFF";
    /// Trailing stop adjustment in progress.
    pub const TRAILING_SL: &str = "TRAILING SL";
}

/// Where a trade is in its life. Everything except `Active` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeState {
    /// Position open or entry pending.
    #[default]
    Active,
    /// Closed by the stop-loss leg.
    SlHit,
    /// Closed by the target leg.
    TargetHit,
    /// Closed by the forced exit.
    SquareOff,
    /// Entry or protective legs cancelled.
    Cancelled,
    /// Entry rejected.
    Rejected,
}

impl TradeState {
    /// Returns true once the trade is closed.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Active)
    }

    /// Terminal state for a closing reason annotation.
    #[must_use]
    pub fn for_exit(reason: &str, default: Self) -> Self {
        if reason.contains(exit_reason::SQUARE_OFF) {
            Self::SquareOff
        } else {
            default
        }
    }
}

impl fmt::Display for TradeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "ACTIVE"),
            Self::SlHit => write!(f, "SL_HIT"),
            Self::TargetHit => write!(f, "TARGET_HIT"),
            Self::SquareOff => write!(f, "SQUARE_OFF"),
            Self::Cancelled => write!(f, "CANCELLED"),
            Self::Rejected => write!(f, "REJECTED"),
        }
    }
}
