//! Per-leg lifecycle state.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::OrderStatus;

/// Lifecycle of one order leg.
///
/// `NONE` is modelled by the leg being absent on the trade.
/// `PLACED → OPEN ⇄ MODIFIED → {COMPLETE | CANCELLED | REJECTED}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LegState {
    /// Accepted by the broker, not yet resting at the exchange.
    Placed,
    /// Resting at the exchange.
    Open,
    /// A modification was sent and not yet confirmed.
    Modified,
    /// Fully executed.
    Complete,
    /// Cancelled.
    Cancelled,
    /// Rejected.
    Rejected,
}

impl LegState {
    /// Leg state implied by a broker status.
    #[must_use]
    pub const fn from_status(status: OrderStatus) -> Self {
        match status {
            OrderStatus::Complete => Self::Complete,
            OrderStatus::Cancelled => Self::Cancelled,
            OrderStatus::Rejected => Self::Rejected,
            OrderStatus::Open | OrderStatus::TriggerPending => Self::Open,
            OrderStatus::OpenPending
            | OrderStatus::ValidationPending
            | OrderStatus::PutOrderReqReceived
            | OrderStatus::Unknown => Self::Placed,
        }
    }

    /// Returns true for COMPLETE, CANCELLED and REJECTED.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Cancelled | Self::Rejected)
    }

    /// Returns true while the leg can still execute.
    #[must_use]
    pub const fn is_working(&self) -> bool {
        !self.is_terminal()
    }
}

impl fmt::Display for LegState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Placed => write!(f, "PLACED"),
            Self::Open => write!(f, "OPEN"),
            Self::Modified => write!(f, "MODIFIED"),
            Self::Complete => write!(f, "COMPLETE"),
            Self::Cancelled => write!(f, "CANCELLED"),
            Self::Rejected => write!(f, "REJECTED"),
        }
    }
}
