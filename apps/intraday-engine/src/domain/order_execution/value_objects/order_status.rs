//! Broker order status, normalized across brokers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Order status as reported by a broker after normalization.
///
/// Brokers report intermediate statuses (validation, put-order requests) on
/// their way to OPEN. When several history rows exist for one order, the
/// row with the highest [`priority`](Self::priority) is the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Fully executed.
    Complete,
    /// Resting at the exchange.
    Open,
    /// Accepted by the broker, not yet at the exchange.
    OpenPending,
    /// Undergoing broker-side validation.
    ValidationPending,
    /// Order request received by the broker.
    PutOrderReqReceived,
    /// Rejected by broker or exchange.
    Rejected,
    /// Cancelled.
    Cancelled,
    /// Stop order waiting for its trigger.
    TriggerPending,
    /// Any status the engine does not model.
    #[serde(other)]
    Unknown,
}

impl OrderStatus {
    /// Ranking used to pick the current row out of an order's history.
    #[must_use]
    pub const fn priority(&self) -> u8 {
        match self {
            Self::Complete | Self::Rejected | Self::Cancelled => 100,
            Self::Open | Self::TriggerPending => 99,
            Self::OpenPending => 98,
            Self::ValidationPending => 97,
            Self::PutOrderReqReceived => 96,
            Self::Unknown => 1,
        }
    }

    /// Returns true if the order can no longer change.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Rejected | Self::Cancelled)
    }

    /// Returns true if the order is live at the exchange.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self, Self::Open | Self::TriggerPending)
    }

    /// Parse a raw broker status string.
    #[must_use]
    pub fn from_broker(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().replace(' ', "_").as_str() {
            "COMPLETE" => Self::Complete,
            "OPEN" => Self::Open,
            "OPEN_PENDING" => Self::OpenPending,
            "VALIDATION_PENDING" => Self::ValidationPending,
            "PUT_ORDER_REQ_RECEIVED" => Self::PutOrderReqReceived,
            "REJECTED" => Self::Rejected,
            "CANCELLED" => Self::Cancelled,
            "TRIGGER_PENDING" => Self::TriggerPending,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Complete => write!(f, "COMPLETE"),
            Self::Open => write!(f, "OPEN"),
            Self::OpenPending => write!(f, "OPEN_PENDING"),
            Self::ValidationPending => write!(f, "VALIDATION_PENDING"),
            Self::PutOrderReqReceived => write!(f, "PUT_ORDER_REQ_RECEIVED"),
            Self::Rejected => write!(f, "REJECTED"),
            Self::Cancelled => write!(f, "CANCELLED"),
            Self::TriggerPending => write!(f, "TRIGGER_PENDING"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}
