//! Order execution errors.

use std::fmt;

use super::value_objects::{LegState, TradeState};
use crate::domain::shared::TradeId;

/// Errors raised by the trade aggregate and leg state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    /// A broker report would move a leg backwards or out of a terminal state.
    InvalidLegTransition {
        /// Current leg state.
        from: LegState,
        /// State implied by the report.
        to: LegState,
    },

    /// The trade was already closed.
    TradeAlreadyClosed {
        /// Trade ID.
        trade_id: TradeId,
        /// Terminal state it closed with.
        state: TradeState,
    },

    /// A leg required for the operation has not been placed.
    MissingLeg {
        /// Trade ID.
        trade_id: TradeId,
        /// Which leg.
        leg: &'static str,
    },
}

impl fmt::Display for OrderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidLegTransition { from, to } => {
                write!(f, "Invalid leg transition: {from} -> {to}")
            }
            Self::TradeAlreadyClosed { trade_id, state } => {
                write!(f, "Trade {trade_id} already closed as {state}")
            }
            Self::MissingLeg { trade_id, leg } => {
                write!(f, "Trade {trade_id} has no {leg} order")
            }
        }
    }
}

impl std::error::Error for OrderError {}
