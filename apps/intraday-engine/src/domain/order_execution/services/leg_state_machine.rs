//! Leg State Machine Service
//!
//! Validates leg transitions driven by broker status reports.

use crate::domain::order_execution::errors::OrderError;
use crate::domain::order_execution::value_objects::LegState;

/// Leg state machine for validating transitions.
pub struct LegStateMachine;

impl LegStateMachine {
    /// Check if a state transition is valid.
    #[must_use]
    pub fn is_valid_transition(from: LegState, to: LegState) -> bool {
        matches!(
            (from, to),
            // From Placed
            (LegState::Placed, LegState::Placed)
                | (LegState::Placed, LegState::Open)
                | (LegState::Placed, LegState::Complete)
                | (LegState::Placed, LegState::Cancelled)
                | (LegState::Placed, LegState::Rejected)
                // From Open
                | (LegState::Open, LegState::Open)
                | (LegState::Open, LegState::Modified)
                | (LegState::Open, LegState::Complete)
                | (LegState::Open, LegState::Cancelled)
                | (LegState::Open, LegState::Rejected)
                // From Modified
                | (LegState::Modified, LegState::Open)
                | (LegState::Modified, LegState::Modified)
                | (LegState::Modified, LegState::Complete)
                | (LegState::Modified, LegState::Cancelled)
                | (LegState::Modified, LegState::Rejected)
                // A fill outruns a cancel the engine already recorded
                | (LegState::Cancelled, LegState::Complete)
        )
    }

    /// Resolve the state a leg moves to when the broker reports `reported`.
    ///
    /// A pending report after the leg reached the exchange keeps the current
    /// state. Terminal legs accept only a repeat of their own state, except
    /// that a cancelled leg accepts a late execution report.
    ///
    /// # Errors
    ///
    /// Returns error if the transition is invalid.
    pub fn next_state(from: LegState, reported: LegState) -> Result<LegState, OrderError> {
        if from == reported {
            return Ok(from);
        }
        if reported == LegState::Placed && matches!(from, LegState::Open | LegState::Modified) {
            return Ok(from);
        }
        if Self::is_valid_transition(from, reported) {
            Ok(reported)
        } else {
            Err(OrderError::InvalidLegTransition { from, to: reported })
        }
    }
}
