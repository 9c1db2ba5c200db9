//! Signal registry errors.

use std::fmt;

use crate::domain::shared::SignalId;

/// Errors raised by the signal registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalError {
    /// No signal with this ID is registered.
    NotFound {
        /// Signal ID.
        signal_id: SignalId,
    },
}

impl fmt::Display for SignalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { signal_id } => write!(f, "Signal not found: {signal_id}"),
        }
    }
}

impl std::error::Error for SignalError {}
