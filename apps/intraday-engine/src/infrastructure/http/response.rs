//! HTTP response DTOs.

use serde::{Deserialize, Serialize};

use crate::domain::order_execution::Trade;
use crate::domain::shared::{BrokerName, SignalId};
use crate::domain::trade_signal::AddOutcome;

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Health status.
    pub status: String,
    /// Application version.
    pub version: String,
}

/// Error body shared by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable reason.
    pub error: String,
}

/// Trades for one broker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradesResponse {
    /// Broker queried.
    pub broker: BrokerName,
    /// Matching trades in registration order.
    pub trades: Vec<Trade>,
}

/// Result of registering a signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddSignalResponse {
    /// ID assigned to the signal.
    pub signal_id: SignalId,
    /// `added`, `added_disabled` or `duplicate`.
    pub outcome: String,
}

impl AddSignalResponse {
    pub(super) fn new(signal_id: SignalId, outcome: AddOutcome) -> Self {
        let outcome = match outcome {
            AddOutcome::Added => "added",
            AddOutcome::AddedDisabled => "added_disabled",
            AddOutcome::Duplicate => "duplicate",
        };
        Self {
            signal_id,
            outcome: outcome.to_string(),
        }
    }
}

/// Broker session state after login/logout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerSessionResponse {
    /// Broker addressed.
    pub broker: BrokerName,
    /// Whether a session is now open.
    pub logged_in: bool,
}
