//! HTTP request DTOs.

use serde::{Deserialize, Serialize};

use crate::domain::shared::SignalId;
use crate::domain::trade_signal::TradeSignal;

/// Query string of `POST /api/v1/algo/{broker}/stop`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct StopAlgoRequest {
    /// Square off every open trade before stopping.
    #[serde(default)]
    pub exit_all: bool,
}

/// Body of `POST /api/v1/signals`.
///
/// Same shape as a stored signal; the engine-owned fields (`id`,
/// `disabled`, `is_triggered`) are reset on submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddSignalRequest(pub TradeSignal);

impl AddSignalRequest {
    /// Signal ready for registration.
    #[must_use]
    pub fn into_signal(self) -> TradeSignal {
        let mut signal = self.0;
        signal.id = SignalId::generate();
        signal.disabled = false;
        signal.is_triggered = false;
        signal.order_placement_in_progress = false;
        signal
    }
}
