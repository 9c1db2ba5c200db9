//! Signal registry.
//!
//! Holds every signal for the trading day in registration order. Signals are
//! never removed; they are disabled or triggered instead.

use chrono::{DateTime, Utc};

use super::{SignalError, TradeSignal};
use crate::domain::shared::{BrokerName, CorrelationId, SignalId, Symbol};

/// Result of registering a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// A structurally identical signal already exists; nothing changed.
    Duplicate,
    /// Registered, but disabled because its opposite already traded.
    AddedDisabled,
    /// Registered and eligible to trigger.
    Added,
}

/// In-memory signal registry.
#[derive(Debug, Clone, Default)]
pub struct SignalRegistry {
    signals: Vec<TradeSignal>,
}

impl SignalRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry restored from persisted signals.
    ///
    /// No placement survives a restart, so in-flight flags are cleared.
    #[must_use]
    pub fn from_signals(mut signals: Vec<TradeSignal>) -> Self {
        for signal in &mut signals {
            signal.order_placement_in_progress = false;
        }
        Self { signals }
    }

    /// All signals in registration order.
    #[must_use]
    pub fn signals(&self) -> &[TradeSignal] {
        &self.signals
    }

    /// Number of registered signals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.signals.len()
    }

    /// Whether no signal is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    /// Register a signal.
    pub fn add(&mut self, mut signal: TradeSignal) -> AddOutcome {
        if self.same_as(&signal).is_some() {
            return AddOutcome::Duplicate;
        }

        let opposite_blocks = self
            .opposite_of(&signal)
            .is_some_and(|opposite| opposite.is_triggered && !opposite.consider_opposite_trade);

        signal.order_placement_in_progress = false;
        if opposite_blocks {
            signal.disabled = true;
            self.signals.push(signal);
            AddOutcome::AddedDisabled
        } else {
            self.signals.push(signal);
            AddOutcome::Added
        }
    }

    /// Give `signal` a correlation ID if it has none.
    ///
    /// Inherits from an existing same-shape signal first, then from the
    /// opposite signal, and generates a fresh one otherwise.
    pub fn assign_correlation(&self, signal: &mut TradeSignal) {
        if signal.correlation_id.is_some() {
            return;
        }
        let inherited = self
            .same_as(signal)
            .and_then(|same| same.correlation_id.clone())
            .or_else(|| {
                self.opposite_of(signal)
                    .and_then(|opposite| opposite.correlation_id.clone())
            });
        signal.correlation_id = Some(inherited.unwrap_or_else(CorrelationId::generate));
    }

    /// Mark a signal triggered, disabling its opposite unless it allows
    /// the opposite trade.
    pub fn trigger(&mut self, signal_id: &SignalId) -> Result<(), SignalError> {
        let index = self.index_of(signal_id)?;
        let signal = &mut self.signals[index];
        signal.is_triggered = true;
        signal.order_placement_in_progress = false;
        let consider_opposite = signal.consider_opposite_trade;

        if !consider_opposite {
            self.disable_opposite_of(signal_id)?;
        }
        Ok(())
    }

    /// Disable a signal.
    pub fn disable(&mut self, signal_id: &SignalId) -> Result<(), SignalError> {
        let index = self.index_of(signal_id)?;
        self.signals[index].disabled = true;
        self.signals[index].order_placement_in_progress = false;
        Ok(())
    }

    /// Disable the opposite twin of a signal, if one is registered.
    ///
    /// Returns the ID of the signal that was disabled.
    pub fn disable_opposite_of(
        &mut self,
        signal_id: &SignalId,
    ) -> Result<Option<SignalId>, SignalError> {
        let index = self.index_of(signal_id)?;
        let signal = self.signals[index].clone();
        let opposite = self
            .signals
            .iter_mut()
            .find(|candidate| signal.is_opposite_of(candidate));
        Ok(opposite.map(|opposite| {
            opposite.disabled = true;
            opposite.id.clone()
        }))
    }

    /// Set or clear the in-flight placement guard.
    pub fn set_in_flight(&mut self, signal_id: &SignalId, in_flight: bool) -> Result<(), SignalError> {
        let index = self.index_of(signal_id)?;
        self.signals[index].order_placement_in_progress = in_flight;
        Ok(())
    }

    /// Look up a signal by ID.
    #[must_use]
    pub fn get(&self, signal_id: &SignalId) -> Option<&TradeSignal> {
        self.signals.iter().find(|signal| &signal.id == signal_id)
    }

    /// Opposite-direction twin of `signal`.
    #[must_use]
    pub fn opposite_of(&self, signal: &TradeSignal) -> Option<&TradeSignal> {
        self.signals
            .iter()
            .find(|candidate| signal.is_opposite_of(candidate))
    }

    /// Existing signal with the same shape as `signal`.
    #[must_use]
    pub fn same_as(&self, signal: &TradeSignal) -> Option<&TradeSignal> {
        self.signals
            .iter()
            .find(|candidate| signal.is_same_shape(candidate))
    }

    /// First signal for this symbol, direction and broker that can still trigger.
    #[must_use]
    pub fn untriggered(
        &self,
        trading_symbol: &Symbol,
        is_buy: bool,
        broker: &BrokerName,
    ) -> Option<&TradeSignal> {
        self.signals.iter().find(|signal| {
            signal.is_pending()
                && signal.is_buy == is_buy
                && &signal.trading_symbol == trading_symbol
                && &signal.broker == broker
        })
    }

    /// Symbols of every signal that can still trigger.
    pub fn pending_symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.signals
            .iter()
            .filter(|signal| signal.is_pending())
            .map(|signal| &signal.trading_symbol)
    }

    /// Disable every pending signal whose cutoff has passed.
    ///
    /// Returns how many were disabled.
    pub fn expire(&mut self, now: DateTime<Utc>) -> usize {
        let mut expired = 0;
        for signal in &mut self.signals {
            if signal.is_pending() && signal.is_past_cutoff(now) {
                signal.disabled = true;
                expired += 1;
            }
        }
        expired
    }

    fn index_of(&self, signal_id: &SignalId) -> Result<usize, SignalError> {
        self.signals
            .iter()
            .position(|signal| &signal.id == signal_id)
            .ok_or_else(|| SignalError::NotFound {
                signal_id: signal_id.clone(),
            })
    }
}
