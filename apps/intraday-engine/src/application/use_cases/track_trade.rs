//! Track Trade Use Case
//!
//! One reconciliation pass over a single active trade:
//!
//! 1. Entry: poll the entry order, close on cancel/reject, record the fill,
//!    or walk an unfilled limit toward the market. A cancel that arrives
//!    after a partial fill keeps the executed quantity as the position.
//! 2. Stop-loss: place it once the entry is filled, then watch for a hit.
//! 3. Target: place it after the stop-loss, then watch for a hit.
//!
//! Broker failures abort the pass for this trade only; the next tick retries.
//! A target or square-off exit already working is still watched when the
//! stop-loss step fails.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::application::ports::{BrokerPort, Clock, ModifyOrder};
use crate::domain::order_execution::services::{ChargeSchedule, RepricePolicy};
use crate::domain::order_execution::{
    LegState, OrderError, OrderKind, OrderLeg, OrderRequest, Trade, TradeState, TradeType,
    exit_reason,
};
use crate::domain::shared::SignalId;
use crate::domain::shared::pricing::{round_to_tick, stop_loss_offset};
use crate::error::EngineError;

/// What a tracking pass did to the trade.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackOutcome {
    /// Trade or one of its legs changed and should be persisted.
    pub changed: bool,
    /// Terminal state reached during this pass.
    pub closed: Option<TradeState>,
    /// Signal whose opposite must be disabled.
    pub disable_opposite_of: Option<SignalId>,
}

/// Use case for reconciling a trade against its broker.
pub struct TrackTradeUseCase {
    clock: Arc<dyn Clock>,
    reprice: RepricePolicy,
    charges: ChargeSchedule,
}

impl TrackTradeUseCase {
    /// Create a new `TrackTradeUseCase`.
    pub const fn new(clock: Arc<dyn Clock>, reprice: RepricePolicy, charges: ChargeSchedule) -> Self {
        Self {
            clock,
            reprice,
            charges,
        }
    }

    /// Charge schedule used for P&L.
    #[must_use]
    pub const fn charges(&self) -> &ChargeSchedule {
        &self.charges
    }

    /// Run one pass. Inactive trades are returned untouched.
    pub async fn track(
        &self,
        broker: &dyn BrokerPort,
        trade: &mut Trade,
        cmp: Option<Decimal>,
    ) -> TrackOutcome {
        let mut outcome = TrackOutcome::default();
        if !trade.is_active() {
            return outcome;
        }

        if let Err(e) = self.run_steps(broker, trade, cmp, &mut outcome).await {
            tracing::warn!(
                trade_id = %trade.id,
                symbol = %trade.trading_symbol,
                error = %e,
                "Trade tracking pass failed, retrying next tick"
            );
        }

        if let Some(cmp) = cmp {
            trade.mark_to_market(cmp, &self.charges);
        }
        outcome
    }

    async fn run_steps(
        &self,
        broker: &dyn BrokerPort,
        trade: &mut Trade,
        cmp: Option<Decimal>,
        outcome: &mut TrackOutcome,
    ) -> Result<(), EngineError> {
        self.track_entry(broker, trade, cmp, outcome).await?;
        if !(trade.is_active() && trade.is_entry_complete()) {
            return Ok(());
        }
        let stop_loss = self.track_stop_loss(broker, trade, outcome).await;
        // An exit order already working is watched even when the stop-loss step failed.
        if trade.is_active() && (stop_loss.is_ok() || trade.target_order.is_some()) {
            self.track_target(broker, trade, outcome).await?;
        }
        stop_loss
    }

    async fn track_entry(
        &self,
        broker: &dyn BrokerPort,
        trade: &mut Trade,
        cmp: Option<Decimal>,
        outcome: &mut TrackOutcome,
    ) -> Result<(), EngineError> {
        if trade.is_entry_complete() {
            return Ok(());
        }

        let snapshot = broker.get_order(&trade.entry_order.order_id).await?;
        let (state, changed) = apply(&mut trade.entry_order, &snapshot)?;
        outcome.changed |= changed;

        match state {
            LegState::Cancelled => {
                if trade.entry_order.adopt_partial_fill() {
                    tracing::warn!(
                        trade_id = %trade.id,
                        symbol = %trade.trading_symbol,
                        filled_quantity = trade.entry_order.filled_quantity,
                        ordered = trade.quantity,
                        "Entry cancelled after a partial fill, keeping executed quantity"
                    );
                    self.record_entry_fill(trade, outcome);
                } else {
                    self.close(trade, TradeState::Cancelled, outcome)?;
                }
            }
            LegState::Rejected => self.close(trade, TradeState::Rejected, outcome)?,
            LegState::Complete => self.record_entry_fill(trade, outcome),
            LegState::Open | LegState::Modified => {
                self.reprice_entry(broker, trade, cmp, outcome).await?;
            }
            LegState::Placed => {}
        }
        Ok(())
    }

    fn record_entry_fill(&self, trade: &mut Trade, outcome: &mut TrackOutcome) {
        let leg = &trade.entry_order;
        trade.entry = leg
            .average_price
            .or(leg.price)
            .or(Some(trade.requested_entry));
        trade.quantity = leg.quantity;
        trade.filled_quantity = if leg.filled_quantity == 0 {
            leg.quantity
        } else {
            leg.filled_quantity
        };
        trade.order_complete_at = Some(self.clock.now());
        outcome.changed = true;
        tracing::info!(
            trade_id = %trade.id,
            symbol = %trade.trading_symbol,
            entry = ?trade.entry,
            filled_quantity = trade.filled_quantity,
            "Entry order complete"
        );
    }

    async fn reprice_entry(
        &self,
        broker: &dyn BrokerPort,
        trade: &mut Trade,
        cmp: Option<Decimal>,
        outcome: &mut TrackOutcome,
    ) -> Result<(), EngineError> {
        if !trade.change_entry_price_if_order_not_filled
            || trade.entry_order.kind != OrderKind::Limit
            || trade.is_broker_managed()
        {
            return Ok(());
        }
        let Some(cmp) = cmp else {
            return Ok(());
        };

        let now = self.clock.now();
        let leg = &trade.entry_order;
        if !self
            .reprice
            .is_due(leg.last_change_at(), leg.num_modify_requests, now)
        {
            return Ok(());
        }
        let Some(new_price) =
            self.reprice
                .next_price(trade.trade_type, trade.requested_entry, cmp, leg.price)
        else {
            return Ok(());
        };

        broker
            .modify_order(&trade.entry_order.order_id, ModifyOrder::price(new_price))
            .await?;
        trade.entry_order.record_modify(new_price, now);
        outcome.changed = true;
        tracing::info!(
            trade_id = %trade.id,
            symbol = %trade.trading_symbol,
            new_price = %new_price,
            attempt = trade.entry_order.num_modify_requests,
            "Entry order repriced"
        );
        Ok(())
    }

    async fn track_stop_loss(
        &self,
        broker: &dyn BrokerPort,
        trade: &mut Trade,
        outcome: &mut TrackOutcome,
    ) -> Result<(), EngineError> {
        if trade.is_broker_managed() {
            return Ok(());
        }
        let Some(sl_order) = trade.sl_order.as_mut() else {
            return self.place_stop_loss(broker, trade, outcome).await;
        };

        let snapshot = broker.get_order(&sl_order.order_id).await?;
        let (state, changed) = apply(sl_order, &snapshot)?;
        outcome.changed |= changed;

        match state {
            LegState::Complete => {
                cancel_working(broker, trade.target_order.as_mut()).await?;
                let reason = match trade.exit_reason() {
                    "" => exit_reason::SL_HIT,
                    exit_reason::TRAILING_SL => exit_reason::TRAIL_SL_HIT,
                    other => other,
                }
                .to_string();
                let state = TradeState::for_exit(&reason, TradeState::SlHit);
                trade.exit_reason = Some(reason);
                let exit = trade.sl_order.as_ref().and_then(exit_price);
                trade.settle(exit, &self.charges);
                self.close(trade, state, outcome)?;
            }
            LegState::Cancelled | LegState::Rejected => {
                if trade.target_order.as_ref().is_none_or(OrderLeg::is_terminal) {
                    let state = if trade.exit_reason().contains(exit_reason::SQUARE_OFF) {
                        TradeState::SquareOff
                    } else {
                        TradeState::Cancelled
                    };
                    self.close(trade, state, outcome)?;
                }
            }
            LegState::Placed | LegState::Open | LegState::Modified => {
                if trade.is_trailing_sl {
                    trail_stop_loss(trade);
                }
            }
        }
        Ok(())
    }

    async fn place_stop_loss(
        &self,
        broker: &dyn BrokerPort,
        trade: &mut Trade,
        outcome: &mut TrackOutcome,
    ) -> Result<(), EngineError> {
        let quantity = if trade.filled_quantity == 0 {
            trade.quantity
        } else {
            trade.filled_quantity
        };
        let offset = stop_loss_offset(trade.stop_loss);
        let limit = match trade.trade_type {
            TradeType::Long => round_to_tick(trade.stop_loss - offset),
            TradeType::Short => round_to_tick(trade.stop_loss + offset),
        };
        let request = OrderRequest::stop_loss(
            trade.exchange.clone(),
            trade.trading_symbol.clone(),
            trade.trade_type.exit_side(),
            quantity,
            trade.stop_loss,
            limit,
        );

        let ack = broker.place_sl_order(&request, trade.product).await?;
        let now = self.clock.now();
        tracing::info!(
            trade_id = %trade.id,
            symbol = %trade.trading_symbol,
            trigger = %trade.stop_loss,
            limit = %limit,
            order_id = %ack.order_id,
            "Stop-loss order placed"
        );
        trade.sl_order = Some(OrderLeg::placed(ack.order_id, &request, now));
        trade.last_sl_updated_at = Some(now);
        outcome.changed = true;
        Ok(())
    }

    async fn track_target(
        &self,
        broker: &dyn BrokerPort,
        trade: &mut Trade,
        outcome: &mut TrackOutcome,
    ) -> Result<(), EngineError> {
        let Some(target_order) = trade.target_order.as_mut() else {
            if trade.wants_target() {
                self.place_target(broker, trade, outcome).await?;
            }
            return Ok(());
        };

        let snapshot = broker.get_order(&target_order.order_id).await?;
        let (state, changed) = apply(target_order, &snapshot)?;
        outcome.changed |= changed;

        match state {
            LegState::Complete => {
                cancel_working(broker, trade.sl_order.as_mut()).await?;
                if trade.exit_reason().is_empty() {
                    trade.exit_reason = Some(exit_reason::TARGET_HIT.to_string());
                }
                let state = TradeState::for_exit(trade.exit_reason(), TradeState::TargetHit);
                let exit = trade.target_order.as_ref().and_then(exit_price);
                trade.settle(exit, &self.charges);
                self.close(trade, state, outcome)?;
                if trade.consider_opposite_trade {
                    outcome.disable_opposite_of.clone_from(&trade.signal_id);
                }
            }
            LegState::Cancelled | LegState::Rejected => {
                if trade.sl_order.as_ref().is_none_or(OrderLeg::is_terminal) {
                    let reason = trade.exit_reason();
                    let state = if reason.contains(exit_reason::SQUARE_OFF) {
                        TradeState::SquareOff
                    } else if reason.contains("TARGET") {
                        TradeState::TargetHit
                    } else {
                        TradeState::Cancelled
                    };
                    self.close(trade, state, outcome)?;
                }
            }
            LegState::Placed | LegState::Open | LegState::Modified => {}
        }
        Ok(())
    }

    async fn place_target(
        &self,
        broker: &dyn BrokerPort,
        trade: &mut Trade,
        outcome: &mut TrackOutcome,
    ) -> Result<(), EngineError> {
        let Some(sl_order) = trade.sl_order.as_ref() else {
            return Err(OrderError::MissingLeg {
                trade_id: trade.id.clone(),
                leg: "stop-loss",
            }
            .into());
        };
        let quantity = broker.get_order(&sl_order.order_id).await?.quantity;
        let request = OrderRequest::limit(
            trade.exchange.clone(),
            trade.trading_symbol.clone(),
            trade.trade_type.exit_side(),
            quantity,
            trade.target,
        );

        let ack = broker.place_order(&request, trade.product).await?;
        tracing::info!(
            trade_id = %trade.id,
            symbol = %trade.trading_symbol,
            target = %trade.target,
            order_id = %ack.order_id,
            "Target order placed"
        );
        trade.target_order = Some(OrderLeg::placed(ack.order_id, &request, self.clock.now()));
        outcome.changed = true;
        Ok(())
    }

    fn close(
        &self,
        trade: &mut Trade,
        state: TradeState,
        outcome: &mut TrackOutcome,
    ) -> Result<(), EngineError> {
        trade.close(state, self.clock.now())?;
        outcome.closed = Some(state);
        outcome.changed = true;
        tracing::info!(
            trade_id = %trade.id,
            symbol = %trade.trading_symbol,
            state = %state,
            exit_reason = trade.exit_reason(),
            net_profit_loss = %trade.net_profit_loss,
            "Trade closed"
        );
        Ok(())
    }
}

/// Fold a broker snapshot into a leg, reporting whether its state moved.
fn apply(
    leg: &mut OrderLeg,
    snapshot: &crate::domain::order_execution::OrderSnapshot,
) -> Result<(LegState, bool), EngineError> {
    let before = leg.state;
    let state = leg.apply_snapshot(snapshot)?;
    Ok((state, state != before))
}

/// Cancel a leg unless it already finished.
async fn cancel_working(
    broker: &dyn BrokerPort,
    leg: Option<&mut OrderLeg>,
) -> Result<(), EngineError> {
    if let Some(leg) = leg
        && !leg.is_terminal()
    {
        broker.cancel_order(&leg.order_id).await?;
        leg.record_cancelled();
    }
    Ok(())
}

fn exit_price(leg: &OrderLeg) -> Option<Decimal> {
    leg.average_price.or(leg.price).or(leg.trigger_price)
}

/// Trailing stop adjustment.
///
/// Runs while the stop-loss leg is still working. Stops are not moved yet;
/// the trade keeps its initial stop-loss.
// TODO: move the stop-loss leg with the market once a trailing rule is agreed.
fn trail_stop_loss(trade: &Trade) {
    tracing::debug!(
        trade_id = %trade.id,
        stop_loss = %trade.stop_loss,
        "Trailing stop-loss left unchanged"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::test_support::{
        ScriptedBroker, fixed_clock, long_signal, open_trade,
    };
    use crate::domain::order_execution::{OrderSide, OrderStatus};
    use rust_decimal_macros::dec;

    fn tracker() -> TrackTradeUseCase {
        TrackTradeUseCase::new(
            fixed_clock(),
            RepricePolicy::default(),
            ChargeSchedule::default(),
        )
    }

    #[tokio::test]
    async fn pending_entry_places_no_protective_legs() {
        let broker = ScriptedBroker::new();
        let mut trade = open_trade(&broker, &long_signal()).await;

        let outcome = tracker().track(&broker, &mut trade, Some(dec!(99))).await;

        assert!(outcome.closed.is_none());
        assert!(trade.sl_order.is_none());
        assert!(trade.target_order.is_none());
        assert_eq!(broker.placed().len(), 1);
    }

    #[tokio::test]
    async fn filled_entry_gets_stop_loss_then_target() {
        let broker = ScriptedBroker::new();
        let mut trade = open_trade(&broker, &long_signal()).await;
        broker.fill(&trade.entry_order.order_id, dec!(100.05));

        let tracker = tracker();
        tracker.track(&broker, &mut trade, Some(dec!(100.10))).await;

        assert_eq!(trade.entry, Some(dec!(100.05)));
        assert_eq!(trade.filled_quantity, 10);
        let sl = trade.sl_order.as_ref().unwrap();
        assert_eq!(sl.side, OrderSide::Sell);
        assert_eq!(sl.trigger_price, Some(dec!(95)));
        assert_eq!(sl.price, Some(dec!(94.95)));
        let target = trade.target_order.as_ref().unwrap();
        assert_eq!(target.price, Some(dec!(110)));
        assert_eq!(target.quantity, 10);
    }

    #[tokio::test]
    async fn cancelled_entry_closes_trade() {
        let broker = ScriptedBroker::new();
        let mut trade = open_trade(&broker, &long_signal()).await;
        broker.set_status(&trade.entry_order.order_id, OrderStatus::Cancelled);

        let outcome = tracker().track(&broker, &mut trade, None).await;

        assert_eq!(outcome.closed, Some(TradeState::Cancelled));
        assert!(trade.is_cancelled());
        assert!(trade.end_timestamp.is_some());
    }

    #[tokio::test]
    async fn stop_loss_hit_cancels_target_and_settles() {
        let broker = ScriptedBroker::new();
        let tracker = tracker();
        let mut trade = open_trade(&broker, &long_signal()).await;
        broker.fill(&trade.entry_order.order_id, dec!(100));
        tracker.track(&broker, &mut trade, None).await;

        let sl_id = trade.sl_order.as_ref().unwrap().order_id.clone();
        let target_id = trade.target_order.as_ref().unwrap().order_id.clone();
        broker.fill(&sl_id, dec!(95));

        let outcome = tracker.track(&broker, &mut trade, None).await;

        assert_eq!(outcome.closed, Some(TradeState::SlHit));
        assert_eq!(trade.exit_reason(), exit_reason::SL_HIT);
        assert_eq!(trade.exit, Some(dec!(95)));
        assert_eq!(trade.profit_loss, dec!(-50));
        assert!(broker.cancelled().contains(&target_id));
    }

    #[tokio::test]
    async fn target_hit_requests_opposite_disable() {
        let broker = ScriptedBroker::new();
        let tracker = tracker();
        let mut signal = long_signal();
        signal.consider_opposite_trade = true;
        let mut trade = open_trade(&broker, &signal).await;
        broker.fill(&trade.entry_order.order_id, dec!(100));
        tracker.track(&broker, &mut trade, None).await;

        let target_id = trade.target_order.as_ref().unwrap().order_id.clone();
        broker.fill(&target_id, dec!(110));

        let outcome = tracker.track(&broker, &mut trade, None).await;

        assert_eq!(outcome.closed, Some(TradeState::TargetHit));
        assert_eq!(outcome.disable_opposite_of, Some(signal.id.clone()));
        assert_eq!(trade.exit_reason(), exit_reason::TARGET_HIT);
        assert!(trade.sl_order.as_ref().unwrap().is_terminal());
    }

    #[tokio::test]
    async fn unfilled_entry_is_repriced_within_cap() {
        let broker = ScriptedBroker::new();
        let clock = fixed_clock();
        let tracker = TrackTradeUseCase::new(
            clock.clone(),
            RepricePolicy::default(),
            ChargeSchedule::default(),
        );
        let mut signal = long_signal();
        signal.change_entry_price_if_order_not_filled = true;
        let mut trade = open_trade(&broker, &signal).await;
        broker.set_status(&trade.entry_order.order_id, OrderStatus::Open);

        tracker.track(&broker, &mut trade, Some(dec!(101))).await;
        assert!(broker.modified().is_empty(), "interval has not elapsed");

        clock.advance(chrono::TimeDelta::seconds(21));
        tracker.track(&broker, &mut trade, Some(dec!(101))).await;

        assert_eq!(broker.modified().len(), 1);
        assert_eq!(trade.entry_order.price, Some(dec!(100.30)));
        assert_eq!(trade.entry_order.num_modify_requests, 1);
        assert_eq!(trade.entry_order.state, LegState::Modified);
    }

    #[tokio::test]
    async fn broker_failure_leaves_trade_active() {
        let broker = ScriptedBroker::new();
        let mut trade = open_trade(&broker, &long_signal()).await;
        broker.fail_get_order(true);

        let outcome = tracker().track(&broker, &mut trade, None).await;

        assert!(outcome.closed.is_none());
        assert!(trade.is_active());
    }

    #[tokio::test]
    async fn closed_trade_is_left_alone() {
        let broker = ScriptedBroker::new();
        let tracker = tracker();
        let mut trade = open_trade(&broker, &long_signal()).await;
        broker.set_status(&trade.entry_order.order_id, OrderStatus::Rejected);
        tracker.track(&broker, &mut trade, None).await;
        let before = trade.clone();

        let outcome = tracker.track(&broker, &mut trade, Some(dec!(120))).await;

        assert_eq!(outcome, TrackOutcome::default());
        assert_eq!(trade, before);
    }

    #[tokio::test]
    async fn failed_target_cancel_after_stop_loss_hit_is_retried() {
        let broker = ScriptedBroker::new();
        let tracker = tracker();
        let mut trade = open_trade(&broker, &long_signal()).await;
        broker.fill(&trade.entry_order.order_id, dec!(100));
        tracker.track(&broker, &mut trade, None).await;
        let sl_id = trade.sl_order.as_ref().unwrap().order_id.clone();
        let target_id = trade.target_order.as_ref().unwrap().order_id.clone();

        broker.fill(&sl_id, dec!(95));
        broker.fail_next_cancel(crate::application::ports::BrokerError::RateLimited);
        let outcome = tracker.track(&broker, &mut trade, None).await;

        assert!(outcome.closed.is_none());
        assert!(trade.is_active());
        assert_eq!(trade.sl_order.as_ref().unwrap().state, LegState::Complete);
        assert!(!trade.target_order.as_ref().unwrap().is_terminal());
        assert!(broker.cancelled().is_empty());

        let outcome = tracker.track(&broker, &mut trade, None).await;

        assert_eq!(outcome.closed, Some(TradeState::SlHit));
        assert_eq!(broker.cancelled(), vec![target_id]);
        assert_eq!(trade.exit, Some(dec!(95)));
        assert_eq!(trade.exit_reason(), exit_reason::SL_HIT);
    }

    #[tokio::test]
    async fn partly_filled_entry_cancelled_by_broker_becomes_position() {
        let broker = ScriptedBroker::new();
        let mut trade = open_trade(&broker, &long_signal()).await;
        let entry_id = trade.entry_order.order_id.clone();
        broker.partial_fill(&entry_id, 3, dec!(99.9));
        broker.set_status(&entry_id, OrderStatus::Cancelled);

        let outcome = tracker().track(&broker, &mut trade, None).await;

        assert!(outcome.closed.is_none());
        assert!(outcome.changed);
        assert_eq!(trade.entry_order.state, LegState::Complete);
        assert_eq!(trade.quantity, 3);
        assert_eq!(trade.filled_quantity, 3);
        assert_eq!(trade.entry, Some(dec!(99.9)));
        assert_eq!(trade.sl_order.as_ref().unwrap().quantity, 3);
    }
}
