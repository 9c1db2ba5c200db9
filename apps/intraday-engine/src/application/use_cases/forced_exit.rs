//! Forced Exit Use Case
//!
//! Square-off pass for one trade near the end of the session. The pass only
//! issues orders; the following tracking pass observes the fills and closes
//! the trade with a "SQUARE OFF" reason.

use std::sync::Arc;

use crate::application::ports::{BrokerPort, Clock};
use crate::domain::order_execution::{
    LegState, OrderKind, OrderLeg, OrderRequest, Trade, exit_reason,
};
use crate::error::EngineError;

/// Use case for squaring off open positions.
pub struct ForcedExitUseCase {
    clock: Arc<dyn Clock>,
}

impl ForcedExitUseCase {
    /// Create a new `ForcedExitUseCase`.
    pub const fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Issue the orders that take `trade` flat.
    ///
    /// - unfilled entry: cancelled; the broker's next report decides whether
    ///   the trade closes or the executed part becomes the position
    /// - working target: converted to market
    /// - no target, or a dead one: market exit for the open quantity
    ///
    /// The trade is marked "SQUARE OFF" only once an exit order is sent.
    /// Returns whether anything was sent.
    ///
    /// # Errors
    ///
    /// Returns error if a broker call fails; the caller retries on the next
    /// round.
    pub async fn square_off(
        &self,
        broker: &dyn BrokerPort,
        trade: &mut Trade,
    ) -> Result<bool, EngineError> {
        if !trade.is_active() {
            return Ok(false);
        }

        if !trade.is_entry_complete() {
            if trade.entry_order.is_terminal() {
                return Ok(false);
            }
            broker.cancel_order(&trade.entry_order.order_id).await?;
            tracing::info!(
                trade_id = %trade.id,
                symbol = %trade.trading_symbol,
                order_id = %trade.entry_order.order_id,
                "Square-off cancel sent for unfilled entry"
            );
            return Ok(true);
        }

        match trade.target_order.as_mut() {
            Some(target) if target.state == LegState::Complete => Ok(false),
            Some(target) if !target.is_terminal() => {
                if target.kind == OrderKind::Market {
                    return Ok(false);
                }
                broker.modify_order_to_market(&target.order_id).await?;
                target.record_market_conversion(self.clock.now());
                tracing::info!(
                    trade_id = %trade.id,
                    symbol = %trade.trading_symbol,
                    order_id = %target.order_id,
                    "Square-off converted target to market"
                );
                mark_square_off(trade);
                Ok(true)
            }
            _ => {
                self.place_market_exit(broker, trade).await?;
                mark_square_off(trade);
                Ok(true)
            }
        }
    }

    async fn place_market_exit(
        &self,
        broker: &dyn BrokerPort,
        trade: &mut Trade,
    ) -> Result<(), EngineError> {
        let quantity = match trade.sl_order.as_ref() {
            Some(sl) if !trade.is_broker_managed() => broker.get_order(&sl.order_id).await?.quantity,
            _ => trade.filled_quantity,
        };
        let request = OrderRequest::market(
            trade.exchange.clone(),
            trade.trading_symbol.clone(),
            trade.trade_type.exit_side(),
            quantity,
        );

        let ack = broker.place_order(&request, trade.product).await?;
        tracing::info!(
            trade_id = %trade.id,
            symbol = %trade.trading_symbol,
            quantity,
            order_id = %ack.order_id,
            "Square-off market exit placed"
        );
        trade.target_order = Some(OrderLeg::placed(ack.order_id, &request, self.clock.now()));
        Ok(())
    }
}

fn mark_square_off(trade: &mut Trade) {
    if !trade.exit_reason().contains(exit_reason::SQUARE_OFF) {
        trade.exit_reason = Some(exit_reason::SQUARE_OFF.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::BrokerError;
    use crate::application::use_cases::TrackTradeUseCase;
    use crate::application::use_cases::test_support::{
        ScriptedBroker, fixed_clock, long_signal, open_trade,
    };
    use crate::domain::order_execution::services::{ChargeSchedule, RepricePolicy};
    use crate::domain::order_execution::{OrderStatus, TradeState};
    use rust_decimal_macros::dec;

    fn use_cases() -> (ForcedExitUseCase, TrackTradeUseCase) {
        let clock = fixed_clock();
        (
            ForcedExitUseCase::new(clock.clone()),
            TrackTradeUseCase::new(clock, RepricePolicy::default(), ChargeSchedule::default()),
        )
    }

    fn outage() -> BrokerError {
        BrokerError::ConnectionError {
            message: "socket closed".to_string(),
        }
    }

    #[tokio::test]
    async fn unfilled_entry_is_cancelled() {
        let broker = ScriptedBroker::new();
        let (exit, tracker) = use_cases();
        let mut trade = open_trade(&broker, &long_signal()).await;

        assert!(exit.square_off(&broker, &mut trade).await.unwrap());
        assert!(broker.cancelled().contains(&trade.entry_order.order_id));
        assert!(!trade.entry_order.is_terminal(), "broker report decides");
        assert_eq!(trade.exit_reason(), "");

        let outcome = tracker.track(&broker, &mut trade, None).await;
        assert_eq!(outcome.closed, Some(TradeState::Cancelled));
        assert!(trade.is_cancelled());
        assert_eq!(trade.exit_reason(), "");
    }

    #[tokio::test]
    async fn partly_filled_entry_keeps_executed_quantity_and_is_squared_off() {
        let broker = ScriptedBroker::new();
        let (exit, tracker) = use_cases();
        let mut trade = open_trade(&broker, &long_signal()).await;
        broker.partial_fill(&trade.entry_order.order_id, 5, dec!(100));

        assert!(exit.square_off(&broker, &mut trade).await.unwrap());
        let outcome = tracker.track(&broker, &mut trade, None).await;

        assert!(outcome.closed.is_none());
        assert!(trade.is_active());
        assert!(trade.is_entry_complete());
        assert_eq!(trade.entry, Some(dec!(100)));
        assert_eq!(trade.filled_quantity, 5);
        assert!(trade.order_complete_at.is_some());
        assert_eq!(trade.sl_order.as_ref().unwrap().quantity, 5);
        assert_eq!(trade.target_order.as_ref().unwrap().quantity, 5);

        assert!(exit.square_off(&broker, &mut trade).await.unwrap());
        let target_id = trade.target_order.as_ref().unwrap().order_id.clone();
        assert_eq!(broker.converted_to_market(), vec![target_id.clone()]);
        broker.fill(&target_id, dec!(101));
        let outcome = tracker.track(&broker, &mut trade, None).await;

        assert_eq!(outcome.closed, Some(TradeState::SquareOff));
        assert_eq!(trade.exit, Some(dec!(101)));
        assert_eq!(trade.profit_loss, dec!(5));
    }

    #[tokio::test]
    async fn fill_landing_before_entry_cancel_is_squared_off() {
        let broker = ScriptedBroker::new();
        let (exit, tracker) = use_cases();
        let mut trade = open_trade(&broker, &long_signal()).await;
        let entry_id = trade.entry_order.order_id.clone();

        assert!(exit.square_off(&broker, &mut trade).await.unwrap());
        broker.fill(&entry_id, dec!(100));

        let mut closed = None;
        for _ in 0..3 {
            closed = tracker.track(&broker, &mut trade, None).await.closed;
            if closed.is_some() {
                break;
            }
            exit.square_off(&broker, &mut trade).await.unwrap();
            if let Some(target) = trade.target_order.as_ref()
                && target.kind == OrderKind::Market
            {
                broker.fill(&target.order_id, dec!(100.5));
            }
        }

        assert_eq!(closed, Some(TradeState::SquareOff));
        assert_eq!(trade.entry_order.state, LegState::Complete);
        assert_eq!(trade.filled_quantity, 10);
        assert_eq!(trade.exit, Some(dec!(100.5)));
    }

    #[tokio::test]
    async fn market_exit_is_watched_while_stop_loss_placement_fails() {
        let broker = ScriptedBroker::new();
        let (exit, tracker) = use_cases();
        let mut trade = open_trade(&broker, &long_signal()).await;
        broker.fill(&trade.entry_order.order_id, dec!(100));
        broker.fail_next_place(outage());
        tracker.track(&broker, &mut trade, None).await;
        assert!(trade.sl_order.is_none());
        assert!(trade.target_order.is_none());

        assert!(exit.square_off(&broker, &mut trade).await.unwrap());
        let market_exit = trade.target_order.as_ref().unwrap();
        assert_eq!(market_exit.kind, OrderKind::Market);
        assert_eq!(market_exit.quantity, 10);
        let exit_id = market_exit.order_id.clone();

        broker.fill(&exit_id, dec!(99));
        broker.fail_next_place(outage());
        let outcome = tracker.track(&broker, &mut trade, None).await;

        assert_eq!(outcome.closed, Some(TradeState::SquareOff));
        assert!(trade.sl_order.is_none());
        assert_eq!(trade.exit, Some(dec!(99)));
    }

    #[tokio::test]
    async fn working_target_is_converted_to_market_and_closes_as_square_off() {
        let broker = ScriptedBroker::new();
        let (exit, tracker) = use_cases();
        let mut trade = open_trade(&broker, &long_signal()).await;
        broker.fill(&trade.entry_order.order_id, dec!(100));
        tracker.track(&broker, &mut trade, None).await;
        let target_id = trade.target_order.as_ref().unwrap().order_id.clone();
        let sl_id = trade.sl_order.as_ref().unwrap().order_id.clone();

        assert!(exit.square_off(&broker, &mut trade).await.unwrap());
        assert_eq!(broker.converted_to_market(), vec![target_id.clone()]);
        assert_eq!(trade.target_order.as_ref().unwrap().kind, OrderKind::Market);

        broker.fill(&target_id, dec!(101));
        let outcome = tracker.track(&broker, &mut trade, None).await;

        assert_eq!(outcome.closed, Some(TradeState::SquareOff));
        assert_eq!(trade.exit_reason(), exit_reason::SQUARE_OFF);
        assert!(broker.cancelled().contains(&sl_id));
        assert!(trade.sl_order.as_ref().unwrap().is_terminal());
        assert!(trade.target_order.as_ref().unwrap().is_terminal());
    }

    #[tokio::test]
    async fn missing_target_gets_market_exit_for_stop_loss_quantity() {
        let broker = ScriptedBroker::new();
        let (exit, tracker) = use_cases();
        let mut signal = long_signal();
        signal.no_target = true;
        let mut trade = open_trade(&broker, &signal).await;
        broker.fill(&trade.entry_order.order_id, dec!(100));
        tracker.track(&broker, &mut trade, None).await;
        assert!(trade.target_order.is_none());

        exit.square_off(&broker, &mut trade).await.unwrap();

        let market_exit = trade.target_order.as_ref().unwrap();
        assert_eq!(market_exit.kind, OrderKind::Market);
        assert_eq!(market_exit.quantity, 10);
    }

    #[tokio::test]
    async fn rejected_target_is_replaced() {
        let broker = ScriptedBroker::new();
        let (exit, tracker) = use_cases();
        let mut trade = open_trade(&broker, &long_signal()).await;
        broker.fill(&trade.entry_order.order_id, dec!(100));
        tracker.track(&broker, &mut trade, None).await;
        let old_target = trade.target_order.as_ref().unwrap().order_id.clone();
        broker.set_status(&old_target, OrderStatus::Rejected);
        tracker.track(&broker, &mut trade, None).await;
        assert!(trade.is_active(), "stop-loss still working");

        exit.square_off(&broker, &mut trade).await.unwrap();

        let replacement = trade.target_order.as_ref().unwrap();
        assert_ne!(replacement.order_id, old_target);
        assert_eq!(replacement.kind, OrderKind::Market);
    }

    #[tokio::test]
    async fn closed_trade_needs_nothing() {
        let broker = ScriptedBroker::new();
        let (exit, tracker) = use_cases();
        let mut trade = open_trade(&broker, &long_signal()).await;
        broker.set_status(&trade.entry_order.order_id, OrderStatus::Rejected);
        tracker.track(&broker, &mut trade, None).await;

        assert!(!exit.square_off(&broker, &mut trade).await.unwrap());
        assert_eq!(trade.exit_reason(), "");
    }
}
