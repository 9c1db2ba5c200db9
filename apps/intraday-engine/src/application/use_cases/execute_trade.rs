//! Execute Trade Use Case
//!
//! Turns a triggered signal into an entry order. This is the only broker
//! call whose failure is surfaced to the caller: when it fails no trade
//! exists.

use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::application::ports::{BrokerPort, Clock};
use crate::domain::order_execution::{OrderLeg, OrderRequest, OrderStatus, ProductType, Trade};
use crate::domain::shared::pricing::{price_delta, round_to_tick};
use crate::domain::trade_signal::TradeSignal;
use crate::error::EngineError;

/// Validated entry, ready to send.
#[derive(Debug, Clone)]
pub struct EntryPlan {
    /// Signal being executed.
    pub signal: TradeSignal,
    /// Entry order.
    pub request: OrderRequest,
    /// Broker product.
    pub product: ProductType,
}

/// Entry limit price for a signal.
///
/// A positive buffer percentage wins over the tick delta; with neither the
/// trigger itself is used.
#[must_use]
pub fn entry_price(signal: &TradeSignal) -> Decimal {
    let direction = if signal.is_buy { Decimal::ONE } else { Decimal::NEGATIVE_ONE };
    if signal.limit_order_buffer_percentage > Decimal::ZERO {
        let buffer = signal.trigger * signal.limit_order_buffer_percentage / dec!(100);
        round_to_tick(signal.trigger + direction * buffer)
    } else if signal.place_order_with_delta_price {
        round_to_tick(signal.trigger + direction * price_delta(signal.trigger))
    } else {
        signal.trigger
    }
}

/// Use case for placing entry orders.
pub struct ExecuteTradeUseCase {
    clock: Arc<dyn Clock>,
}

impl ExecuteTradeUseCase {
    /// Create a new `ExecuteTradeUseCase`.
    pub const fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Validate a signal and build its entry order.
    ///
    /// Returns `Ok(None)` when the signal's cutoff has passed; the caller
    /// disables it.
    ///
    /// # Errors
    ///
    /// `InvariantViolation` if the signal is disabled or already triggered.
    pub fn plan(&self, signal: &TradeSignal) -> Result<Option<EntryPlan>, EngineError> {
        if signal.is_past_cutoff(self.clock.now()) {
            tracing::info!(
                signal_id = %signal.id,
                symbol = %signal.trading_symbol,
                "Signal cutoff passed, not trading"
            );
            return Ok(None);
        }
        if signal.disabled {
            return Err(EngineError::InvariantViolation(format!(
                "signal {} is disabled",
                signal.id
            )));
        }
        if signal.is_triggered {
            return Err(EngineError::InvariantViolation(format!(
                "signal {} already triggered",
                signal.id
            )));
        }

        let side = signal.trade_type().entry_side();
        let request = if signal.place_market_order {
            OrderRequest::market(
                signal.exchange(),
                signal.trading_symbol.clone(),
                side,
                signal.quantity,
            )
        } else {
            OrderRequest::limit(
                signal.exchange(),
                signal.trading_symbol.clone(),
                side,
                signal.quantity,
                entry_price(signal),
            )
        };
        let product = if signal.place_bracket_order {
            ProductType::Bracket
        } else if signal.place_cover_order {
            ProductType::Cover
        } else {
            ProductType::Intraday
        };

        Ok(Some(EntryPlan {
            signal: signal.clone(),
            request,
            product,
        }))
    }

    /// Send the entry order and open the trade.
    ///
    /// # Errors
    ///
    /// `BrokerCall` if the broker refuses the order; `OrderTerminal` if it
    /// acknowledges it as already rejected or cancelled.
    pub async fn execute(
        &self,
        broker: &dyn BrokerPort,
        plan: EntryPlan,
    ) -> Result<Trade, EngineError> {
        let ack = broker.place_order(&plan.request, plan.product).await?;
        if let Some(status @ (OrderStatus::Rejected | OrderStatus::Cancelled)) = ack.status {
            return Err(EngineError::OrderTerminal {
                order_id: ack.order_id,
                status,
            });
        }

        let now = self.clock.now();
        let entry_order = OrderLeg::placed(ack.order_id, &plan.request, now);
        let trade = Trade::from_signal(&plan.signal, plan.product, entry_order, now);
        tracing::info!(
            trade_id = %trade.id,
            symbol = %trade.trading_symbol,
            trade_type = %trade.trade_type,
            quantity = trade.quantity,
            order_id = %trade.entry_order.order_id,
            "Entry order placed"
        );
        Ok(trade)
    }
}
