//! Trade signal.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order_execution::TradeType;
use crate::domain::shared::{BrokerName, CorrelationId, SignalId, Symbol};

/// A candidate entry waiting for the market to reach its trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeSignal {
    /// Engine-assigned ID.
    #[serde(default = "SignalId::generate")]
    pub id: SignalId,
    /// Broker the trade should be placed with.
    pub broker: BrokerName,
    /// Strategy that produced the signal.
    pub strategy: String,
    /// Instrument.
    pub trading_symbol: Symbol,
    /// Exchange segment; defaults to `NSE` when absent.
    #[serde(default)]
    pub exchange: Option<String>,
    /// Long when true, short otherwise.
    pub is_buy: bool,
    /// Price that triggers the entry.
    pub trigger: Decimal,
    /// Stop-loss price.
    pub stop_loss: Decimal,
    /// Target price.
    pub target: Decimal,
    /// Shares to trade.
    pub quantity: u32,
    /// No entry may be placed after this instant.
    #[serde(default)]
    pub cutoff: Option<DateTime<Utc>>,
    /// Links this signal to its opposite-direction twin.
    #[serde(default)]
    pub correlation_id: Option<CorrelationId>,

    /// SL is managed by a trailing adjustment instead of a fixed target.
    #[serde(default)]
    pub is_trailing_sl: bool,
    /// Never place a target leg.
    #[serde(default)]
    pub no_target: bool,
    /// Allow the opposite signal to trade after this one.
    #[serde(default)]
    pub consider_opposite_trade: bool,
    /// Chase an unfilled entry with limited reprices.
    #[serde(default)]
    pub change_entry_price_if_order_not_filled: bool,
    /// Entry limit offset from the trigger, in percent. Zero disables it.
    #[serde(default)]
    pub limit_order_buffer_percentage: Decimal,
    /// Offset the entry limit by the price-scaled tick delta.
    #[serde(default)]
    pub place_order_with_delta_price: bool,
    /// Enter with a market order.
    #[serde(default)]
    pub place_market_order: bool,
    /// Enter as a broker-native cover order.
    #[serde(default)]
    pub place_cover_order: bool,
    /// Enter as a broker-native bracket order.
    #[serde(default)]
    pub place_bracket_order: bool,

    /// Will never trigger.
    #[serde(default)]
    pub disabled: bool,
    /// Entry placed.
    #[serde(default)]
    pub is_triggered: bool,
    /// Entry placement outstanding.
    #[serde(skip)]
    pub order_placement_in_progress: bool,
}

impl TradeSignal {
    /// Signal with every flag cleared.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        broker: BrokerName,
        strategy: impl Into<String>,
        trading_symbol: Symbol,
        is_buy: bool,
        trigger: Decimal,
        stop_loss: Decimal,
        target: Decimal,
        quantity: u32,
    ) -> Self {
        Self {
            id: SignalId::generate(),
            broker,
            strategy: strategy.into(),
            trading_symbol,
            exchange: None,
            is_buy,
            trigger,
            stop_loss,
            target,
            quantity,
            cutoff: None,
            correlation_id: None,
            is_trailing_sl: false,
            no_target: false,
            consider_opposite_trade: false,
            change_entry_price_if_order_not_filled: false,
            limit_order_buffer_percentage: Decimal::ZERO,
            place_order_with_delta_price: false,
            place_market_order: false,
            place_cover_order: false,
            place_bracket_order: false,
            disabled: false,
            is_triggered: false,
            order_placement_in_progress: false,
        }
    }

    /// Direction of the trade this signal opens.
    #[must_use]
    pub const fn trade_type(&self) -> TradeType {
        TradeType::from_is_buy(self.is_buy)
    }

    /// Exchange segment, defaulting to NSE.
    #[must_use]
    pub fn exchange(&self) -> &str {
        self.exchange.as_deref().unwrap_or("NSE")
    }

    /// Structural identity: broker, strategy, symbol, direction and prices.
    #[must_use]
    pub fn is_same_shape(&self, other: &Self) -> bool {
        self.broker == other.broker
            && self.strategy == other.strategy
            && self.trading_symbol == other.trading_symbol
            && self.is_buy == other.is_buy
            && self.trigger == other.trigger
            && self.stop_loss == other.stop_loss
            && self.target == other.target
    }

    /// Whether `other` is this signal's opposite-direction twin.
    ///
    /// When both carry a correlation ID they must match.
    #[must_use]
    pub fn is_opposite_of(&self, other: &Self) -> bool {
        let correlated = match (&self.correlation_id, &other.correlation_id) {
            (Some(mine), Some(theirs)) => mine == theirs,
            _ => true,
        };
        self.broker == other.broker
            && self.strategy == other.strategy
            && self.trading_symbol == other.trading_symbol
            && self.is_buy != other.is_buy
            && correlated
    }

    /// Whether the signal can still trigger.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        !self.disabled && !self.is_triggered
    }

    /// Whether the cutoff has passed.
    #[must_use]
    pub fn is_past_cutoff(&self, now: DateTime<Utc>) -> bool {
        self.cutoff.is_some_and(|cutoff| now >= cutoff)
    }
}
