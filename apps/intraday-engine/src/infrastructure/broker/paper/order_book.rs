//! Simulated order book.
//!
//! Every state change appends a history row, the way real brokers report
//! order history; the current state is resolved with `select_latest`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::application::ports::{BrokerError, ModifyOrder};
use crate::domain::order_execution::value_objects::select_latest;
use crate::domain::order_execution::{
    OrderKind, OrderRequest, OrderSide, OrderSnapshot, OrderStatus, ProductType,
};
use crate::domain::shared::pricing::TICK_SIZE;
use crate::domain::shared::{BrokerOrderId, Symbol};

struct PaperOrder {
    order_id: BrokerOrderId,
    request: OrderRequest,
    product: ProductType,
    history: Vec<OrderSnapshot>,
}

impl PaperOrder {
    fn latest(&self) -> Option<&OrderSnapshot> {
        select_latest(&self.history)
    }

    fn is_working(&self) -> bool {
        self.latest().is_some_and(|row| !row.status.is_terminal())
    }

    fn push(&mut self, status: OrderStatus, now: DateTime<Utc>) {
        self.push_row(status, None, now);
    }

    fn fill(&mut self, price: Decimal, now: DateTime<Utc>) {
        self.push_row(OrderStatus::Complete, Some(price), now);
    }

    fn push_row(&mut self, status: OrderStatus, average_price: Option<Decimal>, now: DateTime<Utc>) {
        let quantity = self.request.quantity;
        let filled_quantity = if status == OrderStatus::Complete { quantity } else { 0 };
        self.history.push(OrderSnapshot {
            order_id: self.order_id.clone(),
            status,
            price: self.request.price,
            trigger_price: self.request.trigger_price,
            average_price,
            quantity,
            filled_quantity,
            pending_quantity: quantity - filled_quantity,
            updated_at: now,
        });
    }
}

/// In-memory order book with quote-driven fills.
pub(super) struct OrderBook {
    orders: HashMap<BrokerOrderId, PaperOrder>,
    last_prices: HashMap<Symbol, Decimal>,
    sequence: u64,
    slippage: Decimal,
}

impl OrderBook {
    pub(super) fn new(slippage_ticks: u32) -> Self {
        Self {
            orders: HashMap::new(),
            last_prices: HashMap::new(),
            sequence: 0,
            slippage: TICK_SIZE * Decimal::from(slippage_ticks),
        }
    }

    /// Accept an order and try to fill it against the last known price.
    pub(super) fn place(
        &mut self,
        request: &OrderRequest,
        product: ProductType,
        now: DateTime<Utc>,
    ) -> (BrokerOrderId, OrderStatus) {
        self.sequence += 1;
        let order_id = BrokerOrderId::new(format!("PAPER-{:06}", self.sequence));
        let mut order = PaperOrder {
            order_id: order_id.clone(),
            request: request.clone(),
            product,
            history: Vec::new(),
        };
        order.push(OrderStatus::PutOrderReqReceived, now);
        order.push(OrderStatus::ValidationPending, now);

        if request.quantity == 0 || (request.kind != OrderKind::Market && request.price.is_none()) {
            order.push(OrderStatus::Rejected, now);
        } else {
            order.push(OrderStatus::OpenPending, now);
            let resting = match request.kind {
                OrderKind::StopLossMarket => OrderStatus::TriggerPending,
                OrderKind::Market | OrderKind::Limit => OrderStatus::Open,
            };
            order.push(resting, now);
            if let Some(&cmp) = self.last_prices.get(&request.trading_symbol)
                && let Some(price) = fill_price(&order.request, cmp, self.slippage)
            {
                order.fill(price, now);
            }
        }

        let status = order.latest().map_or(OrderStatus::Unknown, |row| row.status);
        tracing::debug!(
            order_id = %order_id,
            symbol = %request.trading_symbol,
            side = ?request.side,
            kind = ?request.kind,
            product = ?order.product,
            status = %status,
            "Paper order accepted"
        );
        self.orders.insert(order_id.clone(), order);
        (order_id, status)
    }

    pub(super) fn last_price(&self, symbol: &Symbol) -> Option<Decimal> {
        self.last_prices.get(symbol).copied()
    }

    pub(super) fn modify(
        &mut self,
        order_id: &BrokerOrderId,
        changes: ModifyOrder,
        now: DateTime<Utc>,
    ) -> Result<(), BrokerError> {
        let order = self.working_order(order_id)?;
        if let Some(price) = changes.new_price {
            order.request.price = Some(price);
        }
        if let Some(quantity) = changes.new_quantity {
            order.request.quantity = quantity;
        }
        let status = order.latest().map_or(OrderStatus::Open, |row| row.status);
        order.push(status, now);
        self.fill_if_marketable(order_id, now);
        Ok(())
    }

    pub(super) fn convert_to_market(
        &mut self,
        order_id: &BrokerOrderId,
        now: DateTime<Utc>,
    ) -> Result<(), BrokerError> {
        let order = self.working_order(order_id)?;
        order.request.kind = OrderKind::Market;
        order.request.price = None;
        order.request.trigger_price = None;
        order.push(OrderStatus::Open, now);
        self.fill_if_marketable(order_id, now);
        Ok(())
    }

    pub(super) fn cancel(
        &mut self,
        order_id: &BrokerOrderId,
        now: DateTime<Utc>,
    ) -> Result<(), BrokerError> {
        self.working_order(order_id)?
            .push(OrderStatus::Cancelled, now);
        Ok(())
    }

    pub(super) fn snapshot(&self, order_id: &BrokerOrderId) -> Result<OrderSnapshot, BrokerError> {
        self.orders
            .get(order_id)
            .and_then(PaperOrder::latest)
            .cloned()
            .ok_or_else(|| BrokerError::OrderNotFound {
                order_id: order_id.to_string(),
            })
    }

    /// Record a traded price and fill every resting order it crosses.
    ///
    /// Returns the orders that filled.
    pub(super) fn on_price(
        &mut self,
        symbol: &Symbol,
        cmp: Decimal,
        now: DateTime<Utc>,
    ) -> Vec<BrokerOrderId> {
        self.last_prices.insert(symbol.clone(), cmp);
        let slippage = self.slippage;
        let mut filled = Vec::new();
        for (order_id, order) in &mut self.orders {
            if &order.request.trading_symbol != symbol || !order.is_working() {
                continue;
            }
            if let Some(price) = fill_price(&order.request, cmp, slippage) {
                order.fill(price, now);
                filled.push(order_id.clone());
            }
        }
        filled
    }

    fn working_order(&mut self, order_id: &BrokerOrderId) -> Result<&mut PaperOrder, BrokerError> {
        let order = self
            .orders
            .get_mut(order_id)
            .ok_or_else(|| BrokerError::OrderNotFound {
                order_id: order_id.to_string(),
            })?;
        if order.is_working() {
            Ok(order)
        } else {
            Err(BrokerError::OrderRejected {
                reason: format!("order {order_id} is no longer working"),
            })
        }
    }

    fn fill_if_marketable(&mut self, order_id: &BrokerOrderId, now: DateTime<Utc>) {
        let slippage = self.slippage;
        let Some(order) = self.orders.get_mut(order_id) else {
            return;
        };
        if let Some(&cmp) = self.last_prices.get(&order.request.trading_symbol)
            && let Some(price) = fill_price(&order.request, cmp, slippage)
        {
            order.fill(price, now);
        }
    }
}

/// Execution price for `request` at `cmp`, or `None` if it does not fill.
fn fill_price(request: &OrderRequest, cmp: Decimal, slippage: Decimal) -> Option<Decimal> {
    let adverse = |price: Decimal| match request.side {
        OrderSide::Buy => price + slippage,
        OrderSide::Sell => (price - slippage).max(TICK_SIZE),
    };
    match request.kind {
        OrderKind::Market => Some(adverse(cmp)),
        OrderKind::Limit => match (request.side, request.price) {
            (OrderSide::Buy, Some(limit)) if cmp <= limit => Some(cmp),
            (OrderSide::Sell, Some(limit)) if cmp >= limit => Some(cmp),
            _ => None,
        },
        OrderKind::StopLossMarket => match (request.side, request.trigger_price) {
            (OrderSide::Buy, Some(trigger)) if cmp >= trigger => Some(adverse(cmp)),
            (OrderSide::Sell, Some(trigger)) if cmp <= trigger => Some(adverse(cmp)),
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 12, 4, 30, 0).unwrap()
    }

    fn buy_limit(price: Decimal) -> OrderRequest {
        OrderRequest::limit("NSE", Symbol::new("INFY"), OrderSide::Buy, 10, price)
    }

    #[test]
    fn resting_limit_reports_open() {
        let mut book = OrderBook::new(0);
        let (order_id, status) = book.place(&buy_limit(dec!(100)), ProductType::Intraday, now());
        assert_eq!(status, OrderStatus::Open);
        assert_eq!(book.snapshot(&order_id).unwrap().pending_quantity, 10);
    }

    #[test]
    fn buy_limit_fills_when_price_drops_to_it() {
        let mut book = OrderBook::new(0);
        let (order_id, _) = book.place(&buy_limit(dec!(100)), ProductType::Intraday, now());

        assert!(book.on_price(&Symbol::new("INFY"), dec!(100.5), now()).is_empty());
        assert_eq!(book.on_price(&Symbol::new("INFY"), dec!(99.9), now()), vec![order_id.clone()]);

        let snapshot = book.snapshot(&order_id).unwrap();
        assert_eq!(snapshot.status, OrderStatus::Complete);
        assert_eq!(snapshot.average_price, Some(dec!(99.9)));
        assert_eq!(snapshot.filled_quantity, 10);
    }

    #[test]
    fn sell_stop_triggers_with_slippage() {
        let mut book = OrderBook::new(2);
        book.on_price(&Symbol::new("INFY"), dec!(100), now());
        let request = OrderRequest::stop_loss(
            "NSE",
            Symbol::new("INFY"),
            OrderSide::Sell,
            10,
            dec!(95),
            dec!(94.95),
        );
        let (order_id, status) = book.place(&request, ProductType::Intraday, now());
        assert_eq!(status, OrderStatus::TriggerPending);

        book.on_price(&Symbol::new("INFY"), dec!(94.9), now());
        assert_eq!(book.snapshot(&order_id).unwrap().average_price, Some(dec!(94.8)));
    }

    #[test]
    fn cancelled_order_cannot_be_modified() {
        let mut book = OrderBook::new(0);
        let (order_id, _) = book.place(&buy_limit(dec!(100)), ProductType::Intraday, now());
        book.cancel(&order_id, now()).unwrap();

        assert_eq!(book.snapshot(&order_id).unwrap().status, OrderStatus::Cancelled);
        assert!(matches!(
            book.modify(&order_id, ModifyOrder::price(dec!(101)), now()),
            Err(BrokerError::OrderRejected { .. })
        ));
    }

    #[test]
    fn modify_to_marketable_price_fills() {
        let mut book = OrderBook::new(0);
        book.on_price(&Symbol::new("INFY"), dec!(100.2), now());
        let (order_id, _) = book.place(&buy_limit(dec!(100)), ProductType::Intraday, now());

        book.modify(&order_id, ModifyOrder::price(dec!(100.3)), now()).unwrap();

        let snapshot = book.snapshot(&order_id).unwrap();
        assert_eq!(snapshot.status, OrderStatus::Complete);
        assert_eq!(snapshot.price, Some(dec!(100.3)));
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let mut book = OrderBook::new(0);
        let mut request = buy_limit(dec!(100));
        request.quantity = 0;
        let (_, status) = book.place(&request, ProductType::Intraday, now());
        assert_eq!(status, OrderStatus::Rejected);
    }
}
