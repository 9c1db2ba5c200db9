//! Hand-written broker double for use case tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::ExecuteTradeUseCase;
use crate::application::ports::{BrokerError, BrokerPort, ModifyOrder, OrderAck};
use crate::domain::order_execution::{
    OrderRequest, OrderSnapshot, OrderStatus, ProductType, Trade,
};
use crate::domain::shared::{BrokerName, BrokerOrderId, Symbol};
use crate::domain::trade_signal::TradeSignal;
use crate::infrastructure::clock::ManualClock;

/// Clock pinned to 2024-03-12 10:00 IST.
pub fn fixed_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 3, 12, 4, 30, 0).unwrap(),
    ))
}

/// Long signal: trigger 100, stop 95, target 110, 10 shares.
pub fn long_signal() -> TradeSignal {
    TradeSignal::new(
        BrokerName::new("paper"),
        "manual",
        Symbol::new("INFY"),
        true,
        dec!(100),
        dec!(95),
        dec!(110),
        10,
    )
}

/// Place the entry for `signal` and return the new trade.
pub async fn open_trade(broker: &ScriptedBroker, signal: &TradeSignal) -> Trade {
    let use_case = ExecuteTradeUseCase::new(fixed_clock());
    let plan = use_case.plan(signal).unwrap().unwrap();
    use_case.execute(broker, plan).await.unwrap()
}

#[derive(Default)]
struct Book {
    orders: HashMap<BrokerOrderId, OrderSnapshot>,
    placed: Vec<(OrderRequest, ProductType)>,
    modified: Vec<(BrokerOrderId, ModifyOrder)>,
    to_market: Vec<BrokerOrderId>,
    cancelled: Vec<BrokerOrderId>,
    fail_next_place: Option<BrokerError>,
    fail_next_cancel: Option<BrokerError>,
    fail_get_order: bool,
}

/// Broker whose order states are set by the test.
pub struct ScriptedBroker {
    name: BrokerName,
    next_id: AtomicU64,
    book: Mutex<Book>,
}

impl Default for ScriptedBroker {
    fn default() -> Self {
        Self {
            name: BrokerName::new("paper"),
            next_id: AtomicU64::new(1),
            book: Mutex::new(Book::default()),
        }
    }
}

impl ScriptedBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn placed(&self) -> Vec<(OrderRequest, ProductType)> {
        self.book.lock().placed.clone()
    }

    pub fn modified(&self) -> Vec<(BrokerOrderId, ModifyOrder)> {
        self.book.lock().modified.clone()
    }

    pub fn converted_to_market(&self) -> Vec<BrokerOrderId> {
        self.book.lock().to_market.clone()
    }

    pub fn cancelled(&self) -> Vec<BrokerOrderId> {
        self.book.lock().cancelled.clone()
    }

    pub fn fail_next_place(&self, error: BrokerError) {
        self.book.lock().fail_next_place = Some(error);
    }

    pub fn fail_next_cancel(&self, error: BrokerError) {
        self.book.lock().fail_next_cancel = Some(error);
    }

    pub fn fail_get_order(&self, fail: bool) {
        self.book.lock().fail_get_order = fail;
    }

    pub fn set_status(&self, order_id: &BrokerOrderId, status: OrderStatus) {
        if let Some(order) = self.book.lock().orders.get_mut(order_id) {
            order.status = status;
        }
    }

    /// Fully execute an order at `price`.
    pub fn fill(&self, order_id: &BrokerOrderId, price: Decimal) {
        if let Some(order) = self.book.lock().orders.get_mut(order_id) {
            order.status = OrderStatus::Complete;
            order.average_price = Some(price);
            order.filled_quantity = order.quantity;
            order.pending_quantity = 0;
        }
    }

    /// Execute part of an order at `price`; the rest keeps working.
    pub fn partial_fill(&self, order_id: &BrokerOrderId, quantity: u32, price: Decimal) {
        if let Some(order) = self.book.lock().orders.get_mut(order_id) {
            order.status = OrderStatus::Open;
            order.average_price = Some(price);
            order.filled_quantity = quantity;
            order.pending_quantity = order.quantity - quantity;
        }
    }

    fn accept(&self, request: &OrderRequest, product: ProductType) -> Result<OrderAck, BrokerError> {
        let mut book = self.book.lock();
        if let Some(error) = book.fail_next_place.take() {
            return Err(error);
        }
        let order_id = BrokerOrderId::new(format!(
            "ORD-{}",
            self.next_id.fetch_add(1, Ordering::Relaxed)
        ));
        book.orders.insert(
            order_id.clone(),
            OrderSnapshot {
                order_id: order_id.clone(),
                status: OrderStatus::Open,
                price: request.price,
                trigger_price: request.trigger_price,
                average_price: None,
                quantity: request.quantity,
                filled_quantity: 0,
                pending_quantity: request.quantity,
                updated_at: Utc::now(),
            },
        );
        book.placed.push((request.clone(), product));
        Ok(OrderAck {
            order_id,
            status: None,
        })
    }

    fn ack(order_id: &BrokerOrderId) -> OrderAck {
        OrderAck {
            order_id: order_id.clone(),
            status: None,
        }
    }
}

#[async_trait]
impl BrokerPort for ScriptedBroker {
    fn name(&self) -> &BrokerName {
        &self.name
    }

    async fn login(&self) -> Result<(), BrokerError> {
        Ok(())
    }

    async fn logout(&self) -> Result<(), BrokerError> {
        Ok(())
    }

    fn is_logged_in(&self) -> bool {
        true
    }

    async fn place_order(
        &self,
        request: &OrderRequest,
        product: ProductType,
    ) -> Result<OrderAck, BrokerError> {
        self.accept(request, product)
    }

    async fn place_sl_order(
        &self,
        request: &OrderRequest,
        product: ProductType,
    ) -> Result<OrderAck, BrokerError> {
        self.accept(request, product)
    }

    async fn modify_order(
        &self,
        order_id: &BrokerOrderId,
        changes: ModifyOrder,
    ) -> Result<OrderAck, BrokerError> {
        let mut book = self.book.lock();
        if let (Some(order), Some(price)) = (book.orders.get_mut(order_id), changes.new_price) {
            order.price = Some(price);
        }
        book.modified.push((order_id.clone(), changes));
        Ok(Self::ack(order_id))
    }

    async fn modify_order_to_market(
        &self,
        order_id: &BrokerOrderId,
    ) -> Result<OrderAck, BrokerError> {
        self.book.lock().to_market.push(order_id.clone());
        Ok(Self::ack(order_id))
    }

    async fn cancel_order(&self, order_id: &BrokerOrderId) -> Result<OrderAck, BrokerError> {
        let mut book = self.book.lock();
        if let Some(error) = book.fail_next_cancel.take() {
            return Err(error);
        }
        if let Some(order) = book.orders.get_mut(order_id) {
            order.status = OrderStatus::Cancelled;
            order.pending_quantity = 0;
        }
        book.cancelled.push(order_id.clone());
        Ok(Self::ack(order_id))
    }

    async fn get_order(&self, order_id: &BrokerOrderId) -> Result<OrderSnapshot, BrokerError> {
        let book = self.book.lock();
        if book.fail_get_order {
            return Err(BrokerError::ConnectionError {
                message: "scripted outage".to_string(),
            });
        }
        book.orders
            .get(order_id)
            .cloned()
            .ok_or_else(|| BrokerError::OrderNotFound {
                order_id: order_id.to_string(),
            })
    }
}
