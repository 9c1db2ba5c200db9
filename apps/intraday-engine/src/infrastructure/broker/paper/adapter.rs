//! Paper broker adapter implementing `BrokerPort` and `MarketFeedPort`.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use rust_decimal::Decimal;

use super::config::PaperConfig;
use super::order_book::OrderBook;
use crate::application::ports::{
    BrokerError, BrokerPort, Clock, FeedError, FeedListener, ListenerId, MarketFeedPort,
    ModifyOrder, OrderAck,
};
use crate::domain::market::LiveQuote;
use crate::domain::order_execution::{OrderRequest, OrderSnapshot, ProductType};
use crate::domain::shared::{BrokerName, BrokerOrderId, Symbol};
use crate::infrastructure::clock::SystemClock;

#[derive(Default)]
struct FeedState {
    connected: bool,
    subscribed: BTreeSet<Symbol>,
    listeners: HashMap<ListenerId, Arc<dyn FeedListener>>,
}

/// Simulated broker.
///
/// Orders fill only when a quote is pushed through `push_quote` (or when
/// they are marketable against the last pushed price).
pub struct PaperBroker {
    name: BrokerName,
    config: PaperConfig,
    clock: Arc<dyn Clock>,
    logged_in: AtomicBool,
    book: Mutex<OrderBook>,
    feed: RwLock<FeedState>,
    next_listener: AtomicU64,
}

impl std::fmt::Debug for PaperBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaperBroker")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("logged_in", &self.is_logged_in())
            .finish_non_exhaustive()
    }
}

impl PaperBroker {
    /// Create a paper broker with default settings.
    #[must_use]
    pub fn new(name: BrokerName) -> Self {
        Self::with_config(name, PaperConfig::default())
    }

    /// Create a paper broker.
    #[must_use]
    pub fn with_config(name: BrokerName, config: PaperConfig) -> Self {
        Self {
            name,
            book: Mutex::new(OrderBook::new(config.slippage_ticks)),
            config,
            clock: Arc::new(SystemClock),
            logged_in: AtomicBool::new(false),
            feed: RwLock::new(FeedState::default()),
            next_listener: AtomicU64::new(1),
        }
    }

    /// Use `clock` for order timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Settings this broker was built with.
    #[must_use]
    pub const fn config(&self) -> &PaperConfig {
        &self.config
    }

    /// Publish a quote: fill crossing orders, then notify listeners if the
    /// feed is connected and the symbol subscribed.
    pub fn push_quote(&self, quote: LiveQuote) {
        let filled = self
            .book
            .lock()
            .on_price(&quote.trading_symbol, quote.cmp, self.clock.now());
        for order_id in &filled {
            tracing::debug!(broker = %self.name, order_id = %order_id, cmp = %quote.cmp, "Paper order filled");
        }

        let listeners: Vec<Arc<dyn FeedListener>> = {
            let feed = self.feed.read();
            if !feed.connected || !feed.subscribed.contains(&quote.trading_symbol) {
                return;
            }
            feed.listeners.values().cloned().collect()
        };
        for listener in listeners {
            listener.on_tick(quote.clone());
        }
    }

    /// Last price pushed for `symbol`.
    #[must_use]
    pub fn last_price(&self, symbol: &Symbol) -> Option<Decimal> {
        self.book.lock().last_price(symbol)
    }

    /// Simulate a dropped connection.
    pub fn drop_connection(&self) {
        let listeners = {
            let mut feed = self.feed.write();
            if !feed.connected {
                return;
            }
            feed.connected = false;
            feed.listeners.values().cloned().collect::<Vec<_>>()
        };
        for listener in listeners {
            listener.on_disconnected();
        }
    }

    /// Symbols currently subscribed.
    #[must_use]
    pub fn subscribed_symbols(&self) -> BTreeSet<Symbol> {
        self.feed.read().subscribed.clone()
    }

    /// Number of registered feed listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.feed.read().listeners.len()
    }

    fn require_session(&self) -> Result<(), BrokerError> {
        if self.is_logged_in() {
            Ok(())
        } else {
            Err(BrokerError::NotLoggedIn)
        }
    }

    fn accept(&self, request: &OrderRequest, product: ProductType) -> Result<OrderAck, BrokerError> {
        self.require_session()?;
        let (order_id, status) = self.book.lock().place(request, product, self.clock.now());
        Ok(OrderAck {
            order_id,
            status: Some(status),
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
impl BrokerPort for PaperBroker {
    fn name(&self) -> &BrokerName {
        &self.name
    }

    async fn login(&self) -> Result<(), BrokerError> {
        self.logged_in.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn logout(&self) -> Result<(), BrokerError> {
        self.logged_in.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_logged_in(&self) -> bool {
        self.logged_in.load(Ordering::SeqCst)
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
        self.require_session()?;
        self.book.lock().modify(order_id, changes, self.clock.now())?;
        Ok(Self::ack(order_id))
    }

    async fn modify_order_to_market(
        &self,
        order_id: &BrokerOrderId,
    ) -> Result<OrderAck, BrokerError> {
        self.require_session()?;
        self.book
            .lock()
            .convert_to_market(order_id, self.clock.now())?;
        Ok(Self::ack(order_id))
    }

    async fn cancel_order(&self, order_id: &BrokerOrderId) -> Result<OrderAck, BrokerError> {
        self.require_session()?;
        self.book.lock().cancel(order_id, self.clock.now())?;
        Ok(Self::ack(order_id))
    }

    async fn get_order(&self, order_id: &BrokerOrderId) -> Result<OrderSnapshot, BrokerError> {
        self.require_session()?;
        self.book.lock().snapshot(order_id)
    }
}

#[async_trait]
impl MarketFeedPort for PaperBroker {
    async fn connect(&self) -> Result<(), FeedError> {
        let listeners: Vec<Arc<dyn FeedListener>> = {
            let mut feed = self.feed.write();
            feed.connected = true;
            feed.listeners.values().cloned().collect()
        };
        for listener in listeners {
            listener.on_connected();
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), FeedError> {
        self.drop_connection();
        self.feed.write().subscribed.clear();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.feed.read().connected
    }

    async fn register_symbols(&self, symbols: &[Symbol]) -> Result<(), FeedError> {
        let mut feed = self.feed.write();
        if !feed.connected {
            return Err(FeedError::NotConnected);
        }
        feed.subscribed.extend(symbols.iter().cloned());
        Ok(())
    }

    async fn unregister_symbols(&self, symbols: &[Symbol]) -> Result<(), FeedError> {
        let mut feed = self.feed.write();
        for symbol in symbols {
            feed.subscribed.remove(symbol);
        }
        Ok(())
    }

    fn register_listener(&self, listener: Arc<dyn FeedListener>) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.feed.write().listeners.insert(id, listener);
        id
    }

    fn unregister_listener(&self, id: ListenerId) {
        self.feed.write().listeners.remove(&id);
    }
}
