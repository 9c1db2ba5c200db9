//! Live Quote Listener
//!
//! Wraps one broker's market feed for the engine. Feed callbacks are
//! forwarded into the engine's event channel and the quote cache; the
//! listener itself is owned by the engine task, so subscription changes are
//! serialized with everything else the engine does.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;

use crate::application::ports::{FeedError, FeedListener, ListenerId, MarketFeedPort};
use crate::domain::market::LiveQuote;
use crate::domain::shared::Symbol;

/// Latest quote per symbol. Replaced wholesale on every tick.
pub type QuoteCache = Arc<RwLock<HashMap<Symbol, LiveQuote>>>;

/// Feed callback forwarded to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEvent {
    /// Attachment that produced the event; stale generations are ignored.
    pub generation: u64,
    /// What happened.
    pub kind: FeedEventKind,
}

/// Feed callback kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEventKind {
    /// Feed is up.
    Connected,
    /// Feed dropped.
    Disconnected,
    /// New quote cached for this symbol.
    Tick(Symbol),
}

/// `FeedListener` registered with the broker feed.
///
/// Writes ticks into the quote cache and notifies the engine. Never blocks.
pub struct FeedForwarder {
    generation: u64,
    events: mpsc::UnboundedSender<FeedEvent>,
    quotes: QuoteCache,
}

impl FeedForwarder {
    /// Create a forwarder for one feed attachment.
    #[must_use]
    pub const fn new(
        generation: u64,
        events: mpsc::UnboundedSender<FeedEvent>,
        quotes: QuoteCache,
    ) -> Self {
        Self {
            generation,
            events,
            quotes,
        }
    }

    fn forward(&self, kind: FeedEventKind) {
        let event = FeedEvent {
            generation: self.generation,
            kind,
        };
        if self.events.send(event).is_err() {
            tracing::debug!(generation = self.generation, "Engine gone, dropping feed event");
        }
    }
}

impl FeedListener for FeedForwarder {
    fn on_connected(&self) {
        self.forward(FeedEventKind::Connected);
    }

    fn on_disconnected(&self) {
        self.forward(FeedEventKind::Disconnected);
    }

    fn on_tick(&self, quote: LiveQuote) {
        let symbol = quote.trading_symbol.clone();
        self.quotes.write().insert(symbol.clone(), quote);
        self.forward(FeedEventKind::Tick(symbol));
    }
}

/// Engine-side view of the live feed.
#[derive(Default)]
pub struct QuoteListener {
    feed: Option<Arc<dyn MarketFeedPort>>,
    listener_id: Option<ListenerId>,
    connected: bool,
    symbols: BTreeSet<Symbol>,
}

impl QuoteListener {
    /// Detached listener with no registered symbols.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a feed is attached (connecting or connected).
    #[must_use]
    pub const fn is_attached(&self) -> bool {
        self.listener_id.is_some()
    }

    /// Whether the attached feed reported itself connected.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.connected
    }

    /// Explicitly registered symbols.
    #[must_use]
    pub const fn symbols(&self) -> &BTreeSet<Symbol> {
        &self.symbols
    }

    /// Register `forwarder` on `feed` and open the connection.
    ///
    /// # Errors
    ///
    /// Returns error if the feed cannot connect; the listener is left
    /// detached so the next attempt starts clean.
    pub async fn attach(
        &mut self,
        feed: Arc<dyn MarketFeedPort>,
        forwarder: Arc<dyn FeedListener>,
    ) -> Result<(), FeedError> {
        let listener_id = feed.register_listener(forwarder);
        self.feed = Some(Arc::clone(&feed));
        self.listener_id = Some(listener_id);
        self.connected = false;

        if let Err(e) = feed.connect().await {
            self.detach();
            return Err(e);
        }
        tracing::info!(listener_id = listener_id.0, "Live feed attached");
        Ok(())
    }

    /// Feed came up: subscribe `symbols`, the full set wanted right now.
    pub async fn on_connected(&mut self, symbols: &BTreeSet<Symbol>) {
        self.connected = true;
        let Some(feed) = self.feed.clone() else {
            return;
        };
        let symbols: Vec<Symbol> = symbols.iter().cloned().collect();
        if symbols.is_empty() {
            return;
        }
        match feed.register_symbols(&symbols).await {
            Ok(()) => tracing::info!(count = symbols.len(), "Subscribed live feed symbols"),
            Err(e) => tracing::warn!(error = %e, "Live feed subscription failed"),
        }
    }

    /// Add symbols to the watch set, subscribing them when connected.
    pub async fn register_symbols(&mut self, symbols: &[Symbol]) {
        let added: Vec<Symbol> = symbols
            .iter()
            .filter(|symbol| self.symbols.insert((*symbol).clone()))
            .cloned()
            .collect();
        if added.is_empty() || !self.connected {
            return;
        }
        if let Some(feed) = self.feed.clone()
            && let Err(e) = feed.register_symbols(&added).await
        {
            tracing::warn!(error = %e, "Live feed subscribe failed");
        }
    }

    /// Remove symbols from the watch set, unsubscribing them when connected.
    pub async fn unregister_symbols(&mut self, symbols: &[Symbol]) {
        let removed: Vec<Symbol> = symbols
            .iter()
            .filter(|symbol| self.symbols.remove(*symbol))
            .cloned()
            .collect();
        if removed.is_empty() || !self.connected {
            return;
        }
        if let Some(feed) = self.feed.clone()
            && let Err(e) = feed.unregister_symbols(&removed).await
        {
            tracing::warn!(error = %e, "Live feed unsubscribe failed");
        }
    }

    /// Forget the feed after it dropped. The engine reattaches lazily.
    pub fn detach(&mut self) {
        if let (Some(feed), Some(listener_id)) = (self.feed.take(), self.listener_id.take()) {
            feed.unregister_listener(listener_id);
            tracing::info!(listener_id = listener_id.0, "Live feed detached");
        }
        self.connected = false;
    }

    /// Close the feed connection and detach.
    pub async fn disconnect(&mut self) {
        if let Some(feed) = self.feed.clone()
            && let Err(e) = feed.disconnect().await
        {
            tracing::warn!(error = %e, "Live feed disconnect failed");
        }
        self.detach();
    }
}
