//! Market Feed Port (Driven Port)
//!
//! Live tick stream from a broker. Subscriptions are by symbol; ticks are
//! pushed to registered listeners.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::market::LiveQuote;
use crate::domain::shared::Symbol;

/// Handle returned when registering a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Receiver of feed events.
///
/// Callbacks run on the feed's task and must not block.
pub trait FeedListener: Send + Sync {
    /// Feed connected; subscriptions may be sent.
    fn on_connected(&self);

    /// Feed dropped.
    fn on_disconnected(&self);

    /// New quote for a subscribed symbol.
    fn on_tick(&self, quote: LiveQuote);
}

/// Feed error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FeedError {
    /// Connection error.
    #[error("Feed connection error: {message}")]
    ConnectionError {
        /// Error details.
        message: String,
    },

    /// Operation needs a connected feed.
    #[error("Feed not connected")]
    NotConnected,

    /// Subscription request failed.
    #[error("Subscription failed: {message}")]
    SubscriptionFailed {
        /// Error details.
        message: String,
    },
}

/// Port for a live tick feed.
#[async_trait]
pub trait MarketFeedPort: Send + Sync {
    /// Open the connection. Listeners get `on_connected` once it is up.
    async fn connect(&self) -> Result<(), FeedError>;

    /// Close the connection. Listeners get `on_disconnected`.
    async fn disconnect(&self) -> Result<(), FeedError>;

    /// Whether the connection is up.
    fn is_connected(&self) -> bool;

    /// Start receiving ticks for symbols.
    async fn register_symbols(&self, symbols: &[Symbol]) -> Result<(), FeedError>;

    /// Stop receiving ticks for symbols.
    async fn unregister_symbols(&self, symbols: &[Symbol]) -> Result<(), FeedError>;

    /// Add a listener.
    fn register_listener(&self, listener: Arc<dyn FeedListener>) -> ListenerId;

    /// Remove a listener.
    fn unregister_listener(&self, id: ListenerId);
}
