//! Application Ports (Driver and Driven)
//!
//! Ports define interfaces for interacting with external systems.
//! - **Driven Ports** (Secondary/Outbound): brokers, live feeds, storage, time
//! - **Strategy Port**: the decision hook external strategies implement

mod broker_port;
mod clock_port;
mod market_feed_port;
mod strategy_port;
mod trade_store_port;

pub use broker_port::{BrokerError, BrokerPort, ModifyOrder, OrderAck};
pub use clock_port::Clock;
pub use market_feed_port::{FeedError, FeedListener, ListenerId, MarketFeedPort};
pub use strategy_port::Strategy;
pub use trade_store_port::{DaySnapshot, PersistenceError, TradeStore};
