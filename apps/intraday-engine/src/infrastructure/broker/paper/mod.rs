//! Paper Broker
//!
//! Simulated exchange used for development and tests:
//! - in-memory order book with per-order status history
//! - fills driven by pushed quotes (market, limit and SL-market)
//! - a live feed fanning those quotes out to listeners
//! - an optional random-walk quote driver

mod adapter;
mod config;
mod order_book;
mod random_walk;

pub use adapter::PaperBroker;
pub use config::PaperConfig;
pub use random_walk::RandomWalkDriver;
