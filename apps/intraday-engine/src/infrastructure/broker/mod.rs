//! Broker Adapters
//!
//! Implementations of `BrokerPort` and `MarketFeedPort`.

pub mod paper;

pub use paper::{PaperBroker, PaperConfig, RandomWalkDriver};
