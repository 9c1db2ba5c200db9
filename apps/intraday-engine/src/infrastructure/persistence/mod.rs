//! Persistence Adapters
//!
//! Implementations of the `TradeStore` port.

pub mod in_memory;
pub mod json_store;

pub use in_memory::InMemoryTradeStore;
pub use json_store::JsonTradeStore;
