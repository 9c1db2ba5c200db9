//! Strategy Adapters
//!
//! Built-in implementations of the `Strategy` port.

pub mod trigger_cross;

pub use trigger_cross::TriggerCrossStrategy;
