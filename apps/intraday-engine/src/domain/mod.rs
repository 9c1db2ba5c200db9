//! Domain Layer
//!
//! Pure trading rules. Nothing in here performs I/O or awaits.

pub mod market;
pub mod order_execution;
pub mod shared;
pub mod trade_book;
pub mod trade_signal;
