//! Trade Signal Bounded Context
//!
//! Candidate entry conditions produced by strategies and the registry that
//! dedups them and keeps long/short pairs mutually exclusive.

mod errors;
mod registry;
mod signal;

pub use errors::SignalError;
pub use registry::{AddOutcome, SignalRegistry};
pub use signal::TradeSignal;
