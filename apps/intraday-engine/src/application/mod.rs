//! Application Layer
//!
//! Ports to the outside world and the orchestration that drives the domain:
//! entry placement, per-trade tracking, forced exit and the reconciliation
//! loop that runs them.

pub mod ports;
pub mod services;
pub mod use_cases;
