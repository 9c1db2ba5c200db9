//! Order execution domain services.

mod charges;
mod leg_state_machine;
mod reprice;

pub use charges::{ChargeSchedule, TradePnl};
pub use leg_state_machine::LegStateMachine;
pub use reprice::RepricePolicy;
