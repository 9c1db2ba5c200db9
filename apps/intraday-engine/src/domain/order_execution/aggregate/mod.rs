//! Trade aggregate and its order legs.

mod order_leg;
mod trade;

pub use order_leg::OrderLeg;
pub use trade::Trade;
