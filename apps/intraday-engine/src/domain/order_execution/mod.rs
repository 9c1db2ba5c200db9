//! Order Execution Bounded Context
//!
//! The `Trade` aggregate and its three order legs (entry, stop-loss,
//! target), normalized broker order statuses, leg state transitions and the
//! P&L/charges model.

pub mod aggregate;
pub mod errors;
pub mod services;
pub mod value_objects;

pub use aggregate::{OrderLeg, Trade};
pub use errors::OrderError;
pub use value_objects::{
    LegState, OrderKind, OrderRequest, OrderSide, OrderSnapshot, OrderStatus, ProductType, TradeState,
    TradeType, exit_reason,
};
