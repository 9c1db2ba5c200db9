//! Order execution value objects.

mod leg_state;
mod order_request;
mod order_snapshot;
mod order_status;
mod order_type;
mod trade_state;

pub use leg_state::LegState;
pub use order_request::OrderRequest;
pub use order_snapshot::{OrderSnapshot, select_latest};
pub use order_status::OrderStatus;
pub use order_type::{OrderKind, OrderSide, ProductType, TradeType};
pub use trade_state::{TradeState, exit_reason};
