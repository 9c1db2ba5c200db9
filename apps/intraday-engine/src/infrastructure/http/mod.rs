//! HTTP/REST API adapter.
//!
//! Inbound adapter exposing broker administration, algo start/stop, trade
//! queries and manual signal entry.

mod controller;
mod request;
mod response;

pub use controller::{AppState, create_router};
pub use request::*;
pub use response::*;
