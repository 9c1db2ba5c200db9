//! Infrastructure Layer
//!
//! Adapters (implementations) for the ports defined in the application
//! layer:
//!
//! - **Driven Adapters (Outbound)**
//!   - `broker/`: Paper broker with simulated fills and a random-walk feed
//!   - `persistence/`: JSON file and in-memory trade stores
//!   - `clock`: System and manual clocks
//!
//! - **Driver Adapters (Inbound)**
//!   - `http/`: REST API controllers
//!   - `strategy/`: Built-in strategies called back by the engine

pub mod broker;
pub mod clock;
pub mod http;
pub mod persistence;
pub mod strategy;
