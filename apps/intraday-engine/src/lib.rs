// Allow unwrap/expect in tests - tests should panic on unexpected errors
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::too_many_lines,
        clippy::default_trait_access,
        clippy::items_after_statements
    )
)]

//! Intraday Engine - Rust Core Library
//!
//! Turns strategy trade signals into live broker orders, reconciles every
//! order leg (entry, stop-loss, target) on a fixed cadence, computes P&L net
//! of transaction charges and squares off all positions before the session
//! closes.
//!
//! # Architecture (Clean Architecture + DDD + Hexagonal)
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: Core business rules, no I/O
//!   - `order_execution`: Trade aggregate, order legs, status priority, charges
//!   - `trade_signal`: Trade signals and the signal registry
//!   - `market`: Live quotes and the trading session calendar
//!   - `shared`: Identifiers, symbols, tick-size pricing
//!
//! - **Application**: Use cases and orchestration
//!   - `ports`: Interfaces for external systems (`BrokerPort`, `MarketFeedPort`, `Strategy`)
//!   - `use_cases`: Entry placement, per-trade tracking, forced exit
//!   - `services`: Reconciliation loop, quote listener, algo administration
//!
//! - **Infrastructure**: Adapters (implementations)
//!   - `broker`: Paper broker and its random-walk feed
//!   - `persistence`: JSON file and in-memory trade stores
//!   - `strategy`: Reference trigger-cross strategy
//!   - `http`: Axum admin and read-only API

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Clean Architecture Layers
// =============================================================================

/// Domain layer - business rules, aggregates, value objects.
pub mod domain;

/// Application layer - ports, use cases and services.
pub mod application;

/// Infrastructure layer - adapters for brokers, storage and HTTP.
pub mod infrastructure;

// =============================================================================
// Cross-cutting
// =============================================================================

/// Configuration loading and validation.
pub mod config;

/// Engine error taxonomy.
pub mod error;

pub use error::EngineError;
