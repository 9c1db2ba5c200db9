//! Clock Port
//!
//! Wall-clock time behind a trait so session rules and reprice intervals
//! can be driven deterministically in tests.

use chrono::{DateTime, Utc};

/// Source of the current time.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Current instant.
    fn now(&self) -> DateTime<Utc>;
}
