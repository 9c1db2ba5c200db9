//! Trading symbol value object.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An exchange trading symbol (e.g. `SBIN`, `RELIANCE`).
///
/// Normalized to uppercase so quotes and signals for the same instrument
/// always compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Create a new Symbol.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().trim().to_uppercase())
    }

    /// Get the symbol string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Symbol {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for Symbol {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<Symbol> for String {
    fn from(value: Symbol) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_is_uppercased() {
        assert_eq!(Symbol::new(" sbin ").as_str(), "SBIN");
    }

    #[test]
    fn symbol_deserializes_normalized() {
        let symbol: Symbol = serde_json::from_str("\"infy\"").unwrap();
        assert_eq!(symbol, Symbol::new("INFY"));
    }
}
