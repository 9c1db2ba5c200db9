//! Broker Registry
//!
//! One adapter pair (orders + live feed) per configured broker, constructed
//! at startup and shared by the engine and the admin API.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::application::ports::{BrokerPort, MarketFeedPort};
use crate::domain::shared::BrokerName;
use crate::error::EngineError;

/// Adapters for one broker.
#[derive(Clone)]
pub struct BrokerEntry {
    /// Order session.
    pub broker: Arc<dyn BrokerPort>,
    /// Live tick feed.
    pub feed: Arc<dyn MarketFeedPort>,
}

impl std::fmt::Debug for BrokerEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerEntry")
            .field("broker", self.broker.name())
            .field("logged_in", &self.broker.is_logged_in())
            .finish_non_exhaustive()
    }
}

/// Configured brokers by name.
#[derive(Debug, Clone, Default)]
pub struct BrokerRegistry {
    entries: BTreeMap<BrokerName, BrokerEntry>,
}

impl BrokerRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register adapters under the broker's own name.
    pub fn register(&mut self, broker: Arc<dyn BrokerPort>, feed: Arc<dyn MarketFeedPort>) {
        let name = broker.name().clone();
        self.entries.insert(name, BrokerEntry { broker, feed });
    }

    /// Adapters for `name`.
    ///
    /// # Errors
    ///
    /// `Configuration` if no such broker is configured.
    pub fn get(&self, name: &BrokerName) -> Result<&BrokerEntry, EngineError> {
        self.entries
            .get(name)
            .ok_or_else(|| EngineError::Configuration(format!("unknown broker: {name}")))
    }

    /// Whether `name` is configured.
    #[must_use]
    pub fn contains(&self, name: &BrokerName) -> bool {
        self.entries.contains_key(name)
    }

    /// Configured broker names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &BrokerName> {
        self.entries.keys()
    }

    /// All entries, sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&BrokerName, &BrokerEntry)> {
        self.entries.iter()
    }

    /// Number of configured brokers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no broker is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::broker::PaperBroker;

    #[test]
    fn unknown_broker_is_a_configuration_error() {
        let mut registry = BrokerRegistry::new();
        let paper = Arc::new(PaperBroker::new(BrokerName::new("paper")));
        registry.register(paper.clone(), paper);

        assert!(registry.get(&BrokerName::new("paper")).is_ok());
        assert!(matches!(
            registry.get(&BrokerName::new("zerodha")),
            Err(EngineError::Configuration(_))
        ));
        assert_eq!(registry.len(), 1);
    }
}
