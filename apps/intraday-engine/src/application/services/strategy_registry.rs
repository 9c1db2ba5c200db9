//! Strategy Registry

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::application::ports::Strategy;

/// Strategies signals may name, keyed by `Strategy::name`.
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    strategies: BTreeMap<String, Arc<dyn Strategy>>,
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.strategies.keys()).finish()
    }
}

impl StrategyRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a strategy, replacing any with the same name.
    pub fn register(&mut self, strategy: Arc<dyn Strategy>) {
        self.strategies.insert(strategy.name().to_string(), strategy);
    }

    /// Strategy called `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Strategy>> {
        self.strategies.get(name)
    }

    /// Whether `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.strategies.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.strategies.keys().map(String::as_str)
    }
}
