//! Shared harness for engine integration tests.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use intraday_engine::application::ports::{BrokerPort, TradeStore};
use intraday_engine::application::services::{
    BrokerRegistry, EngineBuilder, EngineSettings, StrategyRegistry,
};
use intraday_engine::domain::market::LiveQuote;
use intraday_engine::domain::shared::{BrokerName, Symbol};
use intraday_engine::domain::trade_signal::TradeSignal;
use intraday_engine::infrastructure::broker::PaperBroker;
use intraday_engine::infrastructure::clock::ManualClock;
use intraday_engine::infrastructure::strategy::TriggerCrossStrategy;

/// 10:00 IST on a Tuesday.
pub fn market_morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 12, 4, 30, 0).unwrap()
}

/// 15:14 IST the same day, past the 15:13 square-off deadline.
pub fn after_deadline() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 12, 9, 44, 0).unwrap()
}

pub fn fast_settings() -> EngineSettings {
    EngineSettings {
        reconcile_interval: Duration::from_millis(20),
        save_interval: Duration::from_millis(20),
        forced_exit_retry: Duration::from_millis(10),
        ..EngineSettings::default()
    }
}

pub struct Harness {
    pub paper: Arc<PaperBroker>,
    pub clock: Arc<ManualClock>,
    pub builder: EngineBuilder,
}

impl Harness {
    pub async fn new(store: Arc<dyn TradeStore>) -> Self {
        let clock = Arc::new(ManualClock::new(market_morning()));
        let paper =
            Arc::new(PaperBroker::new(BrokerName::new("paper")).with_clock(clock.clone()));
        paper.login().await.unwrap();

        let mut brokers = BrokerRegistry::new();
        brokers.register(paper.clone(), paper.clone());
        let mut strategies = StrategyRegistry::new();
        strategies.register(Arc::new(TriggerCrossStrategy::new("manual")));

        let builder =
            EngineBuilder::new(brokers, strategies, store, clock.clone(), fast_settings());
        Self {
            paper,
            clock,
            builder,
        }
    }

    pub fn quote(&self, symbol: &str, cmp: Decimal) {
        self.paper
            .push_quote(LiveQuote::at_price(Symbol::new(symbol), cmp));
    }

    /// Wait until the engine's feed has subscribed `symbol`.
    pub async fn subscribed(&self, symbol: &str) {
        let symbol = &Symbol::new(symbol);
        let paper = &self.paper;
        eventually("feed subscription", || async move {
            paper.subscribed_symbols().contains(symbol)
        })
        .await;
    }
}

/// Long INFY: trigger 100, stop 95, target 110, 10 shares.
pub fn long_signal() -> TradeSignal {
    TradeSignal::new(
        BrokerName::new("paper"),
        "manual",
        Symbol::new("INFY"),
        true,
        dec!(100),
        dec!(95),
        dec!(110),
        10,
    )
}

/// Short INFY: trigger 99, stop 104, target 90, 10 shares.
pub fn short_signal() -> TradeSignal {
    TradeSignal::new(
        BrokerName::new("paper"),
        "manual",
        Symbol::new("INFY"),
        false,
        dec!(99),
        dec!(104),
        dec!(90),
        10,
    )
}

/// Poll `check` until it holds, failing after two seconds.
pub async fn eventually<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}
