//! Random-walk quote driver for the paper broker.
//!
//! Every `tick_interval` each subscribed symbol moves by a few ticks and the
//! new quote is pushed through the broker, filling crossing orders and
//! notifying feed listeners.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::adapter::PaperBroker;
use crate::domain::market::LiveQuote;
use crate::domain::shared::pricing::TICK_SIZE;

/// Largest single-step move, in ticks.
const MAX_STEP_TICKS: i64 = 5;

/// Background task feeding synthetic quotes into a `PaperBroker`.
#[derive(Debug)]
pub struct RandomWalkDriver {
    broker: Arc<PaperBroker>,
    rng: StdRng,
}

impl RandomWalkDriver {
    /// Create a driver seeded from the broker config.
    #[must_use]
    pub fn new(broker: Arc<PaperBroker>) -> Self {
        let rng = match broker.config().seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        Self { broker, rng }
    }

    /// Advance every subscribed symbol by one step.
    pub fn step(&mut self) {
        let base = self.broker.config().base_price;
        for symbol in self.broker.subscribed_symbols() {
            let last = self.broker.last_price(&symbol).unwrap_or(base);
            let ticks = self.rng.random_range(-MAX_STEP_TICKS..=MAX_STEP_TICKS);
            let next = (last + TICK_SIZE * Decimal::from(ticks)).max(TICK_SIZE);
            self.broker.push_quote(LiveQuote::at_price(symbol, next));
        }
    }

    /// Run until `shutdown` is cancelled.
    pub fn spawn(mut self, shutdown: CancellationToken) -> JoinHandle<()> {
        let period = self.broker.config().tick_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            tracing::info!(period_ms = period.as_millis() as u64, "Paper random walk started");
            loop {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    _ = ticker.tick() => self.step(),
                }
            }
            tracing::info!("Paper random walk stopped");
        })
    }
}
