//! Trade Engine
//!
//! The reconciliation loop. A single task owns the trade book and reacts to:
//!
//! - commands from `EngineHandle`s
//! - live feed events (connect, disconnect, ticks)
//! - completed entry placements
//! - the reconciliation interval
//!
//! Trades are tracked one at a time, so no two broker calls for the same
//! trade ever overlap. Entry placements run as separate tasks guarded by the
//! signal's in-flight flag.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::broker_registry::BrokerRegistry;
use super::engine_handle::{EngineCommand, EngineHandle};
use super::quote_listener::{FeedEvent, FeedEventKind, FeedForwarder, QuoteCache, QuoteListener};
use super::snapshot_writer::SnapshotWriter;
use super::strategy_registry::StrategyRegistry;
use crate::application::ports::{Clock, DaySnapshot, MarketFeedPort, TradeStore};
use crate::application::use_cases::{ExecuteTradeUseCase, ForcedExitUseCase, TrackTradeUseCase};
use crate::domain::market::{LiveQuote, MarketSession};
use crate::domain::order_execution::Trade;
use crate::domain::order_execution::services::{ChargeSchedule, RepricePolicy};
use crate::domain::shared::{BrokerName, SignalId, Symbol};
use crate::domain::trade_book::TradeBook;
use crate::domain::trade_signal::{AddOutcome, TradeSignal};
use crate::error::EngineError;

const COMMAND_BUFFER: usize = 64;

/// Engine tuning.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Reconciliation cadence.
    pub reconcile_interval: Duration,
    /// Minimum gap between unforced snapshot writes.
    pub save_interval: Duration,
    /// Pause between forced-exit rounds.
    pub forced_exit_retry: Duration,
    /// Broker whose feed is used when several are logged in.
    pub preferred_feed_broker: Option<BrokerName>,
    /// Entry reprice rules.
    pub reprice: RepricePolicy,
    /// Transaction charges.
    pub charges: ChargeSchedule,
    /// Exchange calendar.
    pub session: MarketSession,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            reconcile_interval: Duration::from_secs(10),
            save_interval: Duration::from_secs(30),
            forced_exit_retry: Duration::from_secs(1),
            preferred_feed_broker: None,
            reprice: RepricePolicy::default(),
            charges: ChargeSchedule::default(),
            session: MarketSession::default(),
        }
    }
}

/// Everything needed to (re)build an engine.
#[derive(Clone)]
pub struct EngineBuilder {
    brokers: BrokerRegistry,
    strategies: StrategyRegistry,
    store: Arc<dyn TradeStore>,
    clock: Arc<dyn Clock>,
    settings: EngineSettings,
}

impl EngineBuilder {
    /// Create a builder.
    #[must_use]
    pub fn new(
        brokers: BrokerRegistry,
        strategies: StrategyRegistry,
        store: Arc<dyn TradeStore>,
        clock: Arc<dyn Clock>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            brokers,
            strategies,
            store,
            clock,
            settings,
        }
    }

    /// Configured brokers.
    #[must_use]
    pub const fn brokers(&self) -> &BrokerRegistry {
        &self.brokers
    }

    /// Engine settings.
    #[must_use]
    pub const fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Clock shared with the engine.
    #[must_use]
    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// Restore today's trades and signals and create the engine.
    ///
    /// Must be called inside a tokio runtime (the snapshot writer task is
    /// spawned here).
    ///
    /// # Errors
    ///
    /// `Persistence` if today's snapshot exists but cannot be read.
    pub async fn build(&self) -> Result<(TradeEngine, EngineHandle), EngineError> {
        let trading_date = self.settings.session.trading_date(self.clock.now());
        let DaySnapshot { trades, signals, .. } = self.store.load(trading_date).await?;
        tracing::info!(
            %trading_date,
            trades = trades.len(),
            signals = signals.len(),
            "Restored trading day"
        );

        let (command_tx, commands) = mpsc::channel(COMMAND_BUFFER);
        let (feed_tx, feed_rx) = mpsc::unbounded_channel();
        let clock = Arc::clone(&self.clock);
        let engine = TradeEngine {
            book: TradeBook::new(trades, signals),
            trading_date,
            brokers: self.brokers.clone(),
            strategies: self.strategies.clone(),
            execute: Arc::new(ExecuteTradeUseCase::new(Arc::clone(&clock))),
            tracker: TrackTradeUseCase::new(
                Arc::clone(&clock),
                self.settings.reprice.clone(),
                self.settings.charges.clone(),
            ),
            forced_exit: ForcedExitUseCase::new(Arc::clone(&clock)),
            clock,
            settings: self.settings.clone(),
            listener: QuoteListener::new(),
            quotes: QuoteCache::default(),
            writer: SnapshotWriter::spawn(Arc::clone(&self.store), self.settings.save_interval),
            commands,
            feed_tx,
            feed_rx,
            placements: JoinSet::new(),
            feed_generation: 0,
        };
        Ok((engine, EngineHandle::new(command_tx)))
    }
}

struct Placement {
    signal_id: SignalId,
    result: Result<Trade, EngineError>,
}

enum Flow {
    Continue,
    Stop,
}

/// Reconciliation loop state. Owned by exactly one task.
pub struct TradeEngine {
    book: TradeBook,
    trading_date: NaiveDate,
    brokers: BrokerRegistry,
    strategies: StrategyRegistry,
    clock: Arc<dyn Clock>,
    settings: EngineSettings,
    execute: Arc<ExecuteTradeUseCase>,
    tracker: TrackTradeUseCase,
    forced_exit: ForcedExitUseCase,
    listener: QuoteListener,
    quotes: QuoteCache,
    writer: SnapshotWriter,
    commands: mpsc::Receiver<EngineCommand>,
    feed_tx: mpsc::UnboundedSender<FeedEvent>,
    feed_rx: mpsc::UnboundedReceiver<FeedEvent>,
    placements: JoinSet<Placement>,
    feed_generation: u64,
}

impl TradeEngine {
    /// Spawn the loop on the current runtime.
    pub fn spawn(self, shutdown: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Run until stopped, the session deadline passes, or `shutdown` fires.
    pub async fn run(mut self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.settings.reconcile_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(
            trading_date = %self.trading_date,
            interval_secs = self.settings.reconcile_interval.as_secs(),
            "Trade engine started"
        );

        loop {
            let flow = tokio::select! {
                biased;
                () = shutdown.cancelled() => {
                    tracing::info!("Trade engine shutdown requested");
                    self.stop(false).await;
                    Flow::Stop
                }
                Some(command) = self.commands.recv() => self.handle_command(command).await,
                Some(event) = self.feed_rx.recv() => self.handle_feed_event(event).await,
                Some(joined) = self.placements.join_next(), if !self.placements.is_empty() => {
                    self.handle_placement(joined).await;
                    Flow::Continue
                }
                _ = ticker.tick() => self.reconcile().await,
            };
            if matches!(flow, Flow::Stop) {
                break;
            }
        }
        tracing::info!(trading_date = %self.trading_date, "Trade engine stopped");
    }

    // =========================================================================
    // Reconciliation
    // =========================================================================

    async fn reconcile(&mut self) -> Flow {
        let now = self.clock.now();
        self.ensure_feed().await;

        let expired = self.book.signals_mut().expire(now);
        if expired > 0 {
            tracing::info!(expired, "Signals past cutoff disabled");
        }

        let closed = self.track_all().await;
        self.persist(closed || expired > 0);

        if self.settings.session.is_square_off_time(self.clock.now()) {
            tracing::info!("Square-off deadline reached, exiting all positions");
            self.stop(true).await;
            return Flow::Stop;
        }
        Flow::Continue
    }

    /// Track every active trade in registration order. Returns whether any
    /// trade closed.
    async fn track_all(&mut self) -> bool {
        let mut closed_any = false;
        let mut disable_opposites = Vec::new();

        for index in 0..self.book.trades().len() {
            let trade = &mut self.book.trades_mut()[index];
            if !trade.is_active() {
                continue;
            }
            let broker = match self.brokers.get(&trade.broker) {
                Ok(entry) => Arc::clone(&entry.broker),
                Err(e) => {
                    tracing::warn!(trade_id = %trade.id, error = %e, "Cannot track trade");
                    continue;
                }
            };
            let cmp = self.quotes.read().get(&trade.trading_symbol).map(|quote| quote.cmp);

            let outcome = self.tracker.track(broker.as_ref(), trade, cmp).await;
            closed_any |= outcome.closed.is_some();
            if let Some(signal_id) = outcome.disable_opposite_of {
                disable_opposites.push(signal_id);
            }
        }

        for signal_id in disable_opposites {
            match self.book.signals_mut().disable_opposite_of(&signal_id) {
                Ok(Some(opposite)) => {
                    tracing::info!(signal_id = %signal_id, opposite = %opposite, "Opposite signal disabled");
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(signal_id = %signal_id, error = %e, "Opposite disable failed"),
            }
        }
        closed_any
    }

    fn has_trackable_trades(&self) -> bool {
        self.book
            .trades()
            .iter()
            .any(|trade| trade.is_active() && self.brokers.contains(&trade.broker))
    }

    /// Square off and track until every trade is closed.
    async fn exit_all_positions(&mut self) {
        let mut round = 0_u32;
        while self.has_trackable_trades() {
            round += 1;
            for index in 0..self.book.trades().len() {
                let trade = &mut self.book.trades_mut()[index];
                let Ok(entry) = self.brokers.get(&trade.broker) else {
                    continue;
                };
                let broker = Arc::clone(&entry.broker);
                if let Err(e) = self.forced_exit.square_off(broker.as_ref(), trade).await {
                    tracing::warn!(
                        trade_id = %trade.id,
                        round,
                        error = %e,
                        "Square-off order failed"
                    );
                }
            }

            self.track_all().await;
            if !self.has_trackable_trades() {
                break;
            }
            tracing::info!(
                round,
                remaining = self.book.trades().iter().filter(|trade| trade.is_active()).count(),
                "Positions still open after square-off round"
            );
            tokio::time::sleep(self.settings.forced_exit_retry).await;
        }
        tracing::info!(rounds = round, "All positions squared off");
    }

    async fn stop(&mut self, exit_all: bool) {
        while let Some(joined) = self.placements.join_next().await {
            self.handle_placement(joined).await;
        }
        if exit_all {
            self.exit_all_positions().await;
        }
        self.listener.disconnect().await;
        self.persist(true);
        self.writer.close().await;
    }

    fn persist(&mut self, force: bool) {
        let book = &self.book;
        let trading_date = self.trading_date;
        self.writer.persist(force, || DaySnapshot {
            trading_date,
            trades: book.trades().to_vec(),
            signals: book.signals().signals().to_vec(),
        });
    }

    fn snapshot(&self) -> DaySnapshot {
        DaySnapshot {
            trading_date: self.trading_date,
            trades: self.book.trades().to_vec(),
            signals: self.book.signals().signals().to_vec(),
        }
    }

    // =========================================================================
    // Live feed
    // =========================================================================

    /// Attach a live feed if the market is open and none is attached.
    async fn ensure_feed(&mut self) {
        if self.listener.is_attached() || !self.settings.session.is_market_open(self.clock.now()) {
            return;
        }
        let Some((name, feed)) = self.pick_feed() else {
            tracing::debug!("No logged-in broker to stream quotes from");
            return;
        };

        self.feed_generation += 1;
        let forwarder = Arc::new(FeedForwarder::new(
            self.feed_generation,
            self.feed_tx.clone(),
            Arc::clone(&self.quotes),
        ));
        match self.listener.attach(feed, forwarder).await {
            Ok(()) => tracing::info!(broker = %name, generation = self.feed_generation, "Live feed connecting"),
            Err(e) => tracing::warn!(broker = %name, error = %e, "Live feed connect failed"),
        }
    }

    fn pick_feed(&self) -> Option<(BrokerName, Arc<dyn MarketFeedPort>)> {
        let preferred = self
            .settings
            .preferred_feed_broker
            .as_ref()
            .and_then(|name| self.brokers.get(name).ok().map(|entry| (name, entry)))
            .filter(|(_, entry)| entry.broker.is_logged_in());
        preferred
            .or_else(|| {
                self.brokers
                    .iter()
                    .find(|(_, entry)| entry.broker.is_logged_in())
            })
            .map(|(name, entry)| (name.clone(), Arc::clone(&entry.feed)))
    }

    fn subscription_set(&self) -> BTreeSet<Symbol> {
        let mut symbols = self.book.watched_symbols();
        symbols.extend(self.listener.symbols().iter().cloned());
        symbols
    }

    async fn handle_feed_event(&mut self, event: FeedEvent) -> Flow {
        if event.generation != self.feed_generation {
            tracing::debug!(generation = event.generation, "Ignoring event from stale feed");
            return Flow::Continue;
        }
        match event.kind {
            FeedEventKind::Connected => {
                let symbols = self.subscription_set();
                self.listener.on_connected(&symbols).await;
                Flow::Continue
            }
            FeedEventKind::Disconnected => {
                tracing::warn!("Live feed disconnected, reconnecting next tick");
                self.listener.detach();
                Flow::Continue
            }
            FeedEventKind::Tick(symbol) => self.on_tick(&symbol).await,
        }
    }

    async fn on_tick(&mut self, symbol: &Symbol) -> Flow {
        if self.settings.session.is_square_off_time(self.clock.now()) {
            tracing::info!(symbol = %symbol, "Tick after square-off deadline, exiting all positions");
            self.stop(true).await;
            return Flow::Stop;
        }
        let Some(quote) = self.quotes.read().get(symbol).cloned() else {
            return Flow::Continue;
        };

        let brokers: Vec<BrokerName> = self.brokers.names().cloned().collect();
        for broker in &brokers {
            for is_buy in [true, false] {
                let candidate = self
                    .book
                    .signals()
                    .untriggered(symbol, is_buy, broker)
                    .map(|signal| signal.id.clone());
                if let Some(signal_id) = candidate {
                    self.evaluate_signal(&signal_id, &quote);
                }
            }
        }
        Flow::Continue
    }

    // =========================================================================
    // Signal evaluation and entry placement
    // =========================================================================

    fn evaluate_signal(&mut self, signal_id: &SignalId, quote: &LiveQuote) {
        let Some(signal) = self.book.signals().get(signal_id) else {
            return;
        };
        if signal.order_placement_in_progress {
            tracing::debug!(signal_id = %signal_id, "Entry placement already in flight");
            return;
        }
        let opposite_in_flight = self
            .book
            .signals()
            .opposite_of(signal)
            .is_some_and(|opposite| opposite.order_placement_in_progress);
        if opposite_in_flight && !signal.consider_opposite_trade {
            tracing::debug!(signal_id = %signal_id, "Opposite entry in flight");
            return;
        }
        let Some(strategy) = self.strategies.get(&signal.strategy) else {
            tracing::warn!(signal_id = %signal_id, strategy = %signal.strategy, "Unknown strategy");
            return;
        };
        let broker = match self.brokers.get(&signal.broker) {
            Ok(entry) if entry.broker.is_logged_in() => Arc::clone(&entry.broker),
            Ok(_) => {
                tracing::debug!(signal_id = %signal_id, broker = %signal.broker, "Broker not logged in");
                return;
            }
            Err(e) => {
                tracing::warn!(signal_id = %signal_id, error = %e, "Cannot evaluate signal");
                return;
            }
        };
        if !strategy.should_place_trade(signal, quote, &self.book) {
            return;
        }

        match self.execute.plan(signal) {
            Ok(Some(plan)) => {
                if let Err(e) = self.book.signals_mut().set_in_flight(signal_id, true) {
                    tracing::warn!(signal_id = %signal_id, error = %e, "Cannot mark signal in flight");
                    return;
                }
                tracing::info!(
                    signal_id = %signal_id,
                    symbol = %plan.signal.trading_symbol,
                    cmp = %quote.cmp,
                    "Signal triggered, placing entry"
                );
                let execute = Arc::clone(&self.execute);
                let signal_id = signal_id.clone();
                self.placements.spawn(async move {
                    let result = execute.execute(broker.as_ref(), plan).await;
                    Placement { signal_id, result }
                });
            }
            Ok(None) => {
                if self.book.signals_mut().disable(signal_id).is_ok() {
                    self.persist(true);
                }
            }
            Err(e) => tracing::warn!(signal_id = %signal_id, error = %e, "Signal not executable"),
        }
    }

    async fn handle_placement(&mut self, joined: Result<Placement, JoinError>) {
        let Placement { signal_id, result } = match joined {
            Ok(placement) => placement,
            Err(e) => {
                tracing::error!(error = %e, "Entry placement task failed");
                return;
            }
        };

        match result {
            Ok(trade) => {
                if let Err(e) = self.book.signals_mut().trigger(&signal_id) {
                    tracing::warn!(signal_id = %signal_id, error = %e, "Placed trade for unknown signal");
                }
                let symbol = trade.trading_symbol.clone();
                self.book.push_trade(trade);
                self.listener.register_symbols(&[symbol]).await;
            }
            Err(e) => {
                tracing::error!(signal_id = %signal_id, error = %e, "Entry placement failed");
                if let Err(e) = self.book.signals_mut().set_in_flight(&signal_id, false) {
                    tracing::warn!(signal_id = %signal_id, error = %e, "Cannot clear in-flight flag");
                }
            }
        }
        self.persist(true);
    }

    // =========================================================================
    // Commands
    // =========================================================================

    async fn handle_command(&mut self, command: EngineCommand) -> Flow {
        match command {
            EngineCommand::AddSignal { signal, reply } => {
                let result = self.add_signal(*signal).await;
                let _ = reply.send(result);
            }
            EngineCommand::DisableSignal { signal_id, reply } => {
                let result = self
                    .book
                    .signals_mut()
                    .disable(&signal_id)
                    .map_err(EngineError::from);
                if result.is_ok() {
                    self.persist(true);
                }
                let _ = reply.send(result);
            }
            EngineCommand::SameSignal { signal, reply } => {
                let _ = reply.send(self.book.signals().same_as(&signal).cloned());
            }
            EngineCommand::OppositeSignal { signal, reply } => {
                let _ = reply.send(self.book.signals().opposite_of(&signal).cloned());
            }
            EngineCommand::IsTradeAlreadyPlaced {
                signal,
                strategy,
                reply,
            } => {
                let _ = reply.send(self.book.is_trade_already_placed(&signal, &strategy));
            }
            EngineCommand::CountStocksTraded { strategy, reply } => {
                let _ = reply.send(self.book.count_stocks_traded(&strategy));
            }
            EngineCommand::ListStocksTraded { strategy, reply } => {
                let _ = reply.send(self.book.list_stocks_traded(&strategy));
            }
            EngineCommand::ActiveTrades { broker, reply } => {
                let _ = reply.send(self.active_trades(&broker));
            }
            EngineCommand::CompletedTrades { broker, reply } => {
                let _ = reply.send(self.book.completed_trades(&broker).cloned().collect());
            }
            EngineCommand::RegisterSymbols { symbols, reply } => {
                self.listener.register_symbols(&symbols).await;
                let _ = reply.send(());
            }
            EngineCommand::UnregisterSymbols { symbols, reply } => {
                self.listener.unregister_symbols(&symbols).await;
                let _ = reply.send(());
            }
            EngineCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            EngineCommand::Stop { exit_all, reply } => {
                tracing::info!(exit_all, "Trade engine stop requested");
                self.stop(exit_all).await;
                let _ = reply.send(());
                return Flow::Stop;
            }
        }
        Flow::Continue
    }

    async fn add_signal(&mut self, mut signal: TradeSignal) -> Result<AddOutcome, EngineError> {
        if !self.strategies.contains(&signal.strategy) {
            return Err(EngineError::Configuration(format!(
                "unknown strategy: {}",
                signal.strategy
            )));
        }
        self.brokers.get(&signal.broker)?;

        self.book.signals().assign_correlation(&mut signal);
        let signal_id = signal.id.clone();
        let symbol = signal.trading_symbol.clone();
        let outcome = self.book.signals_mut().add(signal);
        tracing::info!(signal_id = %signal_id, symbol = %symbol, ?outcome, "Signal registered");

        if outcome == AddOutcome::Added {
            self.listener.register_symbols(&[symbol]).await;
        }
        if outcome != AddOutcome::Duplicate {
            self.persist(true);
        }
        Ok(outcome)
    }

    fn active_trades(&self, broker: &BrokerName) -> Vec<Trade> {
        let quotes = self.quotes.read();
        self.book
            .active_trades(broker)
            .map(|trade| {
                let mut trade = trade.clone();
                let cmp = quotes
                    .get(&trade.trading_symbol)
                    .map_or(Decimal::ZERO, |quote| quote.cmp);
                trade.mark_to_market(cmp, self.tracker.charges());
                trade
            })
            .collect()
    }
}
