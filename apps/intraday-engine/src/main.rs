//! Intraday Engine Binary
//!
//! Starts the trade engine admin API with paper brokers.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin intraday-engine
//! ```
//!
//! # Environment Variables
//!
//! - `INTRADAY_CONFIG`: Path to the YAML config (default: `config.yaml`)
//! - `RUST_LOG`: Log filter (default: `intraday_engine=info`)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use intraday_engine::application::services::{
    AlgoManager, BrokerRegistry, EngineBuilder, StrategyRegistry,
};
use intraday_engine::config::{Config, LogFormat, load_config};
use intraday_engine::infrastructure::broker::{PaperBroker, RandomWalkDriver};
use intraday_engine::infrastructure::clock::SystemClock;
use intraday_engine::infrastructure::http::{AppState, create_router};
use intraday_engine::infrastructure::persistence::JsonTradeStore;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Time allowed for the final square-off on shutdown.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    let config_path = std::env::var("INTRADAY_CONFIG").ok();
    let config = load_config(config_path.as_deref()).context("loading configuration")?;
    init_tracing(config.logging.format);

    tracing::info!(
        brokers = config.brokers.len(),
        strategies = config.strategies.len(),
        storage_dir = %config.engine.storage_dir.display(),
        "Starting intraday engine"
    );

    let shutdown = CancellationToken::new();
    let (brokers, feeds) = create_brokers(&config, &shutdown);
    let algo = Arc::new(create_algo_manager(&config, brokers, &shutdown)?);

    let addr: SocketAddr = format!("{}:{}", config.server.bind_address, config.server.http_port)
        .parse()
        .context("invalid server bind address")?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "HTTP server listening");

    let app = create_router(AppState {
        algo: Arc::clone(&algo),
        version: env!("CARGO_PKG_VERSION").to_string(),
    });
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );
    if tokio::time::timeout(SHUTDOWN_TIMEOUT, algo.shutdown(true))
        .await
        .is_err()
    {
        tracing::error!("Square-off did not finish before the shutdown timeout");
    }

    shutdown.cancel();
    for feed in feeds {
        if let Err(e) = feed.await {
            tracing::warn!(error = %e, "Paper feed task failed");
        }
    }
    tracing::info!("Intraday engine stopped");
    Ok(())
}

/// Build one paper broker per configured entry and start its random walk.
fn create_brokers(
    config: &Config,
    shutdown: &CancellationToken,
) -> (BrokerRegistry, Vec<JoinHandle<()>>) {
    let mut registry = BrokerRegistry::new();
    let mut feeds = Vec::new();
    for broker_config in &config.brokers {
        let paper = Arc::new(PaperBroker::with_config(
            broker_config.broker_name(),
            broker_config.paper_config(),
        ));
        feeds.push(RandomWalkDriver::new(Arc::clone(&paper)).spawn(shutdown.child_token()));
        registry.register(paper.clone(), paper);
        tracing::info!(broker = %broker_config.name, kind = ?broker_config.kind, "Broker configured");
    }
    (registry, feeds)
}

fn create_algo_manager(
    config: &Config,
    brokers: BrokerRegistry,
    shutdown: &CancellationToken,
) -> anyhow::Result<AlgoManager> {
    let mut strategies = StrategyRegistry::new();
    for strategy_config in &config.strategies {
        strategies.register(strategy_config.build());
        tracing::info!(strategy = %strategy_config.name, "Strategy registered");
    }

    let builder = EngineBuilder::new(
        brokers,
        strategies,
        Arc::new(JsonTradeStore::new(&config.engine.storage_dir)),
        Arc::new(SystemClock),
        config.engine_settings().context("building engine settings")?,
    );
    Ok(AlgoManager::new(builder, shutdown.child_token()))
}

/// Load `.env` from the working directory or the nearest ancestor.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }
    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Initialize the tracing subscriber with environment filter.
///
/// Uses a static directive string that is guaranteed to parse.
#[allow(clippy::expect_used)]
fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(
        "intraday_engine=info"
            .parse()
            .expect("static directive 'intraday_engine=info' is valid"),
    );
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Compact => builder.compact().init(),
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
///
/// # Panics
///
/// Panics if signal handlers cannot be installed.
#[allow(clippy::expect_used)]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
