//! Configuration module for the intraday engine.
//!
//! YAML configuration with `${VAR}` / `${VAR:-default}` environment
//! interpolation, validation, and conversion into the engine's runtime
//! types.
//!
//! # Usage
//!
//! ```rust,ignore
//! use intraday_engine::config::load_config;
//!
//! let config = load_config(Some("config.yaml"))?;
//! let settings = config.engine_settings()?;
//! ```

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{FixedOffset, NaiveDate, NaiveTime, TimeDelta};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::ports::Strategy;
use crate::application::services::EngineSettings;
use crate::domain::market::MarketSession;
use crate::domain::order_execution::services::{ChargeSchedule, RepricePolicy};
use crate::domain::shared::BrokerName;
use crate::infrastructure::broker::PaperConfig;
use crate::infrastructure::strategy::TriggerCrossStrategy;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Reconciliation loop and storage.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Entry reprice rules.
    #[serde(default)]
    pub tracking: TrackingConfig,
    /// Exchange calendar.
    #[serde(default)]
    pub session: SessionConfig,
    /// Transaction charge rates.
    #[serde(default)]
    pub charges: ChargeSchedule,
    /// Configured brokers.
    #[serde(default)]
    pub brokers: Vec<BrokerConfig>,
    /// Configured strategies.
    #[serde(default)]
    pub strategies: Vec<StrategyConfig>,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server port.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Bind address.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: default_http_port(),
            bind_address: default_bind_address(),
        }
    }
}

const fn default_http_port() -> u16 {
    8080
}
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Root directory for persisted trades and signals.
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,
    /// Reconciliation cadence in seconds.
    #[serde(default = "default_reconcile_interval")]
    pub reconcile_interval_secs: u64,
    /// Minimum gap between unforced saves in seconds.
    #[serde(default = "default_save_interval")]
    pub save_interval_secs: u64,
    /// Pause between forced-exit rounds in milliseconds.
    #[serde(default = "default_forced_exit_retry")]
    pub forced_exit_retry_millis: u64,
    /// Broker whose feed is preferred when several are logged in.
    #[serde(default)]
    pub preferred_feed_broker: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            reconcile_interval_secs: default_reconcile_interval(),
            save_interval_secs: default_save_interval(),
            forced_exit_retry_millis: default_forced_exit_retry(),
            preferred_feed_broker: None,
        }
    }
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from("./storage")
}
const fn default_reconcile_interval() -> u64 {
    10
}
const fn default_save_interval() -> u64 {
    30
}
const fn default_forced_exit_retry() -> u64 {
    1000
}

/// Entry reprice configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Seconds between two modifications of an unfilled entry.
    #[serde(default = "default_reprice_interval")]
    pub reprice_interval_secs: u64,
    /// Maximum modifications per entry.
    #[serde(default = "default_max_reprice_attempts")]
    pub max_reprice_attempts: u32,
    /// Maximum adverse move from the trigger, in percent.
    #[serde(default = "default_reprice_limit_percent")]
    pub reprice_limit_percent: Decimal,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            reprice_interval_secs: default_reprice_interval(),
            max_reprice_attempts: default_max_reprice_attempts(),
            reprice_limit_percent: default_reprice_limit_percent(),
        }
    }
}

const fn default_reprice_interval() -> u64 {
    20
}
const fn default_max_reprice_attempts() -> u32 {
    5
}
const fn default_reprice_limit_percent() -> Decimal {
    dec!(0.3)
}

/// Exchange session configuration. Times are exchange-local `HH:MM`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Exchange offset from UTC in minutes (330 for IST).
    #[serde(default = "default_timezone_offset")]
    pub timezone_offset_minutes: i32,
    /// Session open.
    #[serde(default = "default_market_open")]
    pub market_open: String,
    /// Session close.
    #[serde(default = "default_market_close")]
    pub market_close: String,
    /// Broker auto square-off time.
    #[serde(default = "default_broker_square_off")]
    pub broker_square_off: String,
    /// Minutes before the broker square-off at which the engine exits.
    #[serde(default = "default_square_off_lead")]
    pub square_off_lead_minutes: i64,
    /// Exchange holidays.
    #[serde(default)]
    pub holidays: Vec<NaiveDate>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timezone_offset_minutes: default_timezone_offset(),
            market_open: default_market_open(),
            market_close: default_market_close(),
            broker_square_off: default_broker_square_off(),
            square_off_lead_minutes: default_square_off_lead(),
            holidays: Vec::new(),
        }
    }
}

const fn default_timezone_offset() -> i32 {
    330
}
fn default_market_open() -> String {
    "09:15".to_string()
}
fn default_market_close() -> String {
    "15:30".to_string()
}
fn default_broker_square_off() -> String {
    "15:15".to_string()
}
const fn default_square_off_lead() -> i64 {
    2
}

impl SessionConfig {
    /// Build the market session.
    pub fn to_session(&self) -> Result<MarketSession, ConfigError> {
        let offset = FixedOffset::east_opt(self.timezone_offset_minutes * 60).ok_or_else(|| {
            ConfigError::ValidationError(format!(
                "session.timezone_offset_minutes out of range: {}",
                self.timezone_offset_minutes
            ))
        })?;
        Ok(MarketSession::new(
            offset,
            parse_time("session.market_open", &self.market_open)?,
            parse_time("session.market_close", &self.market_close)?,
            parse_time("session.broker_square_off", &self.broker_square_off)?,
            TimeDelta::minutes(self.square_off_lead_minutes),
            self.holidays.iter().copied(),
        ))
    }
}

fn parse_time(field: &str, value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value, "%H:%M").map_err(|e| {
        ConfigError::ValidationError(format!("{field} must be HH:MM, got '{value}': {e}"))
    })
}

/// Broker adapter kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrokerKind {
    /// Simulated fills against a random-walk feed.
    Paper,
}

/// One configured broker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Name signals refer to.
    pub name: String,
    /// Adapter kind.
    #[serde(default = "default_broker_kind")]
    pub kind: BrokerKind,
    /// Ticks of adverse slippage on market and stop fills.
    #[serde(default)]
    pub slippage_ticks: u32,
    /// Random-walk step interval in milliseconds.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_millis: u64,
    /// Starting price for unseen symbols.
    #[serde(default = "default_base_price")]
    pub base_price: Decimal,
    /// Random-walk seed.
    #[serde(default)]
    pub seed: Option<u64>,
}

const fn default_broker_kind() -> BrokerKind {
    BrokerKind::Paper
}
const fn default_tick_interval() -> u64 {
    1000
}
const fn default_base_price() -> Decimal {
    dec!(100)
}

impl BrokerConfig {
    /// Broker name as a domain value.
    #[must_use]
    pub fn broker_name(&self) -> BrokerName {
        BrokerName::new(self.name.clone())
    }

    /// Paper broker settings.
    #[must_use]
    pub fn paper_config(&self) -> PaperConfig {
        PaperConfig {
            slippage_ticks: self.slippage_ticks,
            tick_interval: Duration::from_millis(self.tick_interval_millis),
            base_price: self.base_price,
            seed: self.seed,
        }
    }
}

/// Strategy implementation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Enter when the price crosses the trigger.
    TriggerCross,
}

/// One configured strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Name signals refer to.
    pub name: String,
    /// Implementation kind.
    #[serde(default = "default_strategy_kind")]
    pub kind: StrategyKind,
    /// Distinct symbols the strategy may trade per day.
    #[serde(default)]
    pub max_trades_per_day: Option<usize>,
    /// Fire when the price touches the trigger exactly.
    #[serde(default)]
    pub consider_equal: bool,
}

const fn default_strategy_kind() -> StrategyKind {
    StrategyKind::TriggerCross
}

impl StrategyConfig {
    /// Instantiate the strategy.
    #[must_use]
    pub fn build(&self) -> Arc<dyn Strategy> {
        match self.kind {
            StrategyKind::TriggerCross => {
                let mut strategy =
                    TriggerCrossStrategy::new(self.name.clone()).consider_equal(self.consider_equal);
                if let Some(max) = self.max_trades_per_day {
                    strategy = strategy.with_max_trades_per_day(max);
                }
                Arc::new(strategy)
            }
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Multi-line human-readable output.
    #[default]
    Pretty,
    /// Single-line output.
    Compact,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Config {
    /// Runtime settings for the engine.
    pub fn engine_settings(&self) -> Result<EngineSettings, ConfigError> {
        Ok(EngineSettings {
            reconcile_interval: Duration::from_secs(self.engine.reconcile_interval_secs),
            save_interval: Duration::from_secs(self.engine.save_interval_secs),
            forced_exit_retry: Duration::from_millis(self.engine.forced_exit_retry_millis),
            preferred_feed_broker: self
                .engine
                .preferred_feed_broker
                .as_deref()
                .map(BrokerName::new),
            reprice: RepricePolicy {
                interval: TimeDelta::seconds(
                    i64::try_from(self.tracking.reprice_interval_secs).unwrap_or(i64::MAX),
                ),
                max_attempts: self.tracking.max_reprice_attempts,
                limit_percent: self.tracking.reprice_limit_percent,
            },
            charges: self.charges.clone(),
            session: self.session.to_session()?,
        })
    }
}

// ============================================
// Configuration Loading
// ============================================

/// Load configuration from a YAML file with environment variable interpolation.
///
/// # Arguments
///
/// * `path` - Optional path to the config file. Defaults to "config.yaml".
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or("config.yaml");

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_string(),
        source: e,
    })?;

    load_config_from_string(&contents)
}

/// Load configuration from a YAML string (useful for testing).
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: Config = serde_yaml_bw::from_str(&interpolated)?;
    validate_config(&config)?;
    Ok(config)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax.
#[allow(clippy::expect_used)] // Regex is compile-time constant
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    re.replace_all(input, |cap: &regex::Captures<'_>| {
        let default_value = cap.get(2).map_or("", |m| m.as_str());
        match std::env::var(&cap[1]) {
            Ok(v) if !v.is_empty() => v,
            _ => default_value.to_string(),
        }
    })
    .into_owned()
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(message.into())
}

/// Validate configuration values.
fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.brokers.is_empty() {
        return Err(invalid("at least one broker must be configured"));
    }

    let mut broker_names = BTreeSet::new();
    for broker in &config.brokers {
        if broker.name.trim().is_empty() {
            return Err(invalid("broker name must not be empty"));
        }
        if !broker_names.insert(broker.name.as_str()) {
            return Err(invalid(format!("duplicate broker name: {}", broker.name)));
        }
        if broker.tick_interval_millis == 0 {
            return Err(invalid(format!(
                "brokers.{}.tick_interval_millis must be positive",
                broker.name
            )));
        }
        if broker.base_price <= Decimal::ZERO {
            return Err(invalid(format!(
                "brokers.{}.base_price must be positive",
                broker.name
            )));
        }
    }

    if let Some(preferred) = &config.engine.preferred_feed_broker
        && !broker_names.contains(preferred.as_str())
    {
        return Err(invalid(format!(
            "engine.preferred_feed_broker '{preferred}' is not a configured broker"
        )));
    }

    let mut strategy_names = BTreeSet::new();
    for strategy in &config.strategies {
        if strategy.name.trim().is_empty() {
            return Err(invalid("strategy name must not be empty"));
        }
        if !strategy_names.insert(strategy.name.as_str()) {
            return Err(invalid(format!("duplicate strategy name: {}", strategy.name)));
        }
    }

    if config.engine.reconcile_interval_secs == 0 {
        return Err(invalid("engine.reconcile_interval_secs must be positive"));
    }
    if config.engine.save_interval_secs == 0 {
        return Err(invalid("engine.save_interval_secs must be positive"));
    }
    if config.engine.forced_exit_retry_millis == 0 {
        return Err(invalid("engine.forced_exit_retry_millis must be positive"));
    }
    if config.tracking.reprice_interval_secs == 0 {
        return Err(invalid("tracking.reprice_interval_secs must be positive"));
    }
    if config.tracking.reprice_limit_percent < Decimal::ZERO {
        return Err(invalid("tracking.reprice_limit_percent must not be negative"));
    }

    let session = &config.session;
    let open = parse_time("session.market_open", &session.market_open)?;
    let close = parse_time("session.market_close", &session.market_close)?;
    let square_off = parse_time("session.broker_square_off", &session.broker_square_off)?;
    if open >= close {
        return Err(invalid("session.market_open must be before session.market_close"));
    }
    if square_off > close {
        return Err(invalid(
            "session.broker_square_off must not be after session.market_close",
        ));
    }
    if session.square_off_lead_minutes < 0 {
        return Err(invalid("session.square_off_lead_minutes must not be negative"));
    }
    session.to_session()?;

    Ok(())
}
