//! Process configuration.
//!
//! Everything is read once from the environment at startup and treated as
//! immutable for the process lifetime. Variable names are the ones the
//! deployment already uses.

use std::time::Duration;

use crate::clock::HoursConfig;
use crate::models::Symbol;

/// Default symbol set when `STOCK_SYMBOLS` is unset.
const DEFAULT_SYMBOLS: &[&str] = &[
    "AAPL", "GOOGL", "MSFT", "AMZN", "TSLA", "META", "NVDA", "NFLX",
];

#[derive(Clone, Debug)]
pub struct Config {
    /// Symbols to poll each cycle, upper-cased, in configured order.
    pub symbols: Vec<Symbol>,
    /// Whether to consult the secret store for the API key.
    pub use_secret_store: bool,
    /// Name the API key is stored under.
    pub secret_name: String,
    /// Static fallback API key, if configured.
    pub api_key_fallback: Option<String>,
    /// Name of the target stream.
    pub stream_name: String,
    /// Cadence between cycles.
    pub polling_interval: Duration,
    /// Client-side call ceiling per minute.
    pub max_requests_per_minute: u32,
    /// Market-hours gating flags.
    pub hours: HoursConfig,
    /// Overall deadline for one cycle.
    pub cycle_deadline: Duration,
    /// How many cycles to run before exiting; one invocation per trigger by
    /// default, like the scheduled deployment.
    pub max_cycles: u32,
    /// Local runner: path of the JSON secrets file.
    pub secrets_file: String,
    /// Local runner: path of the append-only stream file.
    pub stream_file: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let symbols = std::env::var("STOCK_SYMBOLS")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_uppercase())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            })
            .unwrap_or_else(|_| DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect());

        let api_key_fallback = std::env::var("FINNHUB_API_KEY")
            .ok()
            .filter(|v| !v.is_empty());

        Self {
            symbols,
            use_secret_store: env_bool("USE_SECRET_STORE", true),
            secret_name: env_or("SECRET_NAME", "finnhub-api-key"),
            api_key_fallback,
            stream_name: env_or("STREAM_NAME", "stock-prices-stream"),
            polling_interval: Duration::from_secs(env_parse("POLLING_INTERVAL_SECONDS", 300)),
            max_requests_per_minute: env_parse("MAX_REQUESTS_PER_MINUTE", 60),
            hours: HoursConfig {
                enforce: env_bool("ENFORCE_MARKET_HOURS", true),
                test_mode: env_bool("TEST_MODE", false),
            },
            cycle_deadline: Duration::from_millis(env_parse("CYCLE_DEADLINE_MS", 60_000)),
            max_cycles: env_parse("MAX_CYCLES", 1),
            secrets_file: env_or("SECRETS_FILE", "secrets.json"),
            stream_file: env_or("STREAM_FILE", "stream.ndjson"),
        }
    }

    /// Loggable view of the configuration. The API key never appears here,
    /// only whether one is configured.
    pub fn summary(&self) -> String {
        format!(
            "symbols={:?} stream={} interval={}s budget={}/min enforce_hours={} test_mode={} \
             use_secret_store={} fallback_key_configured={}",
            self.symbols,
            self.stream_name,
            self.polling_interval.as_secs(),
            self.max_requests_per_minute,
            self.hours.enforce,
            self.hours.test_mode,
            self.use_secret_store,
            self.api_key_fallback.is_some(),
        )
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Booleans accept true/1/yes/on, case-insensitively.
fn env_bool(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(raw) => matches!(raw.to_lowercase().as_str(), "true" | "1" | "yes" | "on"),
        Err(_) => default,
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}
