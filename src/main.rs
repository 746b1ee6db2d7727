//! Local runner: drives the poll cycle on a fixed cadence.
//!
//! Stands in for the external scheduled trigger. Cycles run strictly
//! serially; `MAX_CYCLES` bounds how many run per invocation (default 1,
//! one cycle per trigger like the scheduled deployment).

mod local;

use std::sync::Arc;

use chrono::Utc;
use tokio::time::interval;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tickfeed::{
    Config, CredentialConfig, CredentialResolver, CycleConfig, FinnhubClient, MarketClock,
    PollCycle, StreamPublisher,
};

use local::{FileSecretStore, FileStreamSink};

fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry.with(fmt::layer().with_target(true)).init();
    }
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();
    init_tracing();
    info!("starting: {}", config.summary());

    let store = Arc::new(FileSecretStore::new(&config.secrets_file));
    let sink = Arc::new(FileStreamSink::new(
        &config.stream_file,
        &config.stream_name,
    ));

    let resolver = CredentialResolver::new(
        store,
        CredentialConfig {
            use_store: config.use_secret_store,
            secret_name: config.secret_name.clone(),
            static_fallback: config.api_key_fallback.clone(),
        },
    );

    let cycle = PollCycle::new(
        MarketClock::new(),
        resolver,
        FinnhubClient::new(config.max_requests_per_minute),
        StreamPublisher::new(sink),
        CycleConfig {
            symbols: config.symbols.clone(),
            hours: config.hours,
            deadline: config.cycle_deadline,
        },
    );

    // First tick fires immediately; later ticks are one interval apart.
    let mut cadence = interval(config.polling_interval);

    for n in 1..=config.max_cycles {
        cadence.tick().await;
        let outcome = cycle.run_once(Utc::now()).await;
        info!(
            "cycle {}/{}: state={} fetched={} failed={} accepted={}",
            n,
            config.max_cycles,
            outcome.market_state.reason(),
            outcome.symbols_succeeded,
            outcome.symbols_failed.len(),
            outcome
                .publish
                .as_ref()
                .map(|p| p.accepted)
                .unwrap_or_default(),
        );
    }
}
