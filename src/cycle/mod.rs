//! The poll cycle orchestrator.
//!
//! One invocation runs one pass: market check, credential resolve, fetch,
//! publish, outcome. Every failure kind is captured inside the returned
//! [`PollOutcome`]; the cycle never raises past its own boundary, so the
//! invoker can always log a summary. The external trigger is expected to
//! invoke cycles serially on a fixed cadence — that cadence, not anything in
//! here, is the retry mechanism.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::clock::{HoursConfig, MarketClock};
use crate::credentials::CredentialResolver;
use crate::errors::ErrorKind;
use crate::models::{PollOutcome, Quote, Symbol, SymbolFailure};
use crate::provider::FinnhubClient;
use crate::publisher::StreamPublisher;

/// Per-cycle settings, fixed for the process lifetime.
#[derive(Clone, Debug)]
pub struct CycleConfig {
    /// Symbols to poll, in order.
    pub symbols: Vec<Symbol>,
    /// Market-hours gating.
    pub hours: HoursConfig,
    /// Overall deadline for one cycle; fetches not attempted in time are
    /// cancelled and whatever was fetched is still published.
    pub deadline: Duration,
}

/// Composes the clock, resolver, client and publisher into the single
/// "poll once" entry point.
pub struct PollCycle {
    clock: MarketClock,
    resolver: CredentialResolver,
    client: FinnhubClient,
    publisher: StreamPublisher,
    config: CycleConfig,
}

impl PollCycle {
    pub fn new(
        clock: MarketClock,
        resolver: CredentialResolver,
        client: FinnhubClient,
        publisher: StreamPublisher,
        config: CycleConfig,
    ) -> Self {
        Self {
            clock,
            resolver,
            client,
            publisher,
            config,
        }
    }

    /// Run one cycle. Always returns an outcome, never an error.
    pub async fn run_once(&self, now: DateTime<Utc>) -> PollOutcome {
        let state = self.clock.evaluate(now, &self.config.hours);

        // Closed market terminates the cycle with zero API calls. This is
        // the loop's primary cost control.
        if !state.is_pollable() {
            info!("cycle skipped: {}", state.reason());
            return PollOutcome::skipped(now, state);
        }

        let credential = match self.resolver.resolve() {
            Ok(credential) => credential,
            Err(e) => {
                // Fatal for the cycle, not the process. Nothing was fetched,
                // nothing is published.
                warn!("cycle aborted: {}", e);
                return PollOutcome::aborted(now, state, &self.config.symbols, e.kind());
            }
        };

        let deadline = Instant::now() + self.config.deadline;
        let results = self
            .client
            .fetch_all(&self.config.symbols, &credential, deadline)
            .await;

        let mut quotes: Vec<Quote> = Vec::new();
        let mut failed: Vec<SymbolFailure> = Vec::new();
        let mut saw_auth_failure = false;

        for (symbol, result) in self.config.symbols.iter().zip(results) {
            match result {
                Ok(quote) => quotes.push(quote),
                Err(e) => {
                    let kind = e.kind();
                    saw_auth_failure |= kind == ErrorKind::AuthFailure;
                    warn!("fetch failed for {}: {}", symbol, e);
                    failed.push(SymbolFailure {
                        symbol: symbol.clone(),
                        kind,
                    });
                }
            }
        }

        if saw_auth_failure {
            // The API rejected the credential; make the next cycle resolve
            // a fresh one instead of replaying the bad cache entry.
            self.resolver.invalidate();
        }

        // Partial fetch failure does not abort: whatever succeeded goes out.
        let publish = if quotes.is_empty() {
            None
        } else {
            Some(self.publisher.publish_batch(&quotes).await)
        };

        let outcome = PollOutcome {
            cycle_started_at: now,
            market_state: state,
            symbols_requested: self.config.symbols.len(),
            symbols_succeeded: quotes.len(),
            symbols_failed: failed,
            publish,
        };

        info!(
            "cycle complete: {}/{} symbols fetched, {} published, {} failed",
            outcome.symbols_succeeded,
            outcome.symbols_requested,
            outcome
                .publish
                .as_ref()
                .map(|p| p.accepted)
                .unwrap_or_default(),
            outcome.symbols_failed.len(),
        );

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MarketState;
    use crate::credentials::{CredentialConfig, SecretStore, SecretStoreError};
    use crate::errors::SinkError;
    use crate::publisher::{RecordStatus, StreamRecord, StreamSink};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct EmptyStore;
    impl SecretStore for EmptyStore {
        fn get_secret(&self, _name: &str) -> Result<Option<String>, SecretStoreError> {
            Ok(None)
        }
    }

    struct CountingSink {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl StreamSink for CountingSink {
        async fn put_records(
            &self,
            records: &[StreamRecord],
        ) -> Result<Vec<RecordStatus>, SinkError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![RecordStatus::Accepted; records.len()])
        }
    }

    fn cycle_with(
        fallback: Option<&str>,
        hours: HoursConfig,
        sink: Arc<CountingSink>,
    ) -> PollCycle {
        let resolver = CredentialResolver::new(
            Arc::new(EmptyStore),
            CredentialConfig {
                use_store: false,
                secret_name: "finnhub-api-key".to_string(),
                static_fallback: fallback.map(str::to_string),
            },
        );
        PollCycle::new(
            MarketClock::new(),
            resolver,
            // Unroutable endpoint: these tests must not reach the network.
            FinnhubClient::with_base_url("http://127.0.0.1:1", 10),
            StreamPublisher::new(sink),
            CycleConfig {
                symbols: vec!["AAPL".to_string(), "GOOGL".to_string()],
                hours,
                deadline: Duration::from_secs(5),
            },
        )
    }

    fn saturday() -> DateTime<Utc> {
        // Saturday 2026-03-14, mid-day Eastern
        Utc.with_ymd_and_hms(2026, 3, 14, 15, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn closed_market_skips_without_collaborator_calls() {
        let sink = Arc::new(CountingSink {
            calls: AtomicUsize::new(0),
        });
        let cycle = cycle_with(
            Some("key"),
            HoursConfig {
                enforce: true,
                test_mode: false,
            },
            sink.clone(),
        );

        let outcome = cycle.run_once(saturday()).await;

        assert_eq!(outcome.market_state, MarketState::ClosedWeekend);
        assert_eq!(outcome.symbols_requested, 0);
        assert!(outcome.publish.is_none());
        assert_eq!(sink.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_credential_aborts_before_any_network_call() {
        let sink = Arc::new(CountingSink {
            calls: AtomicUsize::new(0),
        });
        let cycle = cycle_with(
            None,
            HoursConfig {
                enforce: false,
                test_mode: false,
            },
            sink.clone(),
        );

        let outcome = cycle.run_once(Utc::now()).await;

        assert_eq!(outcome.market_state, MarketState::Open);
        assert_eq!(outcome.symbols_requested, 2);
        assert_eq!(outcome.symbols_succeeded, 0);
        assert!(outcome
            .symbols_failed
            .iter()
            .all(|f| f.kind == ErrorKind::NoCredential));
        assert!(outcome.publish.is_none());
        assert_eq!(sink.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fetch_failures_surface_without_publishing() {
        // Unroutable quote endpoint: both symbols fail with network errors,
        // so the publish phase is skipped entirely.
        let sink = Arc::new(CountingSink {
            calls: AtomicUsize::new(0),
        });
        let cycle = cycle_with(
            Some("key"),
            HoursConfig {
                enforce: false,
                test_mode: false,
            },
            sink.clone(),
        );

        let outcome = cycle.run_once(Utc::now()).await;

        assert_eq!(outcome.symbols_succeeded, 0);
        assert_eq!(outcome.symbols_failed.len(), 2);
        assert!(outcome
            .symbols_failed
            .iter()
            .all(|f| f.kind == ErrorKind::NetworkFailure));
        assert!(outcome.publish.is_none());
        assert_eq!(sink.calls.load(Ordering::SeqCst), 0);
    }
}
