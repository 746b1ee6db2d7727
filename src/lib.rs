//! tickfeed
//!
//! Periodically samples real-time equity quotes from Finnhub and publishes
//! them as structured records to a durable append-only stream, gated by US
//! market hours.
//!
//! # Architecture
//!
//! ```text
//! trigger ──▶ PollCycle::run_once(now)
//!                │
//!                ├─▶ MarketClock ──── closed? ──▶ outcome (skipped)
//!                ├─▶ CredentialResolver ── store ▸ static fallback ▸ cache
//!                ├─▶ FinnhubClient ──── sequential fetch under RateBudget
//!                └─▶ StreamPublisher ── one batch, partitioned by symbol
//!                       │
//!                       ▼
//!                  PollOutcome (always returned, never raises)
//! ```
//!
//! The loop holds the only decision logic in the system; scheduling, the
//! secret store and the stream itself are external collaborators reached
//! through the [`credentials::SecretStore`] and [`publisher::StreamSink`]
//! traits. One invocation is one cycle; there are no retries inside a cycle
//! and no buffering across cycles — the external cadence is the retry
//! mechanism.
//!
//! # Core types
//!
//! - [`PollCycle`] - the single "poll once" entry point
//! - [`MarketClock`] / [`MarketState`] - market-hours state machine
//! - [`CredentialResolver`] / [`Credential`] - secret resolution with fallback
//! - [`FinnhubClient`] / [`RateBudget`] - quote fetching under a call budget
//! - [`StreamPublisher`] / [`PublishResult`] - batched stream writes
//! - [`PollOutcome`] - per-cycle summary returned to the invoker

pub mod clock;
pub mod config;
pub mod credentials;
pub mod cycle;
pub mod errors;
pub mod models;
pub mod provider;
pub mod publisher;

pub use clock::{HoursConfig, MarketClock, MarketState};
pub use config::Config;
pub use credentials::{Credential, CredentialConfig, CredentialResolver, SecretStore};
pub use cycle::{CycleConfig, PollCycle};
pub use errors::{ErrorKind, FetchError, ResolveError, SinkError};
pub use models::{PollOutcome, PublishResult, Quote, RecordRejection, Symbol, SymbolFailure};
pub use provider::{FinnhubClient, RateBudget};
pub use publisher::{RecordStatus, StreamPublisher, StreamRecord, StreamSink};
