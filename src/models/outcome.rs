use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::clock::MarketState;
use crate::errors::ErrorKind;

use super::Symbol;

/// A symbol that failed during the fetch phase, with the reason.
#[derive(Clone, Debug, Serialize)]
pub struct SymbolFailure {
    pub symbol: Symbol,
    pub kind: ErrorKind,
}

/// A record the stream rejected, identified by its index in the submitted
/// batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RecordRejection {
    pub index: usize,
    pub kind: ErrorKind,
}

/// Result of one batch write to the stream.
///
/// Rejections keep their original batch index so the caller can tell which
/// symbols were dropped. Accepted records are never retried; requeueing
/// across cycles would reorder or duplicate ticks.
#[derive(Clone, Debug, Default, Serialize)]
pub struct PublishResult {
    pub accepted: usize,
    pub rejected: Vec<RecordRejection>,
}

/// Summary of one poll cycle, returned to the invoker.
///
/// Constructed once per cycle and never retained past the call. Every cycle
/// produces one of these, including cycles skipped for market hours and
/// cycles aborted for want of a credential.
#[derive(Clone, Debug, Serialize)]
pub struct PollOutcome {
    pub cycle_started_at: DateTime<Utc>,
    pub market_state: MarketState,
    pub symbols_requested: usize,
    pub symbols_succeeded: usize,
    pub symbols_failed: Vec<SymbolFailure>,
    /// Absent when the cycle never reached the publish phase.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish: Option<PublishResult>,
}

impl PollOutcome {
    /// Outcome for a cycle skipped because the market is closed. Zero API
    /// calls, zero publish calls.
    pub fn skipped(started_at: DateTime<Utc>, state: MarketState) -> Self {
        Self {
            cycle_started_at: started_at,
            market_state: state,
            symbols_requested: 0,
            symbols_succeeded: 0,
            symbols_failed: Vec::new(),
            publish: None,
        }
    }

    /// Outcome for a cycle aborted before any network call. Every requested
    /// symbol is reported failed with the same reason.
    pub fn aborted(
        started_at: DateTime<Utc>,
        state: MarketState,
        symbols: &[Symbol],
        kind: ErrorKind,
    ) -> Self {
        Self {
            cycle_started_at: started_at,
            market_state: state,
            symbols_requested: symbols.len(),
            symbols_succeeded: 0,
            symbols_failed: symbols
                .iter()
                .map(|s| SymbolFailure {
                    symbol: s.clone(),
                    kind,
                })
                .collect(),
            publish: None,
        }
    }
}
