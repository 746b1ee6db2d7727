//! Publishing quote records to the append-only stream.
//!
//! Each quote becomes one self-contained JSON record, partitioned by symbol
//! so the stream preserves per-symbol ordering. The whole cycle's records go
//! out as a single batch; the stream may accept some and reject others, and
//! every rejection is reported with its original index. Nothing is buffered
//! across cycles and nothing is retried here: requeueing dropped records
//! would reorder or duplicate ticks.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::errors::{ErrorKind, SinkError};
use crate::models::{PublishResult, Quote, RecordRejection};

/// One serialized record bound for the stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamRecord {
    /// Stream-level grouping key; per-key ordering is the stream's promise.
    pub partition_key: String,
    /// Self-contained JSON payload.
    pub payload: Vec<u8>,
}

/// Per-record result of a batch write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordStatus {
    Accepted,
    Rejected(ErrorKind),
}

/// The managed append-only stream collaborator.
///
/// `put_records` submits one batch and reports a status per record, in
/// order. A transport-level failure of the whole call surfaces as
/// [`SinkError`]; the publisher maps that to every record rejected.
#[async_trait]
pub trait StreamSink: Send + Sync {
    async fn put_records(&self, records: &[StreamRecord]) -> Result<Vec<RecordStatus>, SinkError>;
}

/// Serializes quotes and writes them to the stream.
pub struct StreamPublisher {
    sink: Arc<dyn StreamSink>,
}

impl StreamPublisher {
    pub fn new(sink: Arc<dyn StreamSink>) -> Self {
        Self { sink }
    }

    /// Publish one cycle's quotes as a single batch.
    ///
    /// Records the stream did not accept are dropped from this component's
    /// perspective; the outcome carries their indices and reasons so the
    /// invoker can decide whether to alert.
    pub async fn publish_batch(&self, quotes: &[Quote]) -> PublishResult {
        if quotes.is_empty() {
            return PublishResult::default();
        }

        let mut records = Vec::with_capacity(quotes.len());
        for quote in quotes {
            // Quote serialization cannot fail: every field is a plain
            // serde-friendly value. Still, never let one record sink a batch.
            match serde_json::to_vec(quote) {
                Ok(payload) => records.push(StreamRecord {
                    partition_key: quote.symbol.clone(),
                    payload,
                }),
                Err(e) => {
                    warn!("dropping unserializable record for {}: {}", quote.symbol, e);
                    records.push(StreamRecord {
                        partition_key: quote.symbol.clone(),
                        payload: Vec::new(),
                    });
                }
            }
        }

        debug!("publishing batch of {} records", records.len());

        let statuses = match self.sink.put_records(&records).await {
            Ok(statuses) => statuses,
            Err(e) => {
                warn!("batch write failed: {}", e);
                // Whole-call failure: every record was rejected.
                vec![RecordStatus::Rejected(ErrorKind::ServiceUnavailable); records.len()]
            }
        };

        let mut result = PublishResult::default();
        for (index, status) in statuses.into_iter().enumerate() {
            match status {
                RecordStatus::Accepted => result.accepted += 1,
                RecordStatus::Rejected(kind) => {
                    result.rejected.push(RecordRejection { index, kind })
                }
            }
        }

        if !result.rejected.is_empty() {
            warn!(
                "stream rejected {} of {} records",
                result.rejected.len(),
                quotes.len()
            );
        }

        result
    }
}
