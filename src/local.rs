//! File-backed collaborators for running the loop without managed services.
//!
//! The deployed system talks to a managed secret store and a managed
//! stream; locally, a JSON map stands in for the store and an append-only
//! NDJSON file stands in for the stream.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use tickfeed::credentials::SecretStoreError;
use tickfeed::publisher::{RecordStatus, StreamRecord};
use tickfeed::{SecretStore, SinkError, StreamSink};

/// Secret store backed by a plain JSON object file: `{"name": "value"}`.
pub struct FileSecretStore {
    path: PathBuf,
}

impl FileSecretStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SecretStore for FileSecretStore {
    fn get_secret(&self, name: &str) -> Result<Option<String>, SecretStoreError> {
        if !self.path.exists() {
            return Err(SecretStoreError::NotFound(format!(
                "secrets file {} does not exist",
                self.path.display()
            )));
        }
        let raw = std::fs::read_to_string(&self.path)
            .map_err(|e| SecretStoreError::Unavailable(e.to_string()))?;
        let secrets: HashMap<String, String> = serde_json::from_str(&raw)
            .map_err(|e| SecretStoreError::Unavailable(format!("bad secrets file: {}", e)))?;
        Ok(secrets.get(name).cloned())
    }
}

/// Append-only stream backed by an NDJSON file, one record per line.
///
/// A single file preserves total order, which subsumes the per-partition
/// ordering the managed stream promises.
pub struct FileStreamSink {
    path: PathBuf,
    stream_name: String,
    lock: Mutex<()>,
}

impl FileStreamSink {
    pub fn new(path: impl Into<PathBuf>, stream_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            stream_name: stream_name.into(),
            lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl StreamSink for FileStreamSink {
    async fn put_records(&self, records: &[StreamRecord]) -> Result<Vec<RecordStatus>, SinkError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| SinkError::Unavailable("stream file lock poisoned".to_string()))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| SinkError::Unavailable(e.to_string()))?;

        for record in records {
            file.write_all(&record.payload)
                .and_then(|_| file.write_all(b"\n"))
                .map_err(|e| SinkError::Unavailable(e.to_string()))?;
        }

        debug!(
            "appended {} records to {} ({})",
            records.len(),
            self.path.display(),
            self.stream_name
        );

        Ok(vec![RecordStatus::Accepted; records.len()])
    }
}
