//! Error types and outcome classification for the polling loop.
//!
//! This module provides:
//! - [`ErrorKind`]: flat classification used in per-cycle outcomes
//! - [`FetchError`]: errors from fetching a single quote
//! - [`ResolveError`]: errors from credential resolution
//! - [`SinkError`]: transport errors from the stream collaborator

use serde::Serialize;
use thiserror::Error;

/// Flat classification of everything that can go wrong with one symbol or
/// one stream record during a cycle.
///
/// Structured errors ([`FetchError`], [`ResolveError`]) map into this via
/// their `kind()` methods so the cycle outcome can carry a uniform,
/// serializable reason per failed item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No credential could be resolved from the store or the static fallback.
    NoCredential,
    /// The price API rejected the credential.
    AuthFailure,
    /// The client-side rate budget was exhausted before this symbol.
    RateLimited,
    /// Network or timeout failure talking to the price API.
    NetworkFailure,
    /// The price API response was missing required fields.
    MalformedResponse,
    /// The stream throttled this record.
    Throttled,
    /// The serialized record exceeded the stream's size limit.
    RecordTooLarge,
    /// The stream service was unavailable for this batch.
    ServiceUnavailable,
    /// The cycle deadline expired before this symbol was attempted.
    Cancelled,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::NoCredential => "no_credential",
            Self::AuthFailure => "auth_failure",
            Self::RateLimited => "rate_limited",
            Self::NetworkFailure => "network_failure",
            Self::MalformedResponse => "malformed_response",
            Self::Throttled => "throttled",
            Self::RecordTooLarge => "record_too_large",
            Self::ServiceUnavailable => "service_unavailable",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Errors fetching a quote for a single symbol.
///
/// One attempt per symbol per cycle; none of these are retried within the
/// cycle. The next scheduled cycle is the retry point.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The per-minute call budget ran out. The symbol was not attempted and
    /// no budget was consumed for it.
    #[error("rate budget exhausted")]
    RateLimited,

    /// Network-level failure, including timeouts.
    #[error("network failure: {message}")]
    Network {
        /// Transport error description
        message: String,
    },

    /// The API returned an auth-related status. The caller should invalidate
    /// its cached credential when it sees this.
    #[error("authentication rejected (HTTP {status})")]
    Auth {
        /// The HTTP status the API returned
        status: u16,
    },

    /// The response body did not contain a usable quote.
    #[error("malformed response: {message}")]
    Malformed {
        /// What was wrong with the body
        message: String,
    },

    /// The cycle deadline expired before this symbol was attempted.
    #[error("cycle deadline exceeded")]
    Cancelled,
}

impl FetchError {
    /// Returns the flat classification for outcome reporting.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RateLimited => ErrorKind::RateLimited,
            Self::Network { .. } => ErrorKind::NetworkFailure,
            Self::Auth { .. } => ErrorKind::AuthFailure,
            Self::Malformed { .. } => ErrorKind::MalformedResponse,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        // Timeouts and transport errors are the same thing to the cycle:
        // the symbol failed this cycle and the next cycle tries again.
        Self::Network {
            message: e.to_string(),
        }
    }
}

/// Errors resolving an API credential.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ResolveError {
    /// The store lookup failed or was skipped and no static fallback was
    /// configured. The cycle aborts before any network call.
    #[error("no credential available from store or static fallback")]
    NoCredential,
}

impl ResolveError {
    /// Returns the flat classification for outcome reporting.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoCredential => ErrorKind::NoCredential,
        }
    }
}

/// Transport-level failure of a whole batch write to the stream.
///
/// Per-record rejections are not errors at this level; they come back inside
/// the sink's response. This is only for the case where the batch call itself
/// could not be made.
#[derive(Error, Debug)]
pub enum SinkError {
    /// The stream service could not be reached or refused the whole batch.
    #[error("stream unavailable: {0}")]
    Unavailable(String),
}
