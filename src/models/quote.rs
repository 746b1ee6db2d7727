use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Symbol;

/// One observed equity quote, produced fresh each fetch and never mutated.
///
/// Optional fields are omitted from the serialized record when the upstream
/// API had no data for them. Absence is deliberate: a missing `high` means
/// "no data", which is not the same thing as a high of zero.
///
/// `change_percent` stays a string-formatted decimal to preserve the source
/// API's precision and formatting for downstream consumers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Quote {
    /// Ticker this quote belongs to (also the stream partition key)
    pub symbol: Symbol,

    /// Current price (required)
    pub price: Decimal,

    /// Absolute change against the previous close
    pub change: Decimal,

    /// Percent change, two fractional digits, as a string
    pub change_percent: String,

    /// Session high, when available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high: Option<Decimal>,

    /// Session low, when available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low: Option<Decimal>,

    /// Session open, when available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open: Option<Decimal>,

    /// Previous session close, when available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_close: Option<Decimal>,

    /// When this quote was observed, UTC
    #[serde(rename = "timestamp", with = "timestamp_millis")]
    pub observed_at: DateTime<Utc>,
}

/// ISO-8601 UTC with fixed millisecond precision, e.g.
/// `2026-03-10T14:30:00.000Z`.
mod timestamp_millis {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
