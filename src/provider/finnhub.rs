//! Finnhub quote client.
//!
//! Fetches real-time quotes from the Finnhub `/quote` endpoint, one request
//! per symbol, sequentially, under the client-side [`RateBudget`]. Finnhub's
//! free tier allows 60 API calls per minute.
//! API documentation: https://finnhub.io/docs/api

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::Utc;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::credentials::Credential;
use crate::errors::FetchError;
use crate::models::{Quote, Symbol};

use super::rate_budget::RateBudget;

const BASE_URL: &str = "https://finnhub.io/api/v1";

/// Per-request timeout. Bounds worst-case cycle latency at
/// symbols x this value.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Response from /quote. Finnhub uses single-letter field names.
#[derive(Debug, Deserialize)]
struct QuoteResponse {
    /// Current price
    c: Option<f64>,
    /// High price of the day
    h: Option<f64>,
    /// Low price of the day
    l: Option<f64>,
    /// Open price of the day
    o: Option<f64>,
    /// Previous close price
    pc: Option<f64>,
    // Note: d (change), dp (percent change), t (timestamp) exist but the
    // record derives change itself and stamps its own observation time.
}

/// Finnhub quote client. Owns the rate budget for the process lifetime.
pub struct FinnhubClient {
    client: Client,
    base_url: String,
    budget: Mutex<RateBudget>,
}

impl FinnhubClient {
    /// Create a client against the production Finnhub endpoint.
    pub fn new(calls_per_minute: u32) -> Self {
        Self::with_base_url(BASE_URL, calls_per_minute)
    }

    /// Create a client against an alternate endpoint (used by tests).
    pub fn with_base_url(base_url: impl Into<String>, calls_per_minute: u32) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.into(),
            budget: Mutex::new(RateBudget::new(calls_per_minute)),
        }
    }

    /// Fetch quotes for the given symbols, in order, one result per symbol.
    ///
    /// Sequential by design: the budget is attributed deterministically and
    /// the cycle never races itself. Once the budget window is exhausted the
    /// remaining symbols short-circuit with `RateLimited` without issuing
    /// requests and without consuming budget. Symbols not attempted before
    /// `deadline` are marked `Cancelled`. No retries here; the next cycle is
    /// the retry point.
    pub async fn fetch_all(
        &self,
        symbols: &[Symbol],
        credential: &Credential,
        deadline: Instant,
    ) -> Vec<Result<Quote, FetchError>> {
        let mut results = Vec::with_capacity(symbols.len());
        let mut budget_exhausted = false;

        for symbol in symbols {
            if Instant::now() >= deadline {
                debug!("cycle deadline reached before {}", symbol);
                results.push(Err(FetchError::Cancelled));
                continue;
            }

            if budget_exhausted || !self.lock_budget().try_consume() {
                if !budget_exhausted {
                    warn!("rate budget exhausted, short-circuiting remaining symbols");
                }
                budget_exhausted = true;
                results.push(Err(FetchError::RateLimited));
                continue;
            }

            results.push(self.fetch_quote(symbol, credential).await);
        }

        results
    }

    /// One attempt for one symbol. The budget unit was already consumed;
    /// failed calls count against the provider's limit too.
    async fn fetch_quote(
        &self,
        symbol: &str,
        credential: &Credential,
    ) -> Result<Quote, FetchError> {
        let url = format!("{}/quote", self.base_url);

        debug!("fetching quote for {}", symbol);

        let response = self
            .client
            .get(&url)
            .header("X-Finnhub-Token", credential.reveal())
            .query(&[("symbol", symbol)])
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(FetchError::Auth {
                status: status.as_u16(),
            });
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            // Provider-side throttle despite our budget; same classification.
            return Err(FetchError::RateLimited);
        }

        if !status.is_success() {
            return Err(FetchError::Network {
                message: format!("HTTP {}", status),
            });
        }

        let body: QuoteResponse =
            response
                .json()
                .await
                .map_err(|e| FetchError::Malformed {
                    message: format!("invalid quote body: {}", e),
                })?;

        normalize(symbol, body)
    }

    fn lock_budget(&self) -> MutexGuard<'_, RateBudget> {
        self.budget.lock().unwrap_or_else(|poisoned| {
            warn!("rate budget mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

/// Turn a Finnhub body into a quote record.
///
/// Finnhub answers unknown symbols with an all-zero body instead of an
/// error, so a zero price with a zero open is treated as "no data". Optional
/// fields that are missing or negative are left absent rather than zeroed,
/// so downstream can tell "no data" from "zero".
fn normalize(symbol: &str, response: QuoteResponse) -> Result<Quote, FetchError> {
    let raw_price = response.c.ok_or_else(|| FetchError::Malformed {
        message: format!("no price field for {}", symbol),
    })?;

    if raw_price == 0.0 && response.o.unwrap_or(0.0) == 0.0 {
        return Err(FetchError::Malformed {
            message: format!("no quote data for {}", symbol),
        });
    }

    if raw_price < 0.0 {
        return Err(FetchError::Malformed {
            message: format!("negative price {} for {}", raw_price, symbol),
        });
    }

    let price = Decimal::try_from(raw_price).map_err(|_| FetchError::Malformed {
        message: format!("unrepresentable price {} for {}", raw_price, symbol),
    })?;

    let previous_close = optional_price(response.pc);
    let high = optional_price(response.h);
    let low = optional_price(response.l);
    let open = optional_price(response.o);

    // Change is derived against the previous close; when the API omits it
    // the current price stands in (change 0), but the serialized
    // previous_close field itself stays absent.
    let baseline = previous_close.unwrap_or(price);
    let change = price - baseline;
    let change_percent = if baseline > Decimal::ZERO {
        format!("{:.2}", change / baseline * Decimal::ONE_HUNDRED)
    } else {
        "0.00".to_string()
    };

    Ok(Quote {
        symbol: symbol.to_string(),
        price,
        change,
        change_percent,
        high,
        low,
        open,
        previous_close,
        observed_at: Utc::now(),
    })
}

/// Optional fields must be non-negative to be kept; anything else is absent.
fn optional_price(value: Option<f64>) -> Option<Decimal> {
    value
        .filter(|v| *v >= 0.0)
        .and_then(|v| Decimal::try_from(v).ok())
}
