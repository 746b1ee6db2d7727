//! Price API access: the Finnhub client and its call budget.

mod finnhub;
mod rate_budget;

pub use finnhub::FinnhubClient;
pub use rate_budget::RateBudget;
