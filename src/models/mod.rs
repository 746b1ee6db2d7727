//! Domain types shared across the polling loop.

mod outcome;
mod quote;

pub use outcome::{PollOutcome, PublishResult, RecordRejection, SymbolFailure};
pub use quote::Quote;

/// Ticker identifying a tradable equity. Upper-cased at configuration load
/// and used as the stream partition key.
pub type Symbol = String;
