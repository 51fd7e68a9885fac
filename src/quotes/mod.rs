//! Market-data providers: one normalized `Quote` shape over heterogeneous
//! upstream schemas. Translation happens only inside each provider; the rest
//! of the engine depends on the `QuoteProvider` trait alone.

pub mod alphavantage;
pub mod brapi;

pub use alphavantage::AlphaVantageProvider;
pub use brapi::BrapiProvider;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::quote::{Candle, HistoryRange, Quote};

/// Per-request timeout for quote HTTP calls. Deliberately shorter than the
/// trade-execution window: a slow upstream must never hold up anything else.
pub const QUOTE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Error)]
pub enum QuoteError {
    /// Upstream answered but had no usable price for the ticker.
    #[error("quote unavailable for {ticker}: {reason}")]
    Unavailable { ticker: String, reason: String },

    /// Network/timeout failure talking to the upstream.
    #[error("market data request failed")]
    Transport(#[from] reqwest::Error),

    /// Upstream payload did not match its documented schema.
    #[error("malformed market data payload: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait QuoteProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn get_quote(&self, ticker: &str) -> Result<Quote, QuoteError>;

    async fn get_quotes(&self, tickers: &[String]) -> Result<Vec<Quote>, QuoteError>;

    async fn get_history(
        &self,
        ticker: &str,
        range: HistoryRange,
    ) -> Result<Vec<Candle>, QuoteError>;
}

/// HTTP client shared by the concrete providers.
pub fn http_client() -> Result<reqwest::Client, QuoteError> {
    Ok(reqwest::Client::builder().timeout(QUOTE_TIMEOUT).build()?)
}
