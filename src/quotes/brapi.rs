//! brapi.dev adapter. Quotes arrive as JSON numbers under `results`,
//! history as unix-second daily bars under `historicalDataPrice`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::quotes::{QuoteError, QuoteProvider};
use crate::types::quote::{Candle, HistoryRange, Quote};

const DEFAULT_BASE_URL: &str = "https://brapi.dev/api";

pub struct BrapiProvider {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl BrapiProvider {
    pub fn new(client: reqwest::Client, token: Option<String>) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            token,
        }
    }

    /// Point at a different endpoint (staging, local stub).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch(&self, path: &str, params: &[(&str, &str)]) -> Result<Value, QuoteError> {
        let url = format!("{}/{}", self.base_url, path);
        let mut request = self.client.get(&url).query(params);
        if let Some(token) = &self.token {
            request = request.query(&[("token", token.as_str())]);
        }
        let body = request.send().await?.error_for_status()?.json::<Value>().await?;
        Ok(body)
    }
}

#[async_trait]
impl QuoteProvider for BrapiProvider {
    fn name(&self) -> &str {
        "brapi"
    }

    async fn get_quote(&self, ticker: &str) -> Result<Quote, QuoteError> {
        let body = self.fetch(&format!("quote/{ticker}"), &[]).await?;
        parse_quote(ticker, &body)
    }

    async fn get_quotes(&self, tickers: &[String]) -> Result<Vec<Quote>, QuoteError> {
        if tickers.is_empty() {
            return Ok(Vec::new());
        }
        // Batch endpoint: comma-joined tickers, one round trip.
        let joined = tickers.join(",");
        let body = self.fetch(&format!("quote/{joined}"), &[]).await?;
        parse_quotes(&body)
    }

    async fn get_history(
        &self,
        ticker: &str,
        range: HistoryRange,
    ) -> Result<Vec<Candle>, QuoteError> {
        let body = self
            .fetch(
                &format!("quote/{ticker}"),
                &[("range", range.as_str()), ("interval", "1d")],
            )
            .await?;
        parse_history(ticker, &body)
    }
}

/// First element of `results`, or `Unavailable` when the upstream answered
/// with an empty set (unknown ticker).
fn first_result<'a>(ticker: &str, body: &'a Value) -> Result<&'a Value, QuoteError> {
    body.get("results")
        .and_then(Value::as_array)
        .ok_or_else(|| QuoteError::Malformed("missing results array".into()))?
        .first()
        .ok_or_else(|| QuoteError::Unavailable {
            ticker: ticker.to_string(),
            reason: "no results for ticker".into(),
        })
}

fn decimal_field(entry: &Value, field: &str) -> Result<Decimal, QuoteError> {
    let raw = entry
        .get(field)
        .and_then(Value::as_f64)
        .ok_or_else(|| QuoteError::Malformed(format!("missing numeric field {field}")))?;
    Decimal::try_from(raw)
        .map_err(|_| QuoteError::Malformed(format!("unrepresentable value in {field}")))
}

fn quote_from_entry(entry: &Value) -> Result<Quote, QuoteError> {
    let symbol = entry
        .get("symbol")
        .and_then(Value::as_str)
        .ok_or_else(|| QuoteError::Malformed("missing symbol".into()))?;
    let price = decimal_field(entry, "regularMarketPrice")?;
    // regularMarketTime is RFC 3339; fall back to receipt time when absent.
    let as_of = entry
        .get("regularMarketTime")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);
    let currency = entry
        .get("currency")
        .and_then(Value::as_str)
        .unwrap_or("BRL")
        .to_string();
    Ok(Quote {
        ticker: symbol.to_string(),
        price,
        as_of,
        currency,
    })
}

pub fn parse_quote(ticker: &str, body: &Value) -> Result<Quote, QuoteError> {
    quote_from_entry(first_result(ticker, body)?)
}

pub fn parse_quotes(body: &Value) -> Result<Vec<Quote>, QuoteError> {
    body.get("results")
        .and_then(Value::as_array)
        .ok_or_else(|| QuoteError::Malformed("missing results array".into()))?
        .iter()
        .map(quote_from_entry)
        .collect()
}

pub fn parse_history(ticker: &str, body: &Value) -> Result<Vec<Candle>, QuoteError> {
    let entry = first_result(ticker, body)?;
    let bars = match entry.get("historicalDataPrice").and_then(Value::as_array) {
        Some(bars) => bars,
        None => return Ok(Vec::new()),
    };
    bars.iter()
        .map(|bar| {
            let secs = bar
                .get("date")
                .and_then(Value::as_i64)
                .ok_or_else(|| QuoteError::Malformed("missing bar date".into()))?;
            let date = DateTime::from_timestamp(secs, 0)
                .ok_or_else(|| QuoteError::Malformed("bar date out of range".into()))?
                .date_naive();
            Ok(Candle {
                date,
                open: decimal_field(bar, "open")?,
                high: decimal_field(bar, "high")?,
                low: decimal_field(bar, "low")?,
                close: decimal_field(bar, "close")?,
                volume: decimal_field(bar, "volume")?,
            })
        })
        .collect()
}
