//! Alpha Vantage adapter. Upstream encodes every number as a string and
//! keys fields with ordinal prefixes ("05. price"); all of that stays here.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::quotes::{QuoteError, QuoteProvider};
use crate::types::quote::{Candle, HistoryRange, Quote};

const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co/query";

pub struct AlphaVantageProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl AlphaVantageProvider {
    pub fn new(client: reqwest::Client, api_key: String) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch(&self, function: &str, symbol: &str) -> Result<Value, QuoteError> {
        let body = self
            .client
            .get(&self.base_url)
            .query(&[
                ("function", function),
                ("symbol", symbol),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;
        Ok(body)
    }
}

#[async_trait]
impl QuoteProvider for AlphaVantageProvider {
    fn name(&self) -> &str {
        "alphavantage"
    }

    async fn get_quote(&self, ticker: &str) -> Result<Quote, QuoteError> {
        let body = self.fetch("GLOBAL_QUOTE", ticker).await?;
        parse_global_quote(ticker, &body)
    }

    async fn get_quotes(&self, tickers: &[String]) -> Result<Vec<Quote>, QuoteError> {
        // No batch endpoint upstream: one request per symbol. A ticker the
        // upstream cannot price is skipped, so only that holding degrades.
        let mut quotes = Vec::with_capacity(tickers.len());
        for ticker in tickers {
            match self.get_quote(ticker).await {
                Ok(quote) => quotes.push(quote),
                Err(err) => {
                    tracing::warn!(ticker = %ticker, error = %err, "skipping unquotable ticker");
                }
            }
        }
        Ok(quotes)
    }

    async fn get_history(
        &self,
        ticker: &str,
        range: HistoryRange,
    ) -> Result<Vec<Candle>, QuoteError> {
        let body = self.fetch("TIME_SERIES_DAILY", ticker).await?;
        let mut candles = parse_daily_series(ticker, &body)?;
        // Upstream serves the full series; truncate to the requested window,
        // keeping the most recent bars.
        if let Some(days) = range.approx_days() {
            if candles.len() > days {
                candles.drain(..candles.len() - days);
            }
        }
        Ok(candles)
    }
}

fn string_decimal(entry: &Value, field: &str) -> Result<Decimal, QuoteError> {
    let raw = entry
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| QuoteError::Malformed(format!("missing field {field}")))?;
    Decimal::from_str(raw)
        .map_err(|_| QuoteError::Malformed(format!("non-numeric value in {field}")))
}

/// Rate-limit and bad-key responses come back 200 with a prose body.
fn reject_notices(ticker: &str, body: &Value) -> Result<(), QuoteError> {
    for key in ["Note", "Information", "Error Message"] {
        if let Some(notice) = body.get(key).and_then(Value::as_str) {
            return Err(QuoteError::Unavailable {
                ticker: ticker.to_string(),
                reason: notice.to_string(),
            });
        }
    }
    Ok(())
}

pub fn parse_global_quote(ticker: &str, body: &Value) -> Result<Quote, QuoteError> {
    reject_notices(ticker, body)?;
    let entry = body
        .get("Global Quote")
        .filter(|e| e.as_object().is_some_and(|o| !o.is_empty()))
        .ok_or_else(|| QuoteError::Unavailable {
            ticker: ticker.to_string(),
            reason: "empty global quote".into(),
        })?;
    let symbol = entry
        .get("01. symbol")
        .and_then(Value::as_str)
        .unwrap_or(ticker)
        .to_string();
    let price = string_decimal(entry, "05. price")?;
    let as_of = entry
        .get("07. latest trading day")
        .and_then(Value::as_str)
        .and_then(|s| NaiveDate::from_str(s).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
        .unwrap_or_else(Utc::now);
    Ok(Quote {
        ticker: symbol,
        price,
        as_of,
        currency: "USD".to_string(),
    })
}

/// Parse `Time Series (Daily)` into chronologically ascending candles.
pub fn parse_daily_series(ticker: &str, body: &Value) -> Result<Vec<Candle>, QuoteError> {
    reject_notices(ticker, body)?;
    let series = body
        .get("Time Series (Daily)")
        .and_then(Value::as_object)
        .ok_or_else(|| QuoteError::Unavailable {
            ticker: ticker.to_string(),
            reason: "no daily series".into(),
        })?;
    let mut candles = series
        .iter()
        .map(|(day, bar)| {
            let date = NaiveDate::from_str(day)
                .map_err(|_| QuoteError::Malformed(format!("bad series date {day}")))?;
            Ok(Candle {
                date,
                open: string_decimal(bar, "1. open")?,
                high: string_decimal(bar, "2. high")?,
                low: string_decimal(bar, "3. low")?,
                close: string_decimal(bar, "4. close")?,
                volume: string_decimal(bar, "5. volume")?,
            })
        })
        .collect::<Result<Vec<_>, QuoteError>>()?;
    candles.sort_by_key(|c| c.date);
    Ok(candles)
}
