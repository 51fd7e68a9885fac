use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Point-in-time price observation from a market-data provider. Ephemeral:
/// never persisted by this engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub ticker: String,
    pub price: Decimal,
    pub as_of: DateTime<Utc>,
    pub currency: String,
}

/// One daily bar from a provider's historical series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

/// History window accepted by `QuoteProvider::get_history`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryRange {
    #[serde(rename = "1d")]
    Day,
    #[serde(rename = "5d")]
    FiveDays,
    #[serde(rename = "1mo")]
    Month,
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[serde(rename = "6mo")]
    SixMonths,
    #[serde(rename = "1y")]
    Year,
    #[serde(rename = "2y")]
    TwoYears,
    #[serde(rename = "5y")]
    FiveYears,
    Max,
}

impl HistoryRange {
    /// Wire form shared by the daily-quote upstreams.
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryRange::Day => "1d",
            HistoryRange::FiveDays => "5d",
            HistoryRange::Month => "1mo",
            HistoryRange::ThreeMonths => "3mo",
            HistoryRange::SixMonths => "6mo",
            HistoryRange::Year => "1y",
            HistoryRange::TwoYears => "2y",
            HistoryRange::FiveYears => "5y",
            HistoryRange::Max => "max",
        }
    }

    /// Approximate number of daily bars the window covers, for providers
    /// that only serve full series and need client-side truncation.
    pub fn approx_days(&self) -> Option<usize> {
        match self {
            HistoryRange::Day => Some(1),
            HistoryRange::FiveDays => Some(5),
            HistoryRange::Month => Some(22),
            HistoryRange::ThreeMonths => Some(66),
            HistoryRange::SixMonths => Some(132),
            HistoryRange::Year => Some(260),
            HistoryRange::TwoYears => Some(520),
            HistoryRange::FiveYears => Some(1300),
            HistoryRange::Max => None,
        }
    }
}
