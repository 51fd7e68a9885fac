//! Read-only portfolio queries: open positions, per-ticker trade history,
//! and a quote-enriched valuation that degrades gracefully when market
//! data is down.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::engine::normalize_ticker;
use crate::error::EngineError;
use crate::persistence;
use crate::pnl::{compute_unrealized_pnl, round_money};
use crate::quotes::QuoteProvider;
use crate::types::position::Position;
use crate::types::trade::Trade;

/// Positions with quantity > 0, ticker ascending. Pure read.
pub async fn get_portfolio(pool: &PgPool, user_id: Uuid) -> Result<Vec<Position>, EngineError> {
    Ok(persistence::list_open_positions(pool, user_id).await?)
}

/// A user's trades for one ticker, most recent first. The ticker goes
/// through the same normalization as execution, so lookups stay symmetric.
pub async fn get_trade_history(
    pool: &PgPool,
    user_id: Uuid,
    ticker: &str,
) -> Result<Vec<Trade>, EngineError> {
    let ticker = normalize_ticker(ticker)?;
    Ok(persistence::list_trades_for_user(pool, user_id, &ticker).await?)
}

/// One holding in the valuation view. Market fields are absent and `stale`
/// is set when no live quote was obtainable; quantity and average cost are
/// always the last-known truth from storage.
#[derive(Debug, Clone, Serialize)]
pub struct HoldingValuation {
    pub ticker: String,
    pub quantity: Decimal,
    pub average_cost: Decimal,
    pub invested: Decimal,
    pub market_price: Option<Decimal>,
    pub market_value: Option<Decimal>,
    pub unrealized_pnl: Option<Decimal>,
    pub stale: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PortfolioValuation {
    pub holdings: Vec<HoldingValuation>,
    pub total_invested: Decimal,
    /// Sum over priced holdings only; stale holdings are excluded rather
    /// than valued at a substitute price.
    pub total_value: Decimal,
    pub total_unrealized_pnl: Decimal,
}

/// Portfolio enriched with live quotes. Quote failures never fail the view:
/// the affected holdings come back flagged stale.
pub async fn get_portfolio_valuation(
    pool: &PgPool,
    provider: &dyn QuoteProvider,
    user_id: Uuid,
) -> Result<PortfolioValuation, EngineError> {
    let positions = get_portfolio(pool, user_id).await?;

    let tickers: Vec<String> = positions.iter().map(|p| p.ticker.clone()).collect();
    let quotes: HashMap<String, Decimal> = match provider.get_quotes(&tickers).await {
        Ok(quotes) => quotes.into_iter().map(|q| (q.ticker, q.price)).collect(),
        Err(err) => {
            tracing::warn!(provider = provider.name(), error = %err, "quotes unavailable, valuation degraded");
            HashMap::new()
        }
    };

    let mut holdings = Vec::with_capacity(positions.len());
    let mut total_invested = Decimal::ZERO;
    let mut total_value = Decimal::ZERO;
    for position in positions {
        let invested = position.quantity * position.average_cost;
        total_invested += invested;
        let market_price = quotes.get(&position.ticker).copied();
        let (market_value, unrealized) = match market_price {
            Some(price) => {
                let value = position.quantity * price;
                total_value += value;
                (
                    Some(round_money(value)),
                    Some(compute_unrealized_pnl(
                        position.quantity,
                        position.average_cost,
                        price,
                    )),
                )
            }
            None => (None, None),
        };
        holdings.push(HoldingValuation {
            ticker: position.ticker,
            quantity: position.quantity,
            average_cost: position.average_cost,
            invested: round_money(invested),
            market_price,
            market_value,
            unrealized_pnl: unrealized,
            stale: market_price.is_none(),
        });
    }

    let priced_invested: Decimal = holdings
        .iter()
        .filter(|h| !h.stale)
        .map(|h| h.quantity * h.average_cost)
        .sum();

    Ok(PortfolioValuation {
        holdings,
        total_invested: round_money(total_invested),
        total_value: round_money(total_value),
        total_unrealized_pnl: round_money(total_value - priced_invested),
    })
}
