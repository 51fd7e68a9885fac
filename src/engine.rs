//! Trade execution engine: validates input, then atomically appends a
//! ledger row and folds it into the (user, ticker) position. The ledger
//! stays the source of truth; the position is its running materialization.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::EngineError;
use crate::persistence;
use crate::types::trade::{Trade, TradeSide};

/// Upper bound on one execution attempt, transaction included. On expiry
/// the transaction is dropped and rolls back whole.
pub const EXECUTE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Deserialize)]
pub struct TradeRequest {
    pub ticker: String,
    pub side: TradeSide,
    pub quantity: Decimal,
    pub price: Decimal,
    #[serde(default)]
    pub fees: Decimal,
    pub executed_at: DateTime<Utc>,
    pub account_id: Uuid,
    /// Optional dedup key: resubmitting with the same key returns the
    /// originally recorded trade instead of appending a duplicate.
    #[serde(default)]
    pub idempotency_key: Option<Uuid>,
}

/// Trim + uppercase, the one normalization applied everywhere a ticker
/// enters the engine. Empty after trimming is a validation failure.
pub fn normalize_ticker(raw: &str) -> Result<String, EngineError> {
    let ticker = raw.trim().to_uppercase();
    if ticker.is_empty() {
        return Err(EngineError::Validation("ticker must not be empty".into()));
    }
    Ok(ticker)
}

fn validate(request: &TradeRequest) -> Result<String, EngineError> {
    if request.quantity <= Decimal::ZERO {
        return Err(EngineError::Validation("quantity must be positive".into()));
    }
    if request.price < Decimal::ZERO {
        return Err(EngineError::Validation("price must not be negative".into()));
    }
    if request.fees < Decimal::ZERO {
        return Err(EngineError::Validation("fees must not be negative".into()));
    }
    normalize_ticker(&request.ticker)
}

/// Fold a BUY into the aggregate: quantity-weighted blend of the prior
/// basis and the new lot, fees capitalized into cost.
pub fn apply_buy(
    quantity_before: Decimal,
    average_cost_before: Decimal,
    quantity: Decimal,
    price: Decimal,
    fees: Decimal,
) -> (Decimal, Decimal) {
    let total_cost_before = quantity_before * average_cost_before;
    let total_cost_trade = quantity * price + fees;
    let quantity_after = quantity_before + quantity;
    let average_cost_after = if quantity_after > Decimal::ZERO {
        (total_cost_before + total_cost_trade) / quantity_after
    } else {
        Decimal::ZERO
    };
    (quantity_after, average_cost_after)
}

/// Fold a SELL: quantity shrinks, basis is untouched unless the position
/// closes, which must reset it to zero so the next BUY starts clean.
pub fn apply_sell(
    quantity_before: Decimal,
    average_cost_before: Decimal,
    quantity: Decimal,
) -> Result<(Decimal, Decimal), EngineError> {
    if quantity_before < quantity {
        return Err(EngineError::InsufficientPosition {
            held: quantity_before,
            requested: quantity,
        });
    }
    let quantity_after = quantity_before - quantity;
    let average_cost_after = if quantity_after.is_zero() {
        Decimal::ZERO
    } else {
        average_cost_before
    };
    Ok((quantity_after, average_cost_after))
}

/// Record an executed trade and update the derived position, atomically.
/// Either both the ledger row and the position update land, or neither.
pub async fn execute_trade(
    pool: &PgPool,
    user_id: Uuid,
    request: TradeRequest,
) -> Result<Trade, EngineError> {
    let ticker = validate(&request)?;
    match tokio::time::timeout(EXECUTE_TIMEOUT, execute_in_tx(pool, user_id, ticker, request)).await
    {
        Ok(result) => result,
        Err(_) => Err(EngineError::Timeout),
    }
}

async fn execute_in_tx(
    pool: &PgPool,
    user_id: Uuid,
    ticker: String,
    request: TradeRequest,
) -> Result<Trade, EngineError> {
    let mut tx = pool.begin().await?;

    if let Some(key) = request.idempotency_key {
        if let Some(existing) =
            persistence::find_trade_by_idempotency_key(&mut tx, user_id, key).await?
        {
            tracing::debug!(%user_id, %key, trade_id = %existing.id, "idempotent replay");
            return Ok(existing);
        }
    }

    let trade = Trade {
        id: Uuid::new_v4(),
        user_id,
        account_id: request.account_id,
        ticker: ticker.clone(),
        side: request.side,
        quantity: request.quantity,
        price: request.price,
        fees: request.fees,
        executed_at: request.executed_at,
    };
    persistence::insert_trade(&mut tx, &trade, request.idempotency_key).await?;

    // Row lock: concurrent trades on the same (user, ticker) serialize here.
    let position = persistence::lock_or_create_position(&mut tx, user_id, &ticker).await?;

    let (quantity_after, average_cost_after) = match request.side {
        TradeSide::Buy => apply_buy(
            position.quantity,
            position.average_cost,
            request.quantity,
            request.price,
            request.fees,
        ),
        // Failure drops the transaction: the trade row above never survives
        // an insufficient sell.
        TradeSide::Sell => apply_sell(position.quantity, position.average_cost, request.quantity)?,
    };

    persistence::write_position(&mut tx, user_id, &ticker, quantity_after, average_cost_after)
        .await?;
    tx.commit().await?;

    tracing::info!(
        %user_id,
        ticker = %ticker,
        side = ?request.side,
        quantity = %request.quantity,
        quantity_after = %quantity_after,
        "trade recorded"
    );
    Ok(trade)
}
