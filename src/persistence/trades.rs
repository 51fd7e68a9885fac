//! Trade ledger persistence: append-only insert inside the execution
//! transaction, ordered reads for history.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::types::trade::{Trade, TradeSide};

#[derive(Debug, FromRow)]
pub struct TradeRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub account_id: Uuid,
    pub ticker: String,
    pub side: TradeSide,
    pub quantity: Decimal,
    pub price: Decimal,
    pub fees: Decimal,
    pub executed_at: DateTime<Utc>,
}

const TRADE_COLUMNS: &str =
    "id, user_id, account_id, ticker, side, quantity, price, fees, executed_at";

fn trade_row_to_trade(row: TradeRow) -> Trade {
    Trade {
        id: row.id,
        user_id: row.user_id,
        account_id: row.account_id,
        ticker: row.ticker,
        side: row.side,
        quantity: row.quantity,
        price: row.price,
        fees: row.fees,
        executed_at: row.executed_at,
    }
}

/// Insert one ledger row. Only ever called by the execution engine, inside
/// the same transaction that updates the position.
pub async fn insert_trade(
    tx: &mut Transaction<'_, Postgres>,
    trade: &Trade,
    idempotency_key: Option<Uuid>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO trades (id, user_id, account_id, ticker, side, quantity, price, fees, executed_at, idempotency_key) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(trade.id)
    .bind(trade.user_id)
    .bind(trade.account_id)
    .bind(&trade.ticker)
    .bind(trade.side)
    .bind(trade.quantity)
    .bind(trade.price)
    .bind(trade.fees)
    .bind(trade.executed_at)
    .bind(idempotency_key)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Look up a previously recorded trade by its caller-supplied idempotency
/// key, so a repeated submission returns the original instead of a duplicate.
pub async fn find_trade_by_idempotency_key(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    key: Uuid,
) -> Result<Option<Trade>, sqlx::Error> {
    let row = sqlx::query_as::<_, TradeRow>(&format!(
        "SELECT {TRADE_COLUMNS} FROM trades WHERE user_id = $1 AND idempotency_key = $2",
    ))
    .bind(user_id)
    .bind(key)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(row.map(trade_row_to_trade))
}

/// List a user's trades for one ticker, most recent execution first
/// (for GET /trades/{ticker}).
pub async fn list_trades_for_user(
    pool: &PgPool,
    user_id: Uuid,
    ticker: &str,
) -> Result<Vec<Trade>, sqlx::Error> {
    let rows = sqlx::query_as::<_, TradeRow>(&format!(
        "SELECT {TRADE_COLUMNS} FROM trades WHERE user_id = $1 AND ticker = $2 \
         ORDER BY executed_at DESC",
    ))
    .bind(user_id)
    .bind(ticker)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(trade_row_to_trade).collect())
}
