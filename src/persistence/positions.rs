//! Position persistence. The row lock taken here is the critical section
//! that serializes concurrent trades on the same (user, ticker).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::types::position::Position;

#[derive(Debug, FromRow)]
pub struct PositionRow {
    pub user_id: Uuid,
    pub ticker: String,
    pub quantity: Decimal,
    pub average_cost: Decimal,
    pub updated_at: DateTime<Utc>,
}

pub fn position_row_to_position(row: PositionRow) -> Position {
    Position {
        user_id: row.user_id,
        ticker: row.ticker,
        quantity: row.quantity,
        average_cost: row.average_cost,
        updated_at: row.updated_at,
    }
}

const POSITION_COLUMNS: &str = "user_id, ticker, quantity, average_cost, updated_at";

/// Load the position row under `FOR UPDATE`, creating a zero row first if
/// the pair has never traded. Concurrent callers on the same pair block
/// here until the other transaction commits or rolls back.
pub async fn lock_or_create_position(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    ticker: &str,
) -> Result<PositionRow, sqlx::Error> {
    sqlx::query(
        "INSERT INTO positions (user_id, ticker, quantity, average_cost) \
         VALUES ($1, $2, 0, 0) ON CONFLICT (user_id, ticker) DO NOTHING",
    )
    .bind(user_id)
    .bind(ticker)
    .execute(&mut **tx)
    .await?;

    sqlx::query_as::<_, PositionRow>(&format!(
        "SELECT {POSITION_COLUMNS} FROM positions \
         WHERE user_id = $1 AND ticker = $2 FOR UPDATE",
    ))
    .bind(user_id)
    .bind(ticker)
    .fetch_one(&mut **tx)
    .await
}

/// Write the updated aggregate. Caller must hold the row lock from
/// `lock_or_create_position` in the same transaction.
pub async fn write_position(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    ticker: &str,
    quantity: Decimal,
    average_cost: Decimal,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE positions SET quantity = $3, average_cost = $4, updated_at = now() \
         WHERE user_id = $1 AND ticker = $2",
    )
    .bind(user_id)
    .bind(ticker)
    .bind(quantity)
    .bind(average_cost)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Open positions for a user, ticker ascending (for GET /portfolio).
pub async fn list_open_positions(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<Position>, sqlx::Error> {
    let rows = sqlx::query_as::<_, PositionRow>(&format!(
        "SELECT {POSITION_COLUMNS} FROM positions \
         WHERE user_id = $1 AND quantity > 0 ORDER BY ticker ASC",
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(position_row_to_position).collect())
}
