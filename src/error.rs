//! Engine error taxonomy. Storage internals are logged, never surfaced.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::quotes::QuoteError;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed input, rejected before anything is persisted.
    #[error("invalid trade: {0}")]
    Validation(String),

    /// SELL quantity exceeds the current holding. Nothing is persisted.
    #[error("insufficient position: holding {held}, requested {requested}")]
    InsufficientPosition { held: Decimal, requested: Decimal },

    /// Market-data failure. Affects P&L views only, never trade recording.
    #[error(transparent)]
    Quote(#[from] QuoteError),

    /// Lock contention on a position row. Safe to retry: atomicity
    /// guarantees no partial state exists.
    #[error("storage conflict on position, retry the request")]
    StorageConflict,

    /// The bounded execution window elapsed; the transaction rolled back.
    #[error("trade execution timed out")]
    Timeout,

    #[error("storage error")]
    Storage(#[source] sqlx::Error),
}

impl From<sqlx::Error> for EngineError {
    /// SQLSTATE 40001 (serialization failure) and 55P03 (lock not available)
    /// are retryable contention, as are a unique violation (23505) raced on
    /// the idempotency index and a pool acquire timeout. Everything else
    /// stays opaque.
    fn from(err: sqlx::Error) -> Self {
        if matches!(err, sqlx::Error::PoolTimedOut) {
            return EngineError::StorageConflict;
        }
        if let Some(db) = err.as_database_error() {
            if let Some(code) = db.code() {
                if code == "40001" || code == "55P03" || code == "23505" {
                    return EngineError::StorageConflict;
                }
            }
        }
        EngineError::Storage(err)
    }
}
