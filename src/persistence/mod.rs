//! Database layer: pool, migrations, and row access for trades and positions.

mod pool;
mod positions;
mod trades;

pub use pool::{create_pool_and_migrate, run_migrations, PoolSettings};
pub use positions::{
    list_open_positions, lock_or_create_position, position_row_to_position, write_position,
    PositionRow,
};
pub use sqlx::PgPool;
pub use trades::{find_trade_by_idempotency_key, insert_trade, list_trades_for_user, TradeRow};
