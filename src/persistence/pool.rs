//! Connection pool sizing and embedded migrations for the trade ledger.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Pool tuning, read from the environment alongside the other runtime
/// settings (`DB_MAX_CONNECTIONS`, `DB_ACQUIRE_TIMEOUT_SECS`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_connections: u32,
    /// Kept below the engine's execution timeout: a saturated pool should
    /// surface as retryable contention, not a blown execution window.
    pub acquire_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 5,
            acquire_timeout: Duration::from_secs(2),
        }
    }
}

impl PoolSettings {
    pub fn from_env() -> Self {
        Self::from_values(
            std::env::var("DB_MAX_CONNECTIONS").ok().as_deref(),
            std::env::var("DB_ACQUIRE_TIMEOUT_SECS").ok().as_deref(),
        )
    }

    /// Unparseable or zero values fall back to the defaults.
    pub fn from_values(max_connections: Option<&str>, acquire_timeout_secs: Option<&str>) -> Self {
        let defaults = Self::default();
        Self {
            max_connections: max_connections
                .and_then(|v| v.parse::<u32>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(defaults.max_connections),
            acquire_timeout: acquire_timeout_secs
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|v| *v > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.acquire_timeout),
        }
    }
}

/// Connect with the given settings and bring the trades/positions schema up
/// to date before serving anything.
pub async fn create_pool_and_migrate(
    database_url: &str,
    settings: PoolSettings,
) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(settings.acquire_timeout)
        .connect(database_url)
        .await?;
    run_migrations(&pool).await?;
    Ok(pool)
}

/// Run embedded migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
