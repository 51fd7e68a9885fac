//! Storage-backed tests. Pool-settings parsing runs anywhere; the engine
//! tests need a live Postgres and are ignore-gated: set `DATABASE_URL` and
//! run `cargo test -- --ignored`.

use std::time::Duration;

use chrono::Utc;
use portfolio_engine::engine::{execute_trade, TradeRequest};
use portfolio_engine::error::EngineError;
use portfolio_engine::persistence::{create_pool_and_migrate, PoolSettings};
use portfolio_engine::portfolio::{get_portfolio, get_trade_history};
use portfolio_engine::types::trade::TradeSide;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

#[test]
fn pool_settings_default_without_env() {
    assert_eq!(PoolSettings::from_values(None, None), PoolSettings::default());
}

#[test]
fn pool_settings_parse_overrides() {
    let settings = PoolSettings::from_values(Some("12"), Some("4"));
    assert_eq!(settings.max_connections, 12);
    assert_eq!(settings.acquire_timeout, Duration::from_secs(4));
}

#[test]
fn pool_settings_reject_garbage_and_zero() {
    assert_eq!(
        PoolSettings::from_values(Some("many"), Some("0")),
        PoolSettings::default()
    );
}

async fn test_pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for database tests");
    create_pool_and_migrate(&url, PoolSettings::default())
        .await
        .expect("failed to connect to test database")
}

fn request(ticker: &str, side: TradeSide, quantity: &str, price: &str) -> TradeRequest {
    TradeRequest {
        ticker: ticker.to_string(),
        side,
        quantity: dec(quantity),
        price: dec(price),
        fees: dec("0"),
        executed_at: Utc::now(),
        account_id: Uuid::new_v4(),
        idempotency_key: None,
    }
}

#[tokio::test]
#[ignore = "needs a live Postgres via DATABASE_URL"]
async fn insufficient_sell_leaves_ledger_and_position_untouched() {
    let pool = test_pool().await;
    let user = Uuid::new_v4();
    execute_trade(&pool, user, request("PETR4", TradeSide::Buy, "10", "10.00"))
        .await
        .unwrap();

    let err = execute_trade(&pool, user, request("PETR4", TradeSide::Sell, "999", "12.00"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientPosition { .. }));

    // The rejected sell rolled back whole: one buy in the ledger, the
    // position exactly as the buy left it.
    let history = get_trade_history(&pool, user, "PETR4").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].side, TradeSide::Buy);

    let portfolio = get_portfolio(&pool, user).await.unwrap();
    assert_eq!(portfolio.len(), 1);
    assert_eq!(portfolio[0].quantity, dec("10"));
    assert_eq!(portfolio[0].average_cost, dec("10.00"));
}

#[tokio::test]
#[ignore = "needs a live Postgres via DATABASE_URL"]
async fn idempotency_key_replays_the_original_trade() {
    let pool = test_pool().await;
    let user = Uuid::new_v4();
    let mut req = request("VALE3", TradeSide::Buy, "5", "70.00");
    req.idempotency_key = Some(Uuid::new_v4());

    let first = execute_trade(&pool, user, req.clone()).await.unwrap();
    let second = execute_trade(&pool, user, req).await.unwrap();
    assert_eq!(first.id, second.id);

    let history = get_trade_history(&pool, user, "VALE3").await.unwrap();
    assert_eq!(history.len(), 1);

    let portfolio = get_portfolio(&pool, user).await.unwrap();
    assert_eq!(portfolio[0].quantity, dec("5"));
    assert_eq!(portfolio[0].average_cost, dec("70.00"));
}

#[tokio::test]
#[ignore = "needs a live Postgres via DATABASE_URL"]
async fn concurrent_buys_converge_on_weighted_average() {
    let pool = test_pool().await;
    let user = Uuid::new_v4();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let pool = pool.clone();
        handles.push(tokio::spawn(async move {
            execute_trade(&pool, user, request("ITUB4", TradeSide::Buy, "3", "25.00")).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let portfolio = get_portfolio(&pool, user).await.unwrap();
    assert_eq!(portfolio.len(), 1);
    assert_eq!(portfolio[0].quantity, dec("24"));
    assert_eq!(portfolio[0].average_cost, dec("25.00"));
}
