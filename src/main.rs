use std::sync::Arc;

use portfolio_engine::api::routes::{app_router, AppState};
use portfolio_engine::persistence::{create_pool_and_migrate, PoolSettings};
use portfolio_engine::quotes::{http_client, AlphaVantageProvider, BrapiProvider, QuoteProvider};
use tracing_subscriber::EnvFilter;

fn build_provider() -> Arc<dyn QuoteProvider> {
    let client = http_client().expect("failed to build quote HTTP client");
    match std::env::var("MARKET_DATA_PROVIDER").as_deref() {
        Ok("alphavantage") => {
            let key = std::env::var("ALPHAVANTAGE_API_KEY")
                .expect("ALPHAVANTAGE_API_KEY must be set for the alphavantage provider");
            Arc::new(AlphaVantageProvider::new(client, key))
        }
        _ => Arc::new(BrapiProvider::new(
            client,
            std::env::var("BRAPI_API_KEY").ok(),
        )),
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = create_pool_and_migrate(&database_url, PoolSettings::from_env())
        .await
        .expect("failed to connect to database");

    let quotes = build_provider();
    tracing::info!(provider = quotes.name(), "market data provider ready");

    let app = app_router(AppState { pool, quotes });
    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("failed to bind");
    tracing::info!(%bind_addr, "listening");
    axum::serve(listener, app).await.expect("server error");
}
