//! HTTP surface over the engine. Authentication lives upstream: the
//! trusted gateway injects the caller's id as `x-user-id`.

use std::sync::Arc;

use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::engine::{self, normalize_ticker, TradeRequest};
use crate::error::EngineError;
use crate::portfolio;
use crate::quotes::{QuoteError, QuoteProvider};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub quotes: Arc<dyn QuoteProvider>,
}

/// Caller identity, pre-authenticated by the external auth layer.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: Uuid,
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v).ok())
            .ok_or_else(|| {
                error_response(StatusCode::UNAUTHORIZED, "missing or invalid x-user-id")
            })?;
        Ok(AuthUser { user_id })
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = match &self {
            EngineError::Validation(_) => StatusCode::BAD_REQUEST,
            EngineError::InsufficientPosition { .. } => StatusCode::CONFLICT,
            EngineError::Quote(QuoteError::Malformed(_)) => StatusCode::BAD_GATEWAY,
            EngineError::Quote(_) => StatusCode::SERVICE_UNAVAILABLE,
            EngineError::StorageConflict => StatusCode::CONFLICT,
            EngineError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            EngineError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if let EngineError::Storage(err) = &self {
            // Logged in full, surfaced generically.
            tracing::error!(error = %err, "storage failure");
            return error_response(status, "internal storage error");
        }
        error_response(status, &self.to_string())
    }
}

async fn health() -> &'static str {
    "healthy"
}

async fn execute_trade(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<TradeRequest>,
) -> Result<(StatusCode, Json<crate::types::trade::Trade>), EngineError> {
    let trade = engine::execute_trade(&state.pool, user.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(trade)))
}

async fn get_portfolio(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<crate::types::position::Position>>, EngineError> {
    Ok(Json(portfolio::get_portfolio(&state.pool, user.user_id).await?))
}

async fn get_portfolio_valuation(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<portfolio::PortfolioValuation>, EngineError> {
    let valuation =
        portfolio::get_portfolio_valuation(&state.pool, state.quotes.as_ref(), user.user_id)
            .await?;
    Ok(Json(valuation))
}

async fn get_trade_history(
    State(state): State<AppState>,
    user: AuthUser,
    Path(ticker): Path<String>,
) -> Result<Json<Vec<crate::types::trade::Trade>>, EngineError> {
    Ok(Json(
        portfolio::get_trade_history(&state.pool, user.user_id, &ticker).await?,
    ))
}

async fn get_quote(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> Result<Json<crate::types::quote::Quote>, EngineError> {
    let ticker = normalize_ticker(&ticker)?;
    let quote = state.quotes.get_quote(&ticker).await.map_err(EngineError::Quote)?;
    Ok(Json(quote))
}

#[derive(Debug, serde::Deserialize)]
struct HistoryParams {
    range: Option<crate::types::quote::HistoryRange>,
}

async fn get_quote_history(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<crate::types::quote::Candle>>, EngineError> {
    let ticker = normalize_ticker(&ticker)?;
    let range = params.range.unwrap_or(crate::types::quote::HistoryRange::Month);
    let candles = state
        .quotes
        .get_history(&ticker, range)
        .await
        .map_err(EngineError::Quote)?;
    Ok(Json(candles))
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/trades", post(execute_trade))
        .route("/trades/{ticker}", get(get_trade_history))
        .route("/portfolio", get(get_portfolio))
        .route("/portfolio/valuation", get(get_portfolio_valuation))
        .route("/quotes/{ticker}", get(get_quote))
        .route("/quotes/{ticker}/history", get(get_quote_history))
        .with_state(state)
}
