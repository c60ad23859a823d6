pub mod repo;

use axum::{extract::State, routing::get, Router};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::{
    db::non_blank,
    error::{ApiError, ApiResult},
    extract::{Json, Query},
    state::AppState,
};
use repo::{ExchangeSummary, Symbol, SymbolName};

#[derive(Debug, Deserialize)]
pub struct SymbolQuery {
    pub exchange: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSymbolsRequest {
    #[serde(alias = "exchangeCode")]
    pub exchange_code: String,
    pub symbols: Vec<SymbolName>,
}

#[derive(Debug, Serialize)]
pub struct UpdateSymbolsResponse {
    pub message: &'static str,
    pub updated: u64,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/exchanges", get(list_exchanges))
        .route("/symbols", get(list_symbols).put(update_symbols))
}

#[instrument(skip(state))]
pub async fn list_exchanges(State(state): State<AppState>) -> ApiResult<Json<Vec<ExchangeSummary>>> {
    Ok(Json(repo::list_exchanges(&state.db).await?))
}

/// Symbols of one exchange, or every symbol when `exchange` is absent.
#[instrument(skip(state))]
pub async fn list_symbols(
    State(state): State<AppState>,
    Query(q): Query<SymbolQuery>,
) -> ApiResult<Json<Vec<Symbol>>> {
    let rows = match non_blank(q.exchange.as_deref()) {
        Some(code) => repo::list_by_exchange(&state.db, code).await?,
        None => repo::list_all(&state.db).await?,
    };
    Ok(Json(rows))
}

#[instrument(skip(state))]
pub async fn update_symbols(
    State(state): State<AppState>,
    Json(body): Json<UpdateSymbolsRequest>,
) -> ApiResult<Json<UpdateSymbolsResponse>> {
    let exchange = body.exchange_code.trim();
    if exchange.is_empty() {
        return Err(ApiError::bad_request("exchange_code is required"));
    }
    if body.symbols.iter().any(|s| s.symbol_code.trim().is_empty()) {
        return Err(ApiError::bad_request("symbol_code is required"));
    }

    let updated = repo::update_names(&state.db, exchange, &body.symbols).await?;
    info!(%exchange, updated, "symbol names updated");
    Ok(Json(UpdateSymbolsResponse {
        message: "Symbols updated successfully",
        updated,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::JwtKeys;
    use axum::{body::Body, extract::FromRef, http::Request, http::StatusCode};
    use tower::ServiceExt;

    #[test]
    fn update_body_accepts_null_names() {
        let body: UpdateSymbolsRequest = serde_json::from_str(
            r#"{"exchangeCode":"BINANCE","symbols":[{"symbol_code":"BTCUSDT","symbol_name":"Bitcoin"},{"symbol_code":"XRPUSDT","symbol_name":null}]}"#,
        )
        .unwrap();
        assert_eq!(body.exchange_code, "BINANCE");
        assert_eq!(body.symbols[0].symbol_name.as_deref(), Some("Bitcoin"));
        assert_eq!(body.symbols[1].symbol_name, None);
    }

    #[tokio::test]
    async fn blank_exchange_is_rejected() {
        let state = AppState::fake();
        let token = JwtKeys::from_ref(&state).sign_access(1).unwrap();
        let res = crate::app::build_app(state)
            .oneshot(
                Request::put("/api/symbols")
                    .header("authorization", format!("Bearer {}", token))
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"exchange_code":" ","symbols":[]}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
