use anyhow::Context;
use axum::{extract::State, routing::get, Router};
use serde::Serialize;
use sqlx::PgPool;
use tracing::instrument;

use crate::{
    boards, bots, error::ApiResult, extract::Json, notices, state::AppState, users,
    users::dto::UserStats,
};

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub connections: i64,
}

/// Numbers behind the dashboard charts.
#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub users: UserStats,
    pub boards: i64,
    pub notices: i64,
    pub bots: i64,
    pub alerts: i64,
    pub connections: i64,
}

/// Liveness check, reachable without a token.
pub fn public_router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/status", get(status))
        .route("/dashboard", get(dashboard))
}

pub async fn health() -> &'static str {
    "ok"
}

async fn live_connections(db: &PgPool) -> anyhow::Result<i64> {
    let n = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM pg_stat_activity WHERE datname = current_database()",
    )
    .fetch_one(db)
    .await
    .context("count live connections")?;
    Ok(n)
}

#[instrument(skip(state))]
pub async fn status(State(state): State<AppState>) -> ApiResult<Json<StatusResponse>> {
    let connections = live_connections(&state.db).await?;
    Ok(Json(StatusResponse { connections }))
}

#[instrument(skip(state))]
pub async fn dashboard(State(state): State<AppState>) -> ApiResult<Json<DashboardResponse>> {
    let db = &state.db;
    let (users, boards, notices, bots, alerts, connections) = tokio::try_join!(
        users::repo::stats(db),
        boards::repo::count(db),
        notices::repo::count(db),
        bots::repo::count_bots(db),
        bots::repo::count_alerts(db),
        live_connections(db),
    )?;
    Ok(Json(DashboardResponse {
        users,
        boards,
        notices,
        bots,
        alerts,
        connections,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_needs_no_token() {
        let res = crate::app::build_app(AppState::fake())
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn dashboard_requires_a_token() {
        let res = crate::app::build_app(AppState::fake())
            .oneshot(Request::get("/api/dashboard").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
