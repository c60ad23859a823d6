pub mod repo;

use axum::{extract::State, routing::get, Router};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::{
    error::{ApiError, ApiResult},
    extract::Json,
    state::AppState,
};
use repo::{AlertInfo, BotConfig};

#[derive(Debug, Deserialize)]
pub struct CreateBotRequest {
    #[serde(default, alias = "botName")]
    pub bot_name: String,
    #[serde(default, alias = "botPath")]
    pub bot_path: String,
}

#[derive(Debug, Serialize)]
pub struct AlertsUpdatedResponse {
    pub message: &'static str,
    pub updated: u64,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/bots", get(list_bots).post(create_bot))
        .route("/alerts", get(list_alerts).put(update_alerts))
}

#[instrument(skip(state))]
pub async fn list_bots(State(state): State<AppState>) -> ApiResult<Json<Vec<BotConfig>>> {
    Ok(Json(repo::list_bots(&state.db).await?))
}

/// Adds a bot and answers with the refreshed list.
#[instrument(skip(state))]
pub async fn create_bot(
    State(state): State<AppState>,
    Json(body): Json<CreateBotRequest>,
) -> ApiResult<Json<Vec<BotConfig>>> {
    let (name, path) = (body.bot_name.trim(), body.bot_path.trim());
    if name.is_empty() || path.is_empty() {
        return Err(ApiError::bad_request("bot_name and bot_path are required"));
    }

    let id = repo::insert_bot(&state.db, name, path).await?;
    info!(bot_id = id, %name, "bot registered");
    Ok(Json(repo::list_bots(&state.db).await?))
}

#[instrument(skip(state))]
pub async fn list_alerts(State(state): State<AppState>) -> ApiResult<Json<Vec<AlertInfo>>> {
    Ok(Json(repo::list_alerts(&state.db).await?))
}

#[instrument(skip(state))]
pub async fn update_alerts(
    State(state): State<AppState>,
    Json(body): Json<Vec<AlertInfo>>,
) -> ApiResult<Json<AlertsUpdatedResponse>> {
    if body.iter().any(|a| a.name.trim().is_empty()) {
        return Err(ApiError::bad_request("Alert name is required"));
    }
    let updated = repo::update_alerts(&state.db, &body).await?;
    info!(updated, "alerts updated");
    Ok(Json(AlertsUpdatedResponse {
        message: "Alert infos updated successfully",
        updated,
    }))
}
