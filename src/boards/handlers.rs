use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Router,
};
use sqlx::PgPool;
use tracing::{info, instrument, warn};

use super::dto::{BoardRequest, DeleteBoardResponse};
use super::repo::{self, Board, BoardOption};
use crate::{
    common_codes::repo::{self as codes, BOARD_TYPE_GROUP},
    error::{ApiError, ApiResult},
    extract::{Json, Path},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/boards", get(list_boards).post(create_board))
        .route("/boards/options", get(board_options))
        .route(
            "/boards/:id",
            get(get_board).put(update_board).delete(delete_board),
        )
}

/// Trimmed `(name, type_code)`, both required.
pub(crate) fn validate(req: &BoardRequest) -> ApiResult<(&str, &str)> {
    let name = req.name.trim();
    let type_code = req.type_code.trim();
    if name.is_empty() || type_code.is_empty() {
        return Err(ApiError::bad_request("Name and type_code are required"));
    }
    Ok((name, type_code))
}

async fn ensure_board_type(db: &PgPool, type_code: &str) -> ApiResult<()> {
    if !codes::exists(db, BOARD_TYPE_GROUP, type_code).await? {
        warn!(%type_code, "unknown board type");
        return Err(ApiError::bad_request("Invalid type_code"));
    }
    Ok(())
}

#[instrument(skip(state))]
pub async fn list_boards(State(state): State<AppState>) -> ApiResult<Json<Vec<Board>>> {
    Ok(Json(repo::list(&state.db).await?))
}

#[instrument(skip(state))]
pub async fn board_options(State(state): State<AppState>) -> ApiResult<Json<Vec<BoardOption>>> {
    Ok(Json(repo::list_options(&state.db).await?))
}

#[instrument(skip(state))]
pub async fn get_board(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Board>> {
    repo::get(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Board not found"))
}

#[instrument(skip(state))]
pub async fn create_board(
    State(state): State<AppState>,
    Json(body): Json<BoardRequest>,
) -> ApiResult<(StatusCode, Json<Board>)> {
    let (name, type_code) = validate(&body)?;
    ensure_board_type(&state.db, type_code).await?;

    let id = repo::insert(&state.db, name, type_code).await?;
    info!(board_id = id, %name, %type_code, "board created");
    let board = repo::get(&state.db, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("board {} vanished after insert", id))?;
    Ok((StatusCode::CREATED, Json(board)))
}

#[instrument(skip(state))]
pub async fn update_board(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<BoardRequest>,
) -> ApiResult<Json<Board>> {
    let (name, type_code) = validate(&body)?;
    ensure_board_type(&state.db, type_code).await?;

    if !repo::update(&state.db, id, name, type_code).await? {
        return Err(ApiError::not_found("Board not found"));
    }
    info!(board_id = id, "board updated");
    repo::get(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Board not found"))
}

#[instrument(skip(state))]
pub async fn delete_board(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<DeleteBoardResponse>> {
    let affected = repo::soft_delete(&state.db, id).await?;
    info!(board_id = id, affected, "board soft-deleted");
    Ok(Json(DeleteBoardResponse {
        message: "Board deleted successfully",
        affected,
    }))
}
