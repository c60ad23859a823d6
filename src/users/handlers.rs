use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Router,
};
use tracing::instrument;

use super::dto::{
    ChangePasswordRequest, CheckEmailRequest, CheckEmailResponse, CreateUserRequest,
    MessageResponse, UpdateUserRequest, UserFilter, UserStats,
};
use super::repo::{self, User};
use super::services;
use crate::{
    auth::services::normalize_email,
    error::{ApiError, ApiResult},
    extract::{Json, Path},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/stats", get(user_stats))
        .route("/users/search", post(search_users))
        .route("/users/check-email", post(check_email))
        .route("/users/:id", get(get_user).put(update_user))
        .route("/users/:id/password", post(change_password))
}

#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(User::list_all(&state.db).await?))
}

#[instrument(skip(state))]
pub async fn user_stats(State(state): State<AppState>) -> ApiResult<Json<UserStats>> {
    Ok(Json(repo::stats(&state.db).await?))
}

#[instrument(skip(state))]
pub async fn search_users(
    State(state): State<AppState>,
    Json(filter): Json<UserFilter>,
) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(repo::search(&state.db, &filter).await?))
}

#[instrument(skip(state, body))]
pub async fn check_email(
    State(state): State<AppState>,
    Json(body): Json<CheckEmailRequest>,
) -> ApiResult<Json<CheckEmailResponse>> {
    let email = normalize_email(&body.email);
    if email.is_empty() {
        return Err(ApiError::bad_request("Email is required"));
    }
    let exists = User::email_exists(&state.db, &email).await?;
    Ok(Json(CheckEmailResponse { exists }))
}

#[instrument(skip(state))]
pub async fn get_user(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<User>> {
    User::find_by_id(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("User not found"))
}

#[instrument(skip(state, body))]
pub async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let user = services::create_user(&state.db, &body).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(state, body))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateUserRequest>,
) -> ApiResult<Json<User>> {
    Ok(Json(services::update_user(&state.db, id, &body).await?))
}

#[instrument(skip(state, body))]
pub async fn change_password(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<ChangePasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    services::change_password(&state.db, id, &body.current_password, &body.new_password).await?;
    Ok(Json(MessageResponse {
        message: "Password updated successfully".into(),
    }))
}
