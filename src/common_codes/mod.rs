pub mod repo;

use axum::{extract::State, routing::get, Router};
use serde::Deserialize;
use tracing::instrument;

use crate::{
    db::non_blank,
    error::{ApiError, ApiResult},
    extract::{Json, Query},
    state::AppState,
};
use repo::CommonCode;

#[derive(Debug, Deserialize)]
pub struct CodeQuery {
    pub group_code: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/common-codes", get(list_codes))
}

#[instrument(skip(state))]
pub async fn list_codes(
    State(state): State<AppState>,
    Query(q): Query<CodeQuery>,
) -> ApiResult<Json<Vec<CommonCode>>> {
    let group = non_blank(q.group_code.as_deref())
        .ok_or_else(|| ApiError::bad_request("Group code is required"))?;
    Ok(Json(repo::list_active(&state.db, group).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::JwtKeys;
    use axum::{body::Body, extract::FromRef, http::Request, http::StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn group_code_is_required() {
        let state = AppState::fake();
        let token = JwtKeys::from_ref(&state).sign_access(1).unwrap();
        let res = crate::app::build_app(state)
            .oneshot(
                Request::get("/api/common-codes?group_code=")
                    .header("authorization", format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
