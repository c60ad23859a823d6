use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::get,
    Router,
};
use tracing::{error, info, instrument};

use super::dto::{
    CreatedNoticeResponse, DeletedNoticeResponse, Notice, NoticeFilter, NoticeListQuery,
    UpdatedNoticeResponse,
};
use super::repo::{self, NoticeWrite};
use super::services::{merge_file_urls, orphaned, retained_existing, NoticeForm};
use crate::{
    boards,
    error::{ApiError, ApiResult},
    extract::{Json, Path, Query},
    state::AppState,
    uploads::services::{discard_files, read_form, store_files},
};

const FILE_FIELDS: &[&str] = &["files", "file"];

pub fn routes(body_limit: usize) -> Router<AppState> {
    Router::new()
        .route("/notices", get(list_notices).post(create_notice))
        .route(
            "/notices/:id",
            get(get_notice).put(update_notice).delete(delete_notice),
        )
        .layer(DefaultBodyLimit::max(body_limit))
}

fn write_of<'a>(form: &'a NoticeForm, file_urls: &'a [String]) -> NoticeWrite<'a> {
    NoticeWrite {
        title: &form.title,
        content: &form.content,
        exposure_type: form.exposure_type,
        board_ids: form.board_ids.as_deref(),
        file_urls: Some(file_urls),
        expire_date: form.expire_date,
    }
}

#[instrument(skip(state))]
pub async fn list_notices(
    State(state): State<AppState>,
    Query(q): Query<NoticeListQuery>,
) -> ApiResult<Json<Vec<Notice>>> {
    let mut filter = NoticeFilter::try_from(q)?;
    if let Some(name) = filter.board_name.take() {
        if filter.board_id.is_none() {
            filter.board_id = boards::repo::find_id_by_name(&state.db, &name).await?;
        }
    }
    Ok(Json(repo::list(&state.db, &filter).await?))
}

#[instrument(skip(state))]
pub async fn get_notice(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Notice>> {
    repo::get(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Notice not found"))
}

#[instrument(skip(state, mp))]
pub async fn create_notice(
    State(state): State<AppState>,
    mut mp: Multipart,
) -> ApiResult<(StatusCode, Json<CreatedNoticeResponse>)> {
    let parts = read_form(&mut mp, FILE_FIELDS, &state.config.upload).await?;
    let form = NoticeForm::from_parts(&parts)?;

    let file_urls = store_files(state.storage.as_ref(), parts.files).await?;
    let id = match repo::insert(&state.db, &write_of(&form, &file_urls)).await {
        Ok(id) => id,
        Err(e) => {
            error!(error = %e, "notice insert failed, removing stored files");
            discard_files(state.storage.as_ref(), &file_urls).await;
            return Err(e.into());
        }
    };

    info!(notice_id = id, files = file_urls.len(), "notice created");
    Ok((
        StatusCode::CREATED,
        Json(CreatedNoticeResponse {
            message: "Notice created successfully",
            id,
            file_urls,
        }),
    ))
}

#[instrument(skip(state, mp))]
pub async fn update_notice(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    mut mp: Multipart,
) -> ApiResult<Json<UpdatedNoticeResponse>> {
    let parts = read_form(&mut mp, FILE_FIELDS, &state.config.upload).await?;
    let form = NoticeForm::from_parts(&parts)?;

    let current = repo::get(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Notice not found"))?
        .file_urls
        .unwrap_or_default();
    let kept = retained_existing(form.existing_files.clone(), &current);

    let uploaded = store_files(state.storage.as_ref(), parts.files).await?;
    let file_urls = merge_file_urls(kept, uploaded.clone());

    let updated = match repo::update(&state.db, id, &write_of(&form, &file_urls)).await {
        Ok(updated) => updated,
        Err(e) => {
            error!(notice_id = id, error = %e, "notice update failed, removing new files");
            discard_files(state.storage.as_ref(), &uploaded).await;
            return Err(e.into());
        }
    };
    if !updated {
        discard_files(state.storage.as_ref(), &uploaded).await;
        return Err(ApiError::not_found("Notice not found"));
    }

    let removed = orphaned(&current, &file_urls);
    discard_files(state.storage.as_ref(), &removed).await;
    info!(notice_id = id, files = file_urls.len(), removed = removed.len(), "notice updated");

    Ok(Json(UpdatedNoticeResponse {
        message: "Notice updated successfully",
        file_urls,
    }))
}

#[instrument(skip(state))]
pub async fn delete_notice(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<DeletedNoticeResponse>> {
    let files = repo::delete(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Notice not found"))?;
    discard_files(state.storage.as_ref(), &files).await;
    info!(notice_id = id, files = files.len(), "notice deleted");
    Ok(Json(DeletedNoticeResponse {
        message: "Notice deleted successfully",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::JwtKeys;
    use crate::storage::memory::MemoryFileStore;
    use crate::uploads::test_support::multipart_body;
    use axum::{body::Body, extract::FromRef, http::Request};
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn post_notice(state: AppState, body: Vec<u8>) -> StatusCode {
        let token = JwtKeys::from_ref(&state).sign_access(1).unwrap();
        crate::app::build_app(state)
            .oneshot(
                Request::post("/api/notices")
                    .header("authorization", format!("Bearer {}", token))
                    .header("content-type", "multipart/form-data; boundary=NtC")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn blank_title_is_rejected_before_any_file_is_stored() {
        let store = Arc::new(MemoryFileStore::default());
        let state = AppState::fake_with(store.clone(), None);
        let body = multipart_body(
            "NtC",
            &[("title", " "), ("content", "body")],
            &[("files", "a.png", &b"png"[..])],
        );
        assert_eq!(post_notice(state, body).await, StatusCode::BAD_REQUEST);
        assert!(store.stored.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn selected_exposure_without_boards_is_rejected() {
        let body = multipart_body(
            "NtC",
            &[("title", "Event"), ("exposure_type", "SELECTED"), ("board_ids", "[]")],
            &[],
        );
        assert_eq!(post_notice(AppState::fake(), body).await, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn list_rejects_malformed_dates() {
        let state = AppState::fake();
        let token = JwtKeys::from_ref(&state).sign_access(1).unwrap();
        let res = crate::app::build_app(state)
            .oneshot(
                Request::get("/api/notices?startDate=yesterday")
                    .header("authorization", format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
