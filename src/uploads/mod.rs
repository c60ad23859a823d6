pub mod services;

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
    Router,
};
use serde::Serialize;
use tracing::{info, instrument};

use crate::{
    error::{ApiError, ApiResult},
    extract::Json,
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: &'static str,
    pub urls: Vec<String>,
}

pub fn router(body_limit: usize) -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload))
        .layer(DefaultBodyLimit::max(body_limit))
}

/// POST /upload (multipart), parts named `file` or `files`
#[instrument(skip(state, mp))]
pub async fn upload(State(state): State<AppState>, mut mp: Multipart) -> ApiResult<Json<UploadResponse>> {
    let form = services::read_form(&mut mp, &["file", "files"], &state.config.upload).await?;
    if form.files.is_empty() {
        return Err(ApiError::bad_request("No file uploaded"));
    }

    let urls = services::store_files(state.storage.as_ref(), form.files).await?;
    info!(count = urls.len(), "files uploaded");
    Ok(Json(UploadResponse {
        message: "File uploaded successfully",
        urls,
    }))
}

#[cfg(test)]
pub(crate) mod test_support {
    /// Builds a multipart body; `files` are `(field, file name, content)`.
    pub fn multipart_body(
        boundary: &str,
        fields: &[(&str, &str)],
        files: &[(&str, &str, &[u8])],
    ) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        for (name, file_name, content) in files {
            body.extend_from_slice(
                format!(
                    "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(content);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
        body
    }
}
