use std::collections::HashMap;
use std::path::Path;

use axum::extract::Multipart;
use bytes::{Bytes, BytesMut};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::UploadConfig;
use crate::error::{ApiError, ApiResult};
use crate::storage::FileStore;

pub struct UploadItem {
    pub file_name: Option<String>,
    pub content_type: String,
    pub body: Bytes,
}

/// Text fields and file parts of a multipart form.
#[derive(Default)]
pub struct FormParts {
    pub fields: HashMap<String, String>,
    pub files: Vec<UploadItem>,
}

impl FormParts {
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

fn is_file_field(name: &str, file_fields: &[&str]) -> bool {
    let bare = name.strip_suffix("[]").unwrap_or(name);
    file_fields.contains(&bare)
}

fn bad_multipart(e: impl std::fmt::Display) -> ApiError {
    ApiError::bad_request(format!("Invalid multipart body: {}", e))
}

/// Reads the whole form, enforcing the per-file size and file count limits while streaming.
pub async fn read_form(
    mp: &mut Multipart,
    file_fields: &[&str],
    limits: &UploadConfig,
) -> ApiResult<FormParts> {
    let mut parts = FormParts::default();

    while let Some(mut field) = mp.next_field().await.map_err(bad_multipart)? {
        let name = field.name().unwrap_or_default().to_string();

        if !is_file_field(&name, file_fields) {
            let value = field.text().await.map_err(bad_multipart)?;
            parts.fields.insert(name, value);
            continue;
        }

        let file_name = field
            .file_name()
            .map(str::to_string)
            .filter(|n| !n.is_empty());
        let content_type = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| "application/octet-stream".into());

        let mut buf = BytesMut::new();
        while let Some(chunk) = field.chunk().await.map_err(bad_multipart)? {
            if buf.len() + chunk.len() > limits.max_file_bytes {
                warn!(field = %name, file = ?file_name, "upload over size limit");
                return Err(ApiError::bad_request(format!(
                    "File exceeds the {} byte limit",
                    limits.max_file_bytes
                )));
            }
            buf.extend_from_slice(&chunk);
        }

        // browsers send an empty part when no file was picked
        if buf.is_empty() && file_name.is_none() {
            continue;
        }

        if parts.files.len() >= limits.max_files {
            return Err(ApiError::bad_request(format!(
                "Too many files (max {})",
                limits.max_files
            )));
        }
        parts.files.push(UploadItem {
            file_name,
            content_type,
            body: buf.freeze(),
        });
    }

    Ok(parts)
}

/// Writes each file under a generated name and returns the public URLs in upload order.
/// When one write fails, the files already written for this call are removed again.
pub async fn store_files(store: &dyn FileStore, files: Vec<UploadItem>) -> anyhow::Result<Vec<String>> {
    let mut urls = Vec::with_capacity(files.len());
    for file in files {
        let name = generated_name(file.file_name.as_deref(), &file.content_type);
        match store.put(&name, file.body, &file.content_type).await {
            Ok(url) => {
                debug!(%url, original = ?file.file_name, "upload stored");
                urls.push(url);
            }
            Err(e) => {
                warn!(file = %name, stored = urls.len(), error = %e, "upload failed, removing this batch");
                discard_files(store, &urls).await;
                return Err(e.context(format!("store upload {}", name)));
            }
        }
    }
    Ok(urls)
}

/// Removes files whose rows no longer reference them. Failures are only logged.
pub async fn discard_files(store: &dyn FileStore, urls: &[String]) {
    for url in urls {
        if let Err(e) = store.delete(url).await {
            warn!(%url, error = %e, "could not remove stored file");
        }
    }
}

pub(crate) fn generated_name(original: Option<&str>, content_type: &str) -> String {
    let ext = original
        .and_then(ext_from_file_name)
        .or_else(|| ext_from_mime(content_type).map(str::to_string))
        .unwrap_or_else(|| "bin".to_string());
    format!("{}.{}", Uuid::new_v4(), ext)
}

fn ext_from_file_name(name: &str) -> Option<String> {
    let ext = Path::new(name).extension()?.to_str()?;
    let ok = !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric());
    ok.then(|| ext.to_ascii_lowercase())
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "application/pdf" => Some("pdf"),
        "text/plain" => Some("txt"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryFileStore;

    #[test]
    fn extension_prefers_original_name() {
        assert!(generated_name(Some("Report.PDF"), "application/octet-stream").ends_with(".pdf"));
        assert!(generated_name(Some("photo"), "image/png").ends_with(".png"));
        assert!(generated_name(Some("x.tar.g$z"), "whatever/else").ends_with(".bin"));
        assert!(generated_name(None, "image/jpeg").ends_with(".jpg"));
    }

    #[test]
    fn generated_names_are_unique() {
        assert_ne!(generated_name(None, "image/png"), generated_name(None, "image/png"));
    }

    #[test]
    fn array_style_field_names_count_as_files() {
        assert!(is_file_field("files[]", &["files"]));
        assert!(is_file_field("file", &["file", "files"]));
        assert!(!is_file_field("title", &["files"]));
    }

    #[tokio::test]
    async fn store_files_keeps_upload_order() {
        let store = MemoryFileStore::default();
        let files = vec![
            UploadItem {
                file_name: Some("a.png".into()),
                content_type: "image/png".into(),
                body: Bytes::from_static(b"a"),
            },
            UploadItem {
                file_name: Some("b.txt".into()),
                content_type: "text/plain".into(),
                body: Bytes::from_static(b"b"),
            },
        ];
        let urls = store_files(&store, files).await.unwrap();
        assert_eq!(urls.len(), 2);
        assert!(urls[0].starts_with("/uploads/") && urls[0].ends_with(".png"));
        assert!(urls[1].ends_with(".txt"));
        assert_eq!(*store.stored.lock().unwrap(), urls);
    }

    #[tokio::test]
    async fn failed_write_removes_the_earlier_files() {
        let store = MemoryFileStore {
            fail_after: Some(1),
            ..Default::default()
        };
        let files = vec![
            UploadItem {
                file_name: Some("a.png".into()),
                content_type: "image/png".into(),
                body: Bytes::from_static(b"a"),
            },
            UploadItem {
                file_name: Some("b.png".into()),
                content_type: "image/png".into(),
                body: Bytes::from_static(b"b"),
            },
        ];
        let err = store_files(&store, files).await.unwrap_err();
        assert!(err.to_string().starts_with("store upload "));
        let stored = store.stored.lock().unwrap().clone();
        assert_eq!(stored.len(), 1);
        assert_eq!(*store.deleted.lock().unwrap(), stored);
    }
}
