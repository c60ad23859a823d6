use std::collections::HashSet;

use time::Date;

use super::dto::{parse_date, ExposureType};
use crate::db::non_blank;
use crate::error::{ApiError, ApiResult};
use crate::uploads::services::FormParts;

/// Text part of the notice create/edit form.
#[derive(Debug, PartialEq, Eq)]
pub struct NoticeForm {
    pub title: String,
    pub content: String,
    pub exposure_type: ExposureType,
    pub board_ids: Option<Vec<i64>>,
    pub expire_date: Option<Date>,
    /// URLs of already-attached files the editor kept.
    pub existing_files: Vec<String>,
}

fn json_field<T: serde::de::DeserializeOwned>(parts: &FormParts, name: &str) -> ApiResult<Option<T>> {
    non_blank(parts.text(name))
        .map(|raw| {
            serde_json::from_str::<T>(raw)
                .map_err(|_| ApiError::bad_request(format!("{} must be a JSON array", name)))
        })
        .transpose()
}

impl NoticeForm {
    pub fn from_parts(parts: &FormParts) -> ApiResult<Self> {
        let title = non_blank(parts.text("title"))
            .ok_or_else(|| ApiError::bad_request("Title is required"))?
            .to_string();
        let content = parts.text("content").unwrap_or_default().to_string();
        let exposure_type = non_blank(parts.text("exposure_type"))
            .map(str::parse::<ExposureType>)
            .transpose()?
            .unwrap_or(ExposureType::None);
        let board_ids = json_field::<Vec<i64>>(parts, "board_ids")?;
        let expire_date = non_blank(parts.text("expire_date"))
            .map(|v| parse_date("expire_date", v))
            .transpose()?;
        let existing_files = json_field::<Vec<String>>(parts, "existing_files")?.unwrap_or_default();

        if exposure_type == ExposureType::Selected && board_ids.as_ref().map_or(true, Vec::is_empty) {
            return Err(ApiError::bad_request("SELECTED exposure needs at least one board"));
        }

        Ok(Self {
            title,
            content,
            exposure_type,
            board_ids,
            expire_date,
            existing_files,
        })
    }
}

/// Retained URLs in client order followed by new uploads; later duplicates are dropped.
pub fn merge_file_urls(retained: Vec<String>, uploaded: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    retained
        .into_iter()
        .chain(uploaded)
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

/// Keeps only the retained URLs that the notice actually has attached.
pub fn retained_existing(requested: Vec<String>, current: &[String]) -> Vec<String> {
    requested
        .into_iter()
        .filter(|url| current.contains(url))
        .collect()
}

/// Stored URLs that are no longer referenced after an edit.
pub fn orphaned(current: &[String], kept: &[String]) -> Vec<String> {
    current
        .iter()
        .filter(|url| !kept.contains(url))
        .cloned()
        .collect()
}
