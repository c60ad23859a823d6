use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use time::{macros::format_description, Date, OffsetDateTime};

use crate::db::non_blank;
use crate::error::{ApiError, ApiResult};

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// Which boards display a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExposureType {
    All,
    Selected,
    None,
}

impl ExposureType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::Selected => "SELECTED",
            Self::None => "NONE",
        }
    }
}

impl fmt::Display for ExposureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExposureType {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ALL" => Ok(Self::All),
            "SELECTED" => Ok(Self::Selected),
            "NONE" => Ok(Self::None),
            other => Err(ApiError::bad_request(format!("Invalid exposure_type: {}", other))),
        }
    }
}

pub(crate) fn parse_date(field: &str, value: &str) -> ApiResult<Date> {
    Date::parse(value.trim(), format_description!("[year]-[month]-[day]"))
        .map_err(|_| ApiError::bad_request(format!("{} must be YYYY-MM-DD", field)))
}

/// Notice as returned to the client. `board_ids`/`file_urls` keep the `null` vs `[]` distinction.
#[derive(Debug, Clone, Serialize)]
pub struct Notice {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub exposure_type: String,
    pub board_ids: Option<Vec<i64>>,
    pub file_urls: Option<Vec<String>>,
    #[serde(with = "iso_date::option")]
    pub expire_date: Option<Date>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Query string of the notice list. Every value arrives as text; blanks mean "no filter".
#[derive(Debug, Default, Deserialize)]
pub struct NoticeListQuery {
    #[serde(alias = "exposureType")]
    pub exposure_type: Option<String>,
    #[serde(alias = "boardId")]
    pub board_id: Option<String>,
    pub title: Option<String>,
    #[serde(alias = "startDate")]
    pub start_date: Option<String>,
    #[serde(alias = "endDate")]
    pub end_date: Option<String>,
    #[serde(alias = "excludeExpired")]
    pub exclude_expired: Option<String>,
}

/// `board_name` carries an `exposureType` value that is not an exposure keyword.
/// The handler resolves it to a board id before querying.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct NoticeFilter {
    pub exposure_type: Option<ExposureType>,
    pub board_id: Option<i64>,
    pub board_name: Option<String>,
    pub title: Option<String>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub exclude_expired: bool,
}

impl TryFrom<NoticeListQuery> for NoticeFilter {
    type Error = ApiError;

    fn try_from(q: NoticeListQuery) -> ApiResult<Self> {
        let (exposure_type, board_name) = match non_blank(q.exposure_type.as_deref()) {
            Some(v) => match v.parse::<ExposureType>() {
                Ok(t) => (Some(t), None),
                Err(_) => (None, Some(v.to_string())),
            },
            None => (None, None),
        };
        let board_id = non_blank(q.board_id.as_deref())
            .map(|v| {
                v.parse::<i64>()
                    .map_err(|_| ApiError::bad_request("boardId must be a number"))
            })
            .transpose()?;
        let start_date = non_blank(q.start_date.as_deref())
            .map(|v| parse_date("startDate", v))
            .transpose()?;
        let end_date = non_blank(q.end_date.as_deref())
            .map(|v| parse_date("endDate", v))
            .transpose()?;
        let exclude_expired = matches!(
            non_blank(q.exclude_expired.as_deref()),
            Some("true") | Some("1")
        );
        Ok(Self {
            exposure_type,
            board_id,
            board_name,
            title: non_blank(q.title.as_deref()).map(str::to_string),
            start_date,
            end_date,
            exclude_expired,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct CreatedNoticeResponse {
    pub message: &'static str,
    pub id: i64,
    pub file_urls: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct UpdatedNoticeResponse {
    pub message: &'static str,
    pub file_urls: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DeletedNoticeResponse {
    pub message: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    #[test]
    fn list_query_converts_to_filter() {
        let q = NoticeListQuery {
            exposure_type: Some("selected".into()),
            board_id: Some("4".into()),
            title: Some("  maintenance ".into()),
            start_date: Some("2024-03-01".into()),
            end_date: Some("".into()),
            exclude_expired: Some("true".into()),
        };
        let f = NoticeFilter::try_from(q).unwrap();
        assert_eq!(f.exposure_type, Some(ExposureType::Selected));
        assert_eq!(f.board_id, Some(4));
        assert_eq!(f.board_name, None);
        assert_eq!(f.title.as_deref(), Some("maintenance"));
        assert_eq!(f.start_date, Some(date!(2024 - 03 - 01)));
        assert_eq!(f.end_date, None);
        assert!(f.exclude_expired);
    }

    #[test]
    fn unknown_exposure_value_is_kept_as_board_name() {
        let q = NoticeListQuery {
            exposure_type: Some(" FreeBoard ".into()),
            ..Default::default()
        };
        let f = NoticeFilter::try_from(q).unwrap();
        assert_eq!(f.exposure_type, None);
        assert_eq!(f.board_name.as_deref(), Some("FreeBoard"));

        let q = NoticeListQuery {
            exposure_type: Some("none".into()),
            ..Default::default()
        };
        let f = NoticeFilter::try_from(q).unwrap();
        assert_eq!(f.exposure_type, Some(ExposureType::None));
        assert_eq!(f.board_name, None);
    }

    #[test]
    fn bad_query_values_are_rejected() {
        let q = NoticeListQuery {
            board_id: Some("four".into()),
            ..Default::default()
        };
        assert!(NoticeFilter::try_from(q).is_err());

        let q = NoticeListQuery {
            start_date: Some("03/01/2024".into()),
            ..Default::default()
        };
        assert!(NoticeFilter::try_from(q).is_err());
    }

    #[test]
    fn serializes_dates_and_keeps_null_vs_empty() {
        let n = Notice {
            id: 1,
            title: "t".into(),
            content: "<p>c</p>".into(),
            exposure_type: "ALL".into(),
            board_ids: None,
            file_urls: Some(vec![]),
            expire_date: Some(date!(2024 - 12 - 31)),
            created_at: datetime!(2024-01-02 03:04:05 UTC),
            updated_at: datetime!(2024-01-02 03:04:05 UTC),
        };
        let v = serde_json::to_value(&n).unwrap();
        assert!(v["board_ids"].is_null());
        assert_eq!(v["file_urls"], serde_json::json!([]));
        assert_eq!(v["expire_date"], "2024-12-31");
        assert_eq!(v["created_at"], "2024-01-02T03:04:05Z");
    }
}
