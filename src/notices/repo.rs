use anyhow::Context;
use sqlx::{types::Json, FromRow, PgPool, Postgres, QueryBuilder};
use time::{Date, OffsetDateTime};

use super::dto::{ExposureType, Notice, NoticeFilter};
use crate::db::contains_pattern;

const NOTICE_COLUMNS: &str =
    "id, title, content, exposure_type, board_ids, file_urls, expire_date, created_at, updated_at";

#[derive(Debug, FromRow)]
pub struct NoticeRow {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub exposure_type: String,
    pub board_ids: Option<Json<Vec<i64>>>,
    pub file_urls: Option<Json<Vec<String>>>,
    pub expire_date: Option<Date>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl From<NoticeRow> for Notice {
    fn from(r: NoticeRow) -> Self {
        Self {
            id: r.id,
            title: r.title,
            content: r.content,
            exposure_type: r.exposure_type,
            board_ids: r.board_ids.map(|Json(v)| v),
            file_urls: r.file_urls.map(|Json(v)| v),
            expire_date: r.expire_date,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// Values written on insert and full update.
pub struct NoticeWrite<'a> {
    pub title: &'a str,
    pub content: &'a str,
    pub exposure_type: ExposureType,
    pub board_ids: Option<&'a [i64]>,
    pub file_urls: Option<&'a [String]>,
    pub expire_date: Option<Date>,
}

pub(crate) fn list_query(f: &NoticeFilter) -> QueryBuilder<'_, Postgres> {
    let mut qb = QueryBuilder::new(format!("SELECT {NOTICE_COLUMNS} FROM notices WHERE TRUE"));

    if let Some(exposure) = f.exposure_type {
        qb.push(" AND exposure_type = ").push_bind(exposure.as_str());
    }
    if let Some(board_id) = f.board_id {
        // visible on the board: shown everywhere, or explicitly selected
        qb.push(" AND (exposure_type = 'ALL' OR (exposure_type = 'SELECTED' AND board_ids @> ")
            .push_bind(Json(vec![board_id]))
            .push("))");
    }
    if let Some(title) = f.title.as_deref() {
        qb.push(" AND title ILIKE ").push_bind(contains_pattern(title));
    }
    if let Some(start) = f.start_date {
        qb.push(" AND created_at >= ").push_bind(start);
    }
    if let Some(end) = f.end_date {
        // end date is inclusive
        match end.next_day() {
            Some(next) => {
                qb.push(" AND created_at < ").push_bind(next);
            }
            None => {
                qb.push(" AND created_at::date <= ").push_bind(end);
            }
        }
    }
    if f.exclude_expired {
        qb.push(" AND (expire_date IS NULL OR expire_date >= CURRENT_DATE)");
    }

    qb.push(" ORDER BY created_at DESC, id DESC");
    qb
}

pub async fn list(db: &PgPool, filter: &NoticeFilter) -> anyhow::Result<Vec<Notice>> {
    let rows = list_query(filter)
        .build_query_as::<NoticeRow>()
        .fetch_all(db)
        .await
        .context("list notices")?;
    Ok(rows.into_iter().map(Notice::from).collect())
}

pub async fn get(db: &PgPool, id: i64) -> anyhow::Result<Option<Notice>> {
    let row = sqlx::query_as::<_, NoticeRow>(&format!(
        "SELECT {NOTICE_COLUMNS} FROM notices WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await
    .context("get notice")?;
    Ok(row.map(Notice::from))
}

pub async fn insert(db: &PgPool, n: &NoticeWrite<'_>) -> anyhow::Result<i64> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO notices (title, content, exposure_type, board_ids, file_urls, expire_date)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(n.title)
    .bind(n.content)
    .bind(n.exposure_type.as_str())
    .bind(n.board_ids.map(Json))
    .bind(n.file_urls.map(Json))
    .bind(n.expire_date)
    .fetch_one(db)
    .await
    .context("insert notice")?;
    Ok(id)
}

/// Replaces every editable column. Returns `false` when the notice is gone.
pub async fn update(db: &PgPool, id: i64, n: &NoticeWrite<'_>) -> anyhow::Result<bool> {
    let res = sqlx::query(
        r#"
        UPDATE notices
           SET title = $1, content = $2, exposure_type = $3, board_ids = $4,
               file_urls = $5, expire_date = $6, updated_at = NOW()
         WHERE id = $7
        "#,
    )
    .bind(n.title)
    .bind(n.content)
    .bind(n.exposure_type.as_str())
    .bind(n.board_ids.map(Json))
    .bind(n.file_urls.map(Json))
    .bind(n.expire_date)
    .bind(id)
    .execute(db)
    .await
    .context("update notice")?;
    Ok(res.rows_affected() > 0)
}

/// Hard delete. `None` when nothing was deleted, otherwise the file URLs the row held.
pub async fn delete(db: &PgPool, id: i64) -> anyhow::Result<Option<Vec<String>>> {
    let row = sqlx::query_scalar::<_, Option<Json<Vec<String>>>>(
        "DELETE FROM notices WHERE id = $1 RETURNING file_urls",
    )
    .bind(id)
    .fetch_optional(db)
    .await
    .context("delete notice")?;
    Ok(row.map(|urls| urls.map(|Json(v)| v).unwrap_or_default()))
}

pub async fn count(db: &PgPool) -> anyhow::Result<i64> {
    let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM notices")
        .fetch_one(db)
        .await
        .context("count notices")?;
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn empty_filter_lists_everything_newest_first() {
        let f = NoticeFilter::default();
        let qb = list_query(&f);
        let sql = qb.sql();
        assert!(sql.starts_with("SELECT id, title"));
        assert!(sql.ends_with("WHERE TRUE ORDER BY created_at DESC, id DESC"));
    }

    #[test]
    fn every_filter_is_bound() {
        let f = NoticeFilter {
            exposure_type: Some(ExposureType::All),
            board_id: Some(3),
            title: Some("event".into()),
            start_date: Some(date!(2024 - 01 - 01)),
            end_date: Some(date!(2024 - 01 - 31)),
            exclude_expired: true,
            ..Default::default()
        };
        let qb = list_query(&f);
        let sql = qb.sql();
        assert!(sql.contains("exposure_type = $1"));
        assert!(sql.contains("board_ids @> $2"));
        assert!(sql.contains("title ILIKE $3"));
        assert!(sql.contains("created_at >= $4"));
        assert!(sql.contains("created_at < $5"));
        assert!(sql.contains("expire_date IS NULL OR expire_date >= CURRENT_DATE"));
        assert!(!sql.contains("event"));
    }
}
