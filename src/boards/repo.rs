use anyhow::Context;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

use crate::common_codes::repo::BOARD_TYPE_GROUP;

/// Board joined with the display name of its type.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Board {
    pub id: i64,
    pub name: String,
    pub type_code: String,
    pub type_name: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct BoardOption {
    pub id: i64,
    pub name: String,
}

const BOARD_SELECT: &str = r#"
    SELECT b.id, b.name, b.type_code, c.name AS type_name, b.created_at, b.updated_at
      FROM boards b
      LEFT JOIN common_codes c ON c.code = b.type_code AND c.group_code = $1
"#;

pub async fn list(db: &PgPool) -> anyhow::Result<Vec<Board>> {
    let sql = format!("{BOARD_SELECT} WHERE b.is_deleted = FALSE ORDER BY b.created_at DESC, b.id DESC");
    let rows = sqlx::query_as::<_, Board>(&sql)
        .bind(BOARD_TYPE_GROUP)
        .fetch_all(db)
        .await
        .context("list boards")?;
    Ok(rows)
}

pub async fn list_options(db: &PgPool) -> anyhow::Result<Vec<BoardOption>> {
    let rows = sqlx::query_as::<_, BoardOption>(
        "SELECT id, name FROM boards WHERE is_deleted = FALSE ORDER BY id ASC",
    )
    .fetch_all(db)
    .await
    .context("list board options")?;
    Ok(rows)
}

pub async fn get(db: &PgPool, id: i64) -> anyhow::Result<Option<Board>> {
    let sql = format!("{BOARD_SELECT} WHERE b.id = $2 AND b.is_deleted = FALSE");
    let row = sqlx::query_as::<_, Board>(&sql)
        .bind(BOARD_TYPE_GROUP)
        .bind(id)
        .fetch_optional(db)
        .await
        .context("get board")?;
    Ok(row)
}

/// Id of the live board with exactly this name.
pub async fn find_id_by_name(db: &PgPool, name: &str) -> anyhow::Result<Option<i64>> {
    let id = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM boards WHERE name = $1 AND is_deleted = FALSE ORDER BY id ASC LIMIT 1",
    )
    .bind(name)
    .fetch_optional(db)
    .await
    .context("find board by name")?;
    Ok(id)
}

pub async fn insert(db: &PgPool, name: &str, type_code: &str) -> anyhow::Result<i64> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO boards (name, type_code) VALUES ($1, $2) RETURNING id",
    )
    .bind(name)
    .bind(type_code)
    .fetch_one(db)
    .await
    .context("insert board")?;
    Ok(id)
}

/// Returns `false` when the board is missing or already deleted.
pub async fn update(db: &PgPool, id: i64, name: &str, type_code: &str) -> anyhow::Result<bool> {
    let res = sqlx::query(
        r#"
        UPDATE boards
           SET name = $1, type_code = $2, updated_at = NOW()
         WHERE id = $3 AND is_deleted = FALSE
        "#,
    )
    .bind(name)
    .bind(type_code)
    .bind(id)
    .execute(db)
    .await
    .context("update board")?;
    Ok(res.rows_affected() > 0)
}

/// Flags the board as deleted. Rows already deleted are left alone, so repeat calls affect 0 rows.
pub async fn soft_delete(db: &PgPool, id: i64) -> anyhow::Result<u64> {
    let res = sqlx::query(
        "UPDATE boards SET is_deleted = TRUE, updated_at = NOW() WHERE id = $1 AND is_deleted = FALSE",
    )
    .bind(id)
    .execute(db)
    .await
    .context("soft delete board")?;
    Ok(res.rows_affected())
}

pub async fn count(db: &PgPool) -> anyhow::Result<i64> {
    let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM boards WHERE is_deleted = FALSE")
        .fetch_one(db)
        .await
        .context("count boards")?;
    Ok(n)
}
