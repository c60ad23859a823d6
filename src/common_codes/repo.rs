use anyhow::Context;
use serde::Serialize;
use sqlx::{FromRow, PgPool};

/// Group holding the valid board types.
pub const BOARD_TYPE_GROUP: &str = "BOARD_TYPE";

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CommonCode {
    pub id: i64,
    pub group_code: String,
    pub code: String,
    pub name: String,
    pub sort_order: i32,
    pub is_active: bool,
}

pub async fn list_active(db: &PgPool, group_code: &str) -> anyhow::Result<Vec<CommonCode>> {
    let rows = sqlx::query_as::<_, CommonCode>(
        r#"
        SELECT id, group_code, code, name, sort_order, is_active
          FROM common_codes
         WHERE group_code = $1 AND is_active = TRUE
         ORDER BY sort_order, id
        "#,
    )
    .bind(group_code)
    .fetch_all(db)
    .await
    .context("list common codes")?;
    Ok(rows)
}

pub async fn exists(db: &PgPool, group_code: &str, code: &str) -> anyhow::Result<bool> {
    let found = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM common_codes WHERE group_code = $1 AND code = $2)",
    )
    .bind(group_code)
    .bind(code)
    .fetch_one(db)
    .await
    .context("check common code")?;
    Ok(found)
}
