use anyhow::Context;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct BotConfig {
    pub id: i64,
    pub bot_name: String,
    pub bot_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AlertInfo {
    pub id: i64,
    pub name: String,
    #[serde(alias = "lv")]
    pub level: i32,
}

pub async fn list_bots(db: &PgPool) -> anyhow::Result<Vec<BotConfig>> {
    let rows = sqlx::query_as::<_, BotConfig>("SELECT id, bot_name, bot_path FROM bot_config ORDER BY id")
        .fetch_all(db)
        .await
        .context("list bots")?;
    Ok(rows)
}

pub async fn insert_bot(db: &PgPool, bot_name: &str, bot_path: &str) -> anyhow::Result<i64> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO bot_config (bot_name, bot_path) VALUES ($1, $2) RETURNING id",
    )
    .bind(bot_name)
    .bind(bot_path)
    .fetch_one(db)
    .await
    .context("insert bot")?;
    Ok(id)
}

pub async fn count_bots(db: &PgPool) -> anyhow::Result<i64> {
    let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM bot_config")
        .fetch_one(db)
        .await
        .context("count bots")?;
    Ok(n)
}

pub async fn list_alerts(db: &PgPool) -> anyhow::Result<Vec<AlertInfo>> {
    let rows = sqlx::query_as::<_, AlertInfo>("SELECT id, name, level FROM alert_info ORDER BY id")
        .fetch_all(db)
        .await
        .context("list alerts")?;
    Ok(rows)
}

/// Concurrent per-row updates; no rollback of the ones that succeeded.
pub async fn update_alerts(db: &PgPool, alerts: &[AlertInfo]) -> anyhow::Result<u64> {
    let updates = alerts.iter().map(|a| {
        sqlx::query("UPDATE alert_info SET name = $1, level = $2 WHERE id = $3")
            .bind(&a.name)
            .bind(a.level)
            .bind(a.id)
            .execute(db)
    });
    let results = try_join_all(updates).await.context("update alerts")?;
    Ok(results.iter().map(|r| r.rows_affected()).sum())
}

pub async fn count_alerts(db: &PgPool) -> anyhow::Result<i64> {
    let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM alert_info")
        .fetch_one(db)
        .await
        .context("count alerts")?;
    Ok(n)
}
