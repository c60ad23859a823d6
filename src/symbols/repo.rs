use anyhow::Context;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ExchangeSummary {
    pub exchange_name: String,
    pub exchange_code: String,
    pub total_symbols: i64,
    /// Symbols still waiting for a display name.
    pub empty_symbol_names: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Symbol {
    pub exchange_code: String,
    pub exchange_name: String,
    pub symbol_code: String,
    pub symbol_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SymbolName {
    pub symbol_code: String,
    pub symbol_name: Option<String>,
}

pub async fn list_exchanges(db: &PgPool) -> anyhow::Result<Vec<ExchangeSummary>> {
    let rows = sqlx::query_as::<_, ExchangeSummary>(
        r#"
        SELECT exchange_name,
               exchange_code,
               COUNT(*) AS total_symbols,
               COUNT(*) FILTER (WHERE symbol_name IS NULL OR symbol_name = '') AS empty_symbol_names
          FROM exchange_info
         GROUP BY exchange_name, exchange_code
         ORDER BY exchange_code
        "#,
    )
    .fetch_all(db)
    .await
    .context("list exchanges")?;
    Ok(rows)
}

pub async fn list_by_exchange(db: &PgPool, exchange_code: &str) -> anyhow::Result<Vec<Symbol>> {
    let rows = sqlx::query_as::<_, Symbol>(
        r#"
        SELECT exchange_code, exchange_name, symbol_code, symbol_name
          FROM exchange_info
         WHERE exchange_code = $1
         ORDER BY symbol_name ASC NULLS LAST, symbol_code
        "#,
    )
    .bind(exchange_code)
    .fetch_all(db)
    .await
    .context("list symbols by exchange")?;
    Ok(rows)
}

pub async fn list_all(db: &PgPool) -> anyhow::Result<Vec<Symbol>> {
    let rows = sqlx::query_as::<_, Symbol>(
        r#"
        SELECT exchange_code, exchange_name, symbol_code, symbol_name
          FROM exchange_info
         ORDER BY exchange_code, symbol_code
        "#,
    )
    .fetch_all(db)
    .await
    .context("list symbols")?;
    Ok(rows)
}

/// One UPDATE per symbol, run concurrently. Statements that already ran stay applied if a later one fails.
pub async fn update_names(db: &PgPool, exchange_code: &str, names: &[SymbolName]) -> anyhow::Result<u64> {
    let updates = names.iter().map(|s| {
        sqlx::query(
            "UPDATE exchange_info SET symbol_name = $1 WHERE exchange_code = $2 AND symbol_code = $3",
        )
        .bind(s.symbol_name.as_deref())
        .bind(exchange_code)
        .bind(&s.symbol_code)
        .execute(db)
    });
    let results = try_join_all(updates).await.context("update symbol names")?;
    Ok(results.iter().map(|r| r.rows_affected()).sum())
}
