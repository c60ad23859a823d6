pub mod client;

use std::collections::BTreeMap;

use axum::{extract::State, routing::get, Router};
use serde::Serialize;
use time::{Date, OffsetDateTime};
use tracing::{instrument, warn};

use crate::{error::ApiResult, extract::Json, state::AppState};
use client::DepositRow;

time::serde::format_description!(day, Date, "[year]-[month]-[day]");

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyDeposit {
    #[serde(with = "day")]
    pub date: Date,
    pub amount: f64,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/deposits", get(list_deposits))
}

fn settled_on(row: &DepositRow) -> Option<(Date, f64)> {
    let ms: i128 = row.success_at.trim().parse().ok()?;
    let date = OffsetDateTime::from_unix_timestamp_nanos(ms * 1_000_000).ok()?.date();
    let amount: f64 = row.amount.trim().parse().ok()?;
    amount.is_finite().then_some((date, amount))
}

/// Sums deposits per UTC settlement day, oldest first.
pub fn daily_deposits(rows: &[DepositRow]) -> Vec<DailyDeposit> {
    let mut by_day: BTreeMap<Date, f64> = BTreeMap::new();
    for row in rows {
        match settled_on(row) {
            Some((date, amount)) => *by_day.entry(date).or_default() += amount,
            None => warn!(success_at = %row.success_at, amount = %row.amount, "skipping unreadable deposit row"),
        }
    }
    by_day
        .into_iter()
        .map(|(date, amount)| DailyDeposit { date, amount })
        .collect()
}

#[instrument(skip(state))]
pub async fn list_deposits(State(state): State<AppState>) -> ApiResult<Json<Vec<DailyDeposit>>> {
    let source = state
        .deposits
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("deposit source not configured"))?;
    let rows = source.fetch_deposits(OffsetDateTime::now_utc()).await?;
    Ok(Json(daily_deposits(&rows)))
}
