use anyhow::Context;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;

use super::dto::{UserFilter, UserStats};
use crate::db::contains_pattern;

const USER_COLUMNS: &str = "id, email, name, phone, address1, address2, referral_exchange, \
     referral_code, level, status, memo, password_hash, created_at, updated_at";

/// `referral_exchange` value marking a referral the exchange turned down.
pub const REJECTED_EXCHANGE: &str = "rejected";

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub referral_exchange: Option<String>,
    pub referral_code: Option<String>,
    pub level: i32,
    pub status: String,
    pub memo: Option<String>,
    #[serde(skip_serializing, default)]
    pub password_hash: String, // Argon2 hash, not exposed in JSON
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Columns an admin may change on an existing user.
#[derive(Debug, Clone)]
pub struct UserChanges<'a> {
    pub name: &'a str,
    pub phone: Option<&'a str>,
    pub address1: Option<&'a str>,
    pub address2: Option<&'a str>,
    pub referral_code: Option<&'a str>,
    pub referral_exchange: Option<&'a str>,
    pub level: i32,
    pub status: &'a str,
    pub memo: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub changes: UserChanges<'a>,
    pub password_hash: &'a str,
}

impl User {
    pub async fn list_all(db: &PgPool) -> anyhow::Result<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, id DESC");
        let users = sqlx::query_as::<_, User>(&sql)
            .fetch_all(db)
            .await
            .context("list users")?;
        Ok(users)
    }

    pub async fn find_by_id(db: &PgPool, id: i64) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(db)
            .await
            .context("find user by id")?;
        Ok(user)
    }

    /// Find a user by email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(db)
            .await
            .context("find user by email")?;
        Ok(user)
    }

    pub async fn email_exists(db: &PgPool, email: &str) -> anyhow::Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)",
        )
        .bind(email)
        .fetch_one(db)
        .await
        .context("check email")?;
        Ok(exists)
    }

    pub async fn create(db: &PgPool, new: &NewUser<'_>) -> anyhow::Result<User> {
        let c = &new.changes;
        let sql = format!(
            r#"
            INSERT INTO users (email, name, phone, address1, address2, referral_code,
                               referral_exchange, level, status, memo, password_hash)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {USER_COLUMNS}
            "#
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(new.email)
            .bind(c.name)
            .bind(c.phone)
            .bind(c.address1)
            .bind(c.address2)
            .bind(c.referral_code)
            .bind(c.referral_exchange)
            .bind(c.level)
            .bind(c.status)
            .bind(c.memo)
            .bind(new.password_hash)
            .fetch_one(db)
            .await
            .context("insert user")?;
        Ok(user)
    }

    /// Returns `None` when no user has this id.
    pub async fn update(
        db: &PgPool,
        id: i64,
        c: &UserChanges<'_>,
    ) -> anyhow::Result<Option<User>> {
        let sql = format!(
            r#"
            UPDATE users
               SET name = $1, phone = $2, address1 = $3, address2 = $4,
                   referral_code = $5, referral_exchange = $6, level = $7,
                   status = $8, memo = $9, updated_at = NOW()
             WHERE id = $10
            RETURNING {USER_COLUMNS}
            "#
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(c.name)
            .bind(c.phone)
            .bind(c.address1)
            .bind(c.address2)
            .bind(c.referral_code)
            .bind(c.referral_exchange)
            .bind(c.level)
            .bind(c.status)
            .bind(c.memo)
            .bind(id)
            .fetch_optional(db)
            .await
            .context("update user")?;
        Ok(user)
    }

    pub async fn set_password_hash(db: &PgPool, id: i64, hash: &str) -> anyhow::Result<u64> {
        let res = sqlx::query(
            "UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(hash)
        .bind(id)
        .execute(db)
        .await
        .context("update password")?;
        Ok(res.rows_affected())
    }
}

pub async fn stats(db: &PgPool) -> anyhow::Result<UserStats> {
    let referral = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM users WHERE referral_code IS NOT NULL",
    )
    .fetch_one(db);
    let non_referral = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM users WHERE referral_code IS NULL",
    )
    .fetch_one(db);
    let rejected = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM users WHERE referral_exchange = $1",
    )
    .bind(REJECTED_EXCHANGE)
    .fetch_one(db);

    let (referral_count, non_referral_count, rejected_count) =
        tokio::try_join!(referral, non_referral, rejected).context("user stats")?;

    Ok(UserStats {
        referral_count,
        non_referral_count,
        rejected_count,
    })
}

/// Every filter value goes through `push_bind`; only fixed SQL fragments are pushed as text.
pub fn search_query(filter: &UserFilter) -> QueryBuilder<'_, Postgres> {
    let mut qb = QueryBuilder::new(format!("SELECT {USER_COLUMNS} FROM users WHERE 1=1"));

    if let Some(status) = &filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(level) = filter.level {
        qb.push(" AND level = ").push_bind(level);
    }
    match filter.has_referral {
        Some(true) => {
            qb.push(" AND referral_code IS NOT NULL");
        }
        Some(false) => {
            qb.push(" AND referral_code IS NULL");
        }
        None => {}
    }
    if let Some(term) = filter.search_term.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        let pattern = contains_pattern(term);
        qb.push(" AND (email ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR phone ILIKE ")
            .push_bind(pattern)
            .push(")");
    }

    qb.push(" ORDER BY created_at DESC, id DESC");
    qb
}

pub async fn search(db: &PgPool, filter: &UserFilter) -> anyhow::Result<Vec<User>> {
    let users = search_query(filter)
        .build_query_as::<User>()
        .fetch_all(db)
        .await
        .context("search users")?;
    Ok(users)
}
