use sqlx::PgPool;
use tracing::{info, warn};

use super::dto::{CreateUserRequest, UpdateUserRequest, UserStatus};
use super::repo::{NewUser, User, UserChanges};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::services::{is_valid_email, normalize_email};
use crate::db::{is_unique_violation, non_blank};
use crate::error::{ApiError, ApiResult};

pub const MIN_PASSWORD_LEN: usize = 8;
pub const SAME_PASSWORD_MSG: &str = "New password must be different from the current password";

pub(crate) fn changes_from(req: &UpdateUserRequest) -> ApiResult<UserChanges<'_>> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("Name is required"));
    }
    if req.level < 0 {
        return Err(ApiError::bad_request("Level must not be negative"));
    }
    Ok(UserChanges {
        name,
        phone: non_blank(req.phone.as_deref()),
        address1: non_blank(req.address1.as_deref()),
        address2: non_blank(req.address2.as_deref()),
        referral_code: non_blank(req.referral_code.as_deref()),
        referral_exchange: non_blank(req.referral_exchange.as_deref()),
        level: req.level,
        status: req
            .status
            .parse::<UserStatus>()
            .map_err(ApiError::bad_request)?
            .as_str(),
        memo: non_blank(req.memo.as_deref()),
    })
}

/// Checks everything about a new user that does not need the database.
pub(crate) fn validate_new_user(req: &CreateUserRequest) -> ApiResult<String> {
    let email = normalize_email(&req.email);
    if !is_valid_email(&email) {
        return Err(ApiError::bad_request("Invalid email"));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request("Password too short"));
    }
    changes_from(&req.profile)?;
    Ok(email)
}

pub async fn create_user(db: &PgPool, req: &CreateUserRequest) -> ApiResult<User> {
    let email = validate_new_user(req)?;

    if User::email_exists(db, &email).await? {
        warn!(%email, "email already registered");
        return Err(ApiError::Conflict("Email already registered".into()));
    }

    let hash = hash_password(&req.password)?;
    let new = NewUser {
        email: &email,
        changes: changes_from(&req.profile)?,
        password_hash: &hash,
    };
    let user = User::create(db, &new).await.map_err(|e| {
        if is_unique_violation(&e) {
            warn!(%email, "email registered concurrently");
            ApiError::Conflict("Email already registered".into())
        } else {
            ApiError::from(e)
        }
    })?;
    info!(user_id = user.id, email = %user.email, "user created");
    Ok(user)
}

pub async fn update_user(db: &PgPool, id: i64, req: &UpdateUserRequest) -> ApiResult<User> {
    let changes = changes_from(req)?;
    let user = User::update(db, id, &changes)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    info!(user_id = id, "user updated");
    Ok(user)
}

/// Validates a password change against the stored hash.
/// Reusing the current password is reported before any length complaint.
pub(crate) fn check_password_change(stored_hash: &str, current: &str, new: &str) -> ApiResult<()> {
    if current == new {
        return Err(ApiError::bad_request(SAME_PASSWORD_MSG));
    }
    if new.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request("Password too short"));
    }
    if !verify_password(current, stored_hash)? {
        return Err(ApiError::bad_request("Current password is incorrect"));
    }
    if verify_password(new, stored_hash)? {
        return Err(ApiError::bad_request(SAME_PASSWORD_MSG));
    }
    Ok(())
}

pub async fn change_password(db: &PgPool, id: i64, current: &str, new: &str) -> ApiResult<()> {
    let user = User::find_by_id(db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    check_password_change(&user.password_hash, current, new)?;

    let hash = hash_password(new)?;
    User::set_password_hash(db, id, &hash).await?;
    info!(user_id = id, "password changed");
    Ok(())
}
