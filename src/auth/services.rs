use lazy_static::lazy_static;
use regex::Regex;
use sqlx::PgPool;
use tracing::warn;

use super::password::verify_password;
use crate::users::repo::User;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Returns the user whose email and password both match, `None` otherwise.
pub async fn verify_credentials(
    db: &PgPool,
    email: &str,
    password: &str,
) -> anyhow::Result<Option<User>> {
    let Some(user) = User::find_by_email(db, &normalize_email(email)).await? else {
        return Ok(None);
    };
    Ok(check_password(user, password))
}

/// A row whose hash cannot be parsed never authenticates.
pub(crate) fn check_password(user: User, password: &str) -> Option<User> {
    match verify_password(password, &user.password_hash) {
        Ok(true) => Some(user),
        Ok(false) => None,
        Err(e) => {
            warn!(user_id = user.id, error = %e, "stored password hash is unreadable");
            None
        }
    }
}
