//! Admin passwords are stored as Argon2id PHC strings (`$argon2id$v=19$...`).
//! The cost parameters live inside each string, so rows hashed under older
//! parameters keep verifying.

use anyhow::anyhow;
use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;

fn hasher() -> Argon2<'static> {
    Argon2::default()
}

/// PHC string for `plain` under a fresh random salt.
pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    hasher()
        .hash_password(plain.as_bytes(), &salt)
        .map(|phc| phc.to_string())
        .map_err(|e| anyhow!("hash admin password: {e}"))
}

/// `Ok(false)` on a plain mismatch. A `stored` value that is not a PHC string
/// (plaintext left in the column by the old admin tool) is an error.
pub fn verify_password(plain: &str, stored: &str) -> anyhow::Result<bool> {
    let phc = PasswordHash::new(stored).map_err(|e| anyhow!("stored password is not a PHC hash: {e}"))?;
    match hasher().verify_password(plain.as_bytes(), &phc) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(anyhow!("verify admin password: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_form_is_argon2id_with_a_fresh_salt() {
        let a = hash_password("referral-admin-1").unwrap();
        let b = hash_password("referral-admin-1").unwrap();
        assert!(a.starts_with("$argon2id$"));
        assert_ne!(a, b);
        assert!(verify_password("referral-admin-1", &a).unwrap());
        assert!(verify_password("referral-admin-1", &b).unwrap());
    }

    #[test]
    fn mismatch_is_false_not_an_error() {
        let stored = hash_password("referral-admin-1").unwrap();
        assert!(!verify_password("referral-admin-2", &stored).unwrap());
        assert!(!verify_password("", &stored).unwrap());
    }

    #[test]
    fn plaintext_column_is_an_error() {
        let err = verify_password("asdf1234", "asdf1234").unwrap_err();
        assert!(err.to_string().contains("not a PHC hash"));
    }
}
