use anyhow::Context;
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::{debug, warn};

use crate::{config::JwtConfig, error::ApiError, state::AppState};

/// Type of JWT: access or refresh.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    #[serde(alias = "Access")]
    Access,
    #[serde(alias = "Refresh")]
    Refresh,
}

/// Session token payload. `sub` is the admin's user id; times are unix seconds.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
    pub aud: String,
    pub kind: TokenKind,
}

/// Signing material plus the lifetimes of both token kinds.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl From<&JwtConfig> for JwtKeys {
    fn from(cfg: &JwtConfig) -> Self {
        let secret = cfg.secret.as_bytes();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            access_ttl: Duration::minutes(cfg.ttl_minutes.max(1)),
            refresh_ttl: Duration::minutes(cfg.refresh_ttl_minutes.max(1)),
        }
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        JwtKeys::from(&state.config.jwt)
    }
}

impl JwtKeys {
    fn ttl(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        }
    }

    fn issue(&self, user_id: i64, kind: TokenKind) -> anyhow::Result<String> {
        let issued = OffsetDateTime::now_utc();
        let claims = Claims {
            sub: user_id,
            iat: issued.unix_timestamp(),
            exp: (issued + self.ttl(kind)).unix_timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            kind,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .context("sign session token")?;
        debug!(user_id, ?kind, "session token issued");
        Ok(token)
    }

    pub fn sign_access(&self, user_id: i64) -> anyhow::Result<String> {
        self.issue(user_id, TokenKind::Access)
    }

    pub fn sign_refresh(&self, user_id: i64) -> anyhow::Result<String> {
        self.issue(user_id, TokenKind::Refresh)
    }

    /// Checks signature, expiry, issuer and audience, then the token kind.
    fn verify(&self, token: &str, expected: TokenKind) -> anyhow::Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[&self.audience]);
        validation.set_issuer(&[&self.issuer]);
        let claims = decode::<Claims>(token, &self.decoding, &validation)
            .context("decode session token")?
            .claims;
        if claims.kind != expected {
            anyhow::bail!("expected a {:?} token, got {:?}", expected, claims.kind);
        }
        Ok(claims)
    }

    pub fn verify_access(&self, token: &str) -> anyhow::Result<Claims> {
        self.verify(token, TokenKind::Access)
    }

    pub fn verify_refresh(&self, token: &str) -> anyhow::Result<Claims> {
        self.verify(token, TokenKind::Refresh)
    }
}

/// Extracts and validates the bearer access token, yielding the admin's user id.
pub struct AuthUser(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".into()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .or_else(|| auth_header.strip_prefix("bearer "))
            .ok_or_else(|| ApiError::Unauthorized("Invalid Authorization header".into()))?;

        let claims = keys.verify_access(token).map_err(|e| {
            warn!(error = %e, "session token rejected");
            ApiError::Unauthorized("Invalid or expired token".into())
        })?;

        Ok(AuthUser(claims.sub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(secret: &str, issuer: &str, audience: &str) -> JwtKeys {
        JwtKeys::from(&JwtConfig {
            secret: secret.into(),
            issuer: issuer.into(),
            audience: audience.into(),
            ttl_minutes: 5,
            refresh_ttl_minutes: 60,
        })
    }

    #[test]
    fn access_token_carries_the_admin_id() {
        let k = keys("dev-secret", "referral-admin", "admin-ui");
        let claims = k.verify_access(&k.sign_access(42).unwrap()).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.iss, "referral-admin");
        assert_eq!(claims.aud, "admin-ui");
        assert_eq!(claims.kind, TokenKind::Access);
        assert_eq!(claims.exp - claims.iat, 5 * 60);
    }

    #[test]
    fn kinds_are_not_interchangeable() {
        let k = keys("dev-secret", "iss", "aud");
        let refresh = k.sign_refresh(7).unwrap();
        let claims = k.verify_refresh(&refresh).unwrap();
        assert_eq!(claims.sub, 7);
        assert_eq!(claims.exp - claims.iat, 60 * 60);
        assert!(k.verify_access(&refresh).is_err());

        let access = k.sign_access(7).unwrap();
        let err = k.verify_refresh(&access).unwrap_err();
        assert!(err.to_string().contains("Refresh"));
    }

    #[test]
    fn foreign_issuer_audience_or_secret_is_rejected() {
        let token = keys("same-secret", "good-iss", "good-aud").sign_access(1).unwrap();
        assert!(keys("same-secret", "bad-iss", "good-aud").verify_access(&token).is_err());
        assert!(keys("same-secret", "good-iss", "bad-aud").verify_access(&token).is_err());
        assert!(keys("other-secret", "good-iss", "good-aud").verify_access(&token).is_err());
    }

    #[test]
    fn zero_ttl_config_still_gives_a_minute() {
        let k = JwtKeys::from(&JwtConfig {
            secret: "s".into(),
            issuer: "i".into(),
            audience: "a".into(),
            ttl_minutes: 0,
            refresh_ttl_minutes: -3,
        });
        assert_eq!(k.ttl(TokenKind::Access), Duration::minutes(1));
        assert_eq!(k.ttl(TokenKind::Refresh), Duration::minutes(1));
    }
}
