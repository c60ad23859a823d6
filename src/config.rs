use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;

#[derive(Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("ttl_minutes", &self.ttl_minutes)
            .field("refresh_ttl_minutes", &self.refresh_ttl_minutes)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub dir: PathBuf,
    pub public_prefix: String,
    pub max_files: usize,
    pub max_file_bytes: usize,
}

impl UploadConfig {
    /// Upper bound for a whole multipart body: every file at its limit plus room for text fields.
    pub fn body_limit(&self) -> usize {
        self.max_files * self.max_file_bytes + 1024 * 1024
    }
}

#[derive(Clone, Deserialize)]
pub struct BybitConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub coin: String,
    pub lookback_days: i64,
}

impl fmt::Debug for BybitConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BybitConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_secret", &self.api_secret.as_ref().map(|_| "<redacted>"))
            .field("coin", &self.coin)
            .field("lookback_days", &self.lookback_days)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt: JwtConfig,
    pub upload: UploadConfig,
    pub bybit: BybitConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let database_max_connections = env_parse("DATABASE_MAX_CONNECTIONS", 10);
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "referral-admin".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "referral-admin-console".into()),
            ttl_minutes: env_parse("JWT_TTL_MINUTES", 60 * 24),
            refresh_ttl_minutes: env_parse("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 14),
        };
        let upload = UploadConfig {
            dir: std::env::var("UPLOAD_DIR")
                .unwrap_or_else(|_| "public/uploads".into())
                .into(),
            public_prefix: std::env::var("UPLOAD_PUBLIC_PREFIX").unwrap_or_else(|_| "/uploads".into()),
            max_files: env_parse("UPLOAD_MAX_FILES", 10),
            max_file_bytes: env_parse("UPLOAD_MAX_FILE_BYTES", 10 * 1024 * 1024),
        };
        let bybit = BybitConfig {
            base_url: std::env::var("BYBIT_BASE_URL").unwrap_or_else(|_| "https://api.bybit.com".into()),
            api_key: std::env::var("BYBIT_API_KEY").ok().filter(|v| !v.is_empty()),
            api_secret: std::env::var("BYBIT_API_SECRET").ok().filter(|v| !v.is_empty()),
            coin: std::env::var("BYBIT_DEPOSIT_COIN").unwrap_or_else(|_| "USDT".into()),
            lookback_days: env_parse("BYBIT_DEPOSIT_LOOKBACK_DAYS", 10),
        };
        Ok(Self {
            database_url,
            database_max_connections,
            jwt,
            upload,
            bybit,
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_hides_secrets() {
        let jwt = JwtConfig {
            secret: "super-secret".into(),
            issuer: "iss".into(),
            audience: "aud".into(),
            ttl_minutes: 5,
            refresh_ttl_minutes: 60,
        };
        let bybit = BybitConfig {
            base_url: "https://api.bybit.com".into(),
            api_key: Some("key-123".into()),
            api_secret: Some("secret-456".into()),
            coin: "USDT".into(),
            lookback_days: 10,
        };
        let out = format!("{:?} {:?}", jwt, bybit);
        assert!(!out.contains("super-secret"));
        assert!(!out.contains("key-123"));
        assert!(!out.contains("secret-456"));
        assert!(out.contains("<redacted>"));
    }

    #[test]
    fn body_limit_covers_all_files() {
        let upload = UploadConfig {
            dir: "public/uploads".into(),
            public_prefix: "/uploads".into(),
            max_files: 10,
            max_file_bytes: 10 * 1024 * 1024,
        };
        assert!(upload.body_limit() > 100 * 1024 * 1024);
    }
}
