//! Process configuration, read from the environment once at startup.

use std::path::PathBuf;

use chrono::Duration;
use thiserror::Error;

use weeb_ai::DEFAULT_MODEL_PATH;

pub const DEV_JWT_SECRET: &str = "dev-insecure-secret-change-me";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a positive integer, got {value:?}")]
    NotPositive { var: &'static str, value: String },

    #[error("{var} is too large for a token lifetime, got {value:?}")]
    OutOfRange { var: &'static str, value: String },

    #[error("{0} must not be empty")]
    Empty(&'static str),
}

/// Bootstrap superuser credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminCredentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub bind_addr: String,
    pub jwt_secret: String,
    pub environment: String,
    pub model_path: PathBuf,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    /// Only consulted when built with the `postgres` feature.
    pub database_url: Option<String>,
    pub admin: Option<AdminCredentials>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            environment: "development".to_string(),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            access_token_ttl: Duration::minutes(60),
            refresh_token_ttl: Duration::days(7),
            database_url: None,
            admin: None,
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key → value source; unset and blank values fall back
    /// to the defaults.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(addr) = get("WEEB_BIND_ADDR") {
            config.bind_addr = addr;
        }
        match get("JWT_SECRET") {
            Some(secret) => config.jwt_secret = secret,
            None => tracing::warn!("JWT_SECRET not set; using insecure dev default"),
        }
        if let Some(environment) = get("WEEB_ENVIRONMENT") {
            config.environment = environment;
        }
        if let Some(path) = get("WEEB_MODEL_PATH") {
            config.model_path = PathBuf::from(path);
        }
        if let Some(raw) = get("WEEB_ACCESS_TOKEN_MINUTES") {
            config.access_token_ttl = lifetime("WEEB_ACCESS_TOKEN_MINUTES", raw, Duration::try_minutes)?;
        }
        if let Some(raw) = get("WEEB_REFRESH_TOKEN_DAYS") {
            config.refresh_token_ttl = lifetime("WEEB_REFRESH_TOKEN_DAYS", raw, Duration::try_days)?;
        }
        config.database_url = get("DATABASE_URL");

        config.admin = match (get("WEEB_ADMIN_EMAIL"), get("WEEB_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminCredentials { email, password }),
            (Some(_), None) => return Err(ConfigError::Empty("WEEB_ADMIN_PASSWORD")),
            (None, Some(_)) => return Err(ConfigError::Empty("WEEB_ADMIN_EMAIL")),
            (None, None) => None,
        };

        Ok(config)
    }
}

fn lifetime(
    var: &'static str,
    raw: String,
    unit: fn(i64) -> Option<Duration>,
) -> Result<Duration, ConfigError> {
    match raw.parse::<i64>() {
        Ok(n) if n > 0 => unit(n).ok_or(ConfigError::OutOfRange { var, value: raw }),
        _ => Err(ConfigError::NotPositive { var, value: raw }),
    }
}
