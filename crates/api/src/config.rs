//! Process configuration read from the environment.

use std::time::Duration;

use thiserror::Error;

const DEV_JWT_SECRET: &str = "dev-secret";
const DEFAULT_TOKEN_TTL_SECS: u64 = 24 * 60 * 60;
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 25;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key}={value:?} is invalid: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub bind_addr: String,
    /// Unset selects the in-memory stores.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub request_timeout: Duration,
}

impl core::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .field("bind_addr", &self.bind_addr)
            .field("database_url", &self.database_url.as_ref().map(|_| "<set>"))
            .field("db_max_connections", &self.db_max_connections)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let jwt_secret = match get("JWT_SECRET") {
            Some(secret) => secret,
            None => {
                tracing::warn!("JWT_SECRET not set; using insecure dev default");
                DEV_JWT_SECRET.to_string()
            }
        };

        let token_ttl = Duration::from_secs(positive("JWT_TTL_SECS", get("JWT_TTL_SECS"), DEFAULT_TOKEN_TTL_SECS)?);
        let request_timeout = Duration::from_secs(positive(
            "REQUEST_TIMEOUT_SECS",
            get("REQUEST_TIMEOUT_SECS"),
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?);
        let db_max_connections = u32::try_from(positive(
            "DB_MAX_CONNECTIONS",
            get("DB_MAX_CONNECTIONS"),
            u64::from(DEFAULT_DB_MAX_CONNECTIONS),
        )?)
        .map_err(|e| ConfigError::Invalid {
            key: "DB_MAX_CONNECTIONS",
            value: get("DB_MAX_CONNECTIONS").unwrap_or_default(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            jwt_secret,
            token_ttl,
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            database_url: get("DATABASE_URL"),
            db_max_connections,
            request_timeout,
        })
    }

    /// In-memory configuration with defaults, for tests and local runs.
    pub fn in_memory(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            token_ttl: Duration::from_secs(DEFAULT_TOKEN_TTL_SECS),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            database_url: None,
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

fn positive(key: &'static str, raw: Option<String>, default: u64) -> Result<u64, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.parse::<u64>() {
        Ok(0) => Err(ConfigError::Invalid {
            key,
            value: raw,
            reason: "must be greater than zero".to_string(),
        }),
        Ok(n) => Ok(n),
        Err(e) => Err(ConfigError::Invalid {
            key,
            value: raw,
            reason: e.to_string(),
        }),
    }
}
