//! Runtime configuration.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

pub const ENV_TOKEN_SECRET: &str = "TILLBOOK_TOKEN_SECRET";
pub const ENV_TOKEN_TTL_SECS: &str = "TILLBOOK_TOKEN_TTL_SECS";
pub const ENV_LOCK_TIMEOUT_MS: &str = "TILLBOOK_LOCK_TIMEOUT_MS";

const DEV_TOKEN_SECRET: &str = "dev-secret";
const DEFAULT_TOKEN_TTL_SECS: u64 = 24 * 60 * 60;
const MAX_TOKEN_TTL_SECS: u64 = 365 * 24 * 60 * 60;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawLedgerConfig")]
pub struct LedgerConfig {
    /// HMAC secret for bearer tokens.
    pub token_secret: String,
    pub token_ttl_secs: u64,
    /// Upper bound on waiting for the store's write lock. `None` waits forever.
    pub lock_timeout_ms: Option<u64>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            token_secret: DEV_TOKEN_SECRET.to_string(),
            token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
            lock_timeout_ms: None,
        }
    }
}

/// Deserialization shape; every field is optional and bounds are checked on
/// conversion.
#[derive(Deserialize)]
#[serde(default)]
struct RawLedgerConfig {
    token_secret: String,
    token_ttl_secs: u64,
    lock_timeout_ms: Option<u64>,
}

impl Default for RawLedgerConfig {
    fn default() -> Self {
        let LedgerConfig {
            token_secret,
            token_ttl_secs,
            lock_timeout_ms,
        } = LedgerConfig::default();
        Self {
            token_secret,
            token_ttl_secs,
            lock_timeout_ms,
        }
    }
}

impl TryFrom<RawLedgerConfig> for LedgerConfig {
    type Error = ConfigError;

    fn try_from(raw: RawLedgerConfig) -> Result<Self, Self::Error> {
        let config = Self {
            token_secret: raw.token_secret,
            token_ttl_secs: raw.token_ttl_secs,
            lock_timeout_ms: raw.lock_timeout_ms,
        };
        config.validate()?;
        Ok(config)
    }
}

impl LedgerConfig {
    /// Load from process environment, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup (the environment, a map in tests, ...).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        match lookup(ENV_TOKEN_SECRET) {
            Some(secret) if !secret.is_empty() => config.token_secret = secret,
            Some(_) => {
                return Err(ConfigError::Invalid {
                    key: ENV_TOKEN_SECRET,
                    reason: "must not be empty".to_string(),
                });
            }
            None => {
                tracing::warn!("{ENV_TOKEN_SECRET} not set; using insecure dev default");
            }
        }

        if let Some(raw) = lookup(ENV_TOKEN_TTL_SECS) {
            config.token_ttl_secs = parse_number(ENV_TOKEN_TTL_SECS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_LOCK_TIMEOUT_MS) {
            config.lock_timeout_ms = Some(parse_number(ENV_LOCK_TIMEOUT_MS, &raw)?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the bounds every loaded config must satisfy.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token_secret.is_empty() {
            return Err(ConfigError::Invalid {
                key: ENV_TOKEN_SECRET,
                reason: "must not be empty".to_string(),
            });
        }
        check_positive(ENV_TOKEN_TTL_SECS, self.token_ttl_secs)?;
        if self.token_ttl_secs > MAX_TOKEN_TTL_SECS {
            return Err(ConfigError::Invalid {
                key: ENV_TOKEN_TTL_SECS,
                reason: format!("must be at most {MAX_TOKEN_TTL_SECS}"),
            });
        }
        if let Some(timeout) = self.lock_timeout_ms {
            check_positive(ENV_LOCK_TIMEOUT_MS, timeout)?;
        }
        Ok(())
    }

    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.token_ttl_secs.min(MAX_TOKEN_TTL_SECS) as i64)
    }

    pub fn lock_timeout(&self) -> Option<Duration> {
        self.lock_timeout_ms.map(Duration::from_millis)
    }
}

fn parse_number(key: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse::<u64>().map_err(|e| ConfigError::Invalid {
        key,
        reason: e.to_string(),
    })
}

fn check_positive(key: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid {
            key,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(())
}
