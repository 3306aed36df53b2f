//! Gateway configuration with validation.
//!
//! Loaded from environment variables:
//!
//! | Variable | Default |
//! |---|---|
//! | `SIWE_DOMAIN` | required |
//! | `SIWE_CHAIN_IDS` | `1` (comma separated) |
//! | `SIWE_NONCE_LENGTH` | `17` |
//! | `SIWE_BIND_ADDR` | `0.0.0.0:8080` |
//! | `SIWE_SESSION_COOKIE` | `siwe_session` |
//! | `SIWE_SECURE_COOKIE` | `true` |
//! | `SIWE_NONCE_TTL_SECS` | `300` |
//! | `SIWE_PURGE_INTERVAL_SECS` | `30` |

use qc_18_siwe_auth::AuthConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

pub const ENV_DOMAIN: &str = "SIWE_DOMAIN";
pub const ENV_CHAIN_IDS: &str = "SIWE_CHAIN_IDS";
pub const ENV_NONCE_LENGTH: &str = "SIWE_NONCE_LENGTH";
pub const ENV_BIND_ADDR: &str = "SIWE_BIND_ADDR";
pub const ENV_SESSION_COOKIE: &str = "SIWE_SESSION_COOKIE";
pub const ENV_SECURE_COOKIE: &str = "SIWE_SECURE_COOKIE";
pub const ENV_NONCE_TTL_SECS: &str = "SIWE_NONCE_TTL_SECS";
pub const ENV_PURGE_INTERVAL_SECS: &str = "SIWE_PURGE_INTERVAL_SECS";

/// Main gateway configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Sign-in rules (domain, chains, nonce length)
    pub auth: AuthConfig,
    /// Listen address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    /// Session cookie name (default: siwe_session)
    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,
    /// Mark the session cookie `Secure` (default: true)
    #[serde(default = "default_secure_cookie")]
    pub secure_cookie: bool,
    /// Age after which unused nonces and sessions are purged
    #[serde(default = "default_nonce_ttl", with = "humantime_serde")]
    pub nonce_ttl: Duration,
    /// How often the purge runs
    #[serde(default = "default_purge_interval", with = "humantime_serde")]
    pub purge_interval: Duration,
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080))
}

fn default_session_cookie() -> String {
    "siwe_session".to_string()
}

fn default_secure_cookie() -> bool {
    true
}

fn default_nonce_ttl() -> Duration {
    Duration::from_secs(300)
}

fn default_purge_interval() -> Duration {
    Duration::from_secs(30)
}

impl GatewayConfig {
    /// Defaults around the given sign-in rules.
    pub fn new(auth: AuthConfig) -> Self {
        Self {
            auth,
            bind_addr: default_bind_addr(),
            session_cookie: default_session_cookie(),
            secure_cookie: default_secure_cookie(),
            nonce_ttl: default_nonce_ttl(),
            purge_interval: default_purge_interval(),
        }
    }

    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary variable source, then validate.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let domain = lookup(ENV_DOMAIN)
            .filter(|value| !value.trim().is_empty())
            .ok_or(ConfigError::Missing(ENV_DOMAIN))?;
        let mut config = Self::new(AuthConfig::new(domain.trim()));

        if let Some(raw) = lookup(ENV_CHAIN_IDS) {
            config.auth.chain_ids = raw
                .split(',')
                .map(|part| parse_var(ENV_CHAIN_IDS, part.trim()))
                .collect::<Result<BTreeSet<u64>, ConfigError>>()?;
        }
        if let Some(raw) = lookup(ENV_NONCE_LENGTH) {
            config.auth.nonce_length = parse_var(ENV_NONCE_LENGTH, raw.trim())?;
        }
        if let Some(raw) = lookup(ENV_BIND_ADDR) {
            config.bind_addr = parse_var(ENV_BIND_ADDR, raw.trim())?;
        }
        if let Some(raw) = lookup(ENV_SESSION_COOKIE) {
            config.session_cookie = raw.trim().to_string();
        }
        if let Some(raw) = lookup(ENV_SECURE_COOKIE) {
            config.secure_cookie = parse_var(ENV_SECURE_COOKIE, raw.trim())?;
        }
        if let Some(raw) = lookup(ENV_NONCE_TTL_SECS) {
            config.nonce_ttl = Duration::from_secs(parse_var(ENV_NONCE_TTL_SECS, raw.trim())?);
        }
        if let Some(raw) = lookup(ENV_PURGE_INTERVAL_SECS) {
            config.purge_interval =
                Duration::from_secs(parse_var(ENV_PURGE_INTERVAL_SECS, raw.trim())?);
        }

        config.validate()?;
        info!(
            domain = %config.auth.domain,
            bind_addr = %config.bind_addr,
            "Loaded gateway configuration"
        );
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.auth.validate()?;

        let cookie_ok = !self.session_cookie.is_empty()
            && self
                .session_cookie
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.'));
        if !cookie_ok {
            return Err(ConfigError::Invalid(format!(
                "session cookie name {:?} must be a non-empty token",
                self.session_cookie
            )));
        }

        if self.nonce_ttl.is_zero() {
            return Err(ConfigError::InvalidTimeout("nonce TTL cannot be 0".into()));
        }
        if self.purge_interval.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "purge interval cannot be 0".into(),
            ));
        }

        Ok(())
    }
}

fn parse_var<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::InvalidVar {
        var,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required variable not set
    #[error("missing required variable {0}")]
    Missing(&'static str),
    /// Variable set to something unparseable
    #[error("invalid {var}={value:?}: {reason}")]
    InvalidVar {
        var: &'static str,
        value: String,
        reason: String,
    },
    /// Sign-in rules rejected
    #[error(transparent)]
    Auth(#[from] qc_18_siwe_auth::ConfigError),
    /// Invalid timeout value
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    /// General configuration error
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Duration as "{n}s", also accepting "ms", "m" and bare seconds.
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    fn parse_duration(s: &str) -> Result<Duration, &'static str> {
        let s = s.trim();
        if let Some(ms) = s.strip_suffix("ms") {
            ms.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| "invalid milliseconds")
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid seconds")
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.trim()
                .parse::<u64>()
                .map_err(|_| "invalid minutes")?
                .checked_mul(60)
                .map(Duration::from_secs)
                .ok_or("minutes out of range")
        } else {
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid duration format")
        }
    }
}
