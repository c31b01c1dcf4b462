//! Deployment configuration parsed from environment variables.

use std::time::Duration;

use crate::rate_limit::{DEFAULT_MAX_ATTEMPTS, DEFAULT_WINDOW_SECS, RateLimitConfig};

pub const DEFAULT_FIREBASE_AUTH_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";
pub const DEFAULT_FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required config: env var {var} not set")]
    Missing { var: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirebaseConfig {
    pub api_key: String,
    pub project_id: String,
    pub auth_base_url: String,
    pub firestore_base_url: String,
    pub timeouts: HttpTimeouts,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// Bootstrap administrator email, compared exactly.
    pub admin_email: Option<String>,
    pub rate_limit: RateLimitConfig,
    pub firebase: FirebaseConfig,
}

impl AuthConfig {
    /// Build typed config from environment variables.
    ///
    /// Required:
    /// - `FIREBASE_API_KEY`
    /// - `FIREBASE_PROJECT_ID`
    ///
    /// Optional:
    /// - `ADMIN_EMAIL`: bootstrap admin, unset when blank
    /// - `LOGIN_RATE_LIMIT_MAX_ATTEMPTS`: default 5
    /// - `LOGIN_RATE_LIMIT_WINDOW_SECS`: default 900
    /// - `FIREBASE_AUTH_BASE_URL`, `FIRESTORE_BASE_URL`: REST endpoint overrides
    /// - `FIREBASE_REQUEST_TIMEOUT_SECS`: default 30
    /// - `FIREBASE_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when a required variable is absent.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AuthConfig::from_env`] over an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when a required key is absent.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |var: &'static str| {
            lookup(var)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing { var })
        };

        let api_key = required("FIREBASE_API_KEY")?;
        let project_id = required("FIREBASE_PROJECT_ID")?;
        let admin_email = lookup("ADMIN_EMAIL")
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty());

        let rate_limit = RateLimitConfig {
            max_attempts: parse_or(&lookup, "LOGIN_RATE_LIMIT_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS),
            window: Duration::from_secs(parse_or(&lookup, "LOGIN_RATE_LIMIT_WINDOW_SECS", DEFAULT_WINDOW_SECS)),
        };

        let firebase = FirebaseConfig {
            api_key,
            project_id,
            auth_base_url: base_url(&lookup, "FIREBASE_AUTH_BASE_URL", DEFAULT_FIREBASE_AUTH_BASE_URL),
            firestore_base_url: base_url(&lookup, "FIRESTORE_BASE_URL", DEFAULT_FIRESTORE_BASE_URL),
            timeouts: HttpTimeouts {
                request_secs: parse_or(&lookup, "FIREBASE_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
                connect_secs: parse_or(&lookup, "FIREBASE_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
            },
        };

        Ok(Self { admin_email, rate_limit, firebase })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn base_url<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_owned())
        .trim_end_matches('/')
        .to_owned()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
