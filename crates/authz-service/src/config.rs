//! Authorizer service configuration.
//!
//! Configuration is loaded from environment variables. The only required
//! setting is the trust-source (JWKS) URL; its absence is fatal at startup.

use common::config::ObservabilityConfig;
use common::jwt::{DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default server bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Issuer prefix every accepted token must carry.
pub const DEFAULT_TOKEN_ISSUER: &str = "HP Device Token Service";

/// Application ID of the scheduler, the one service allowed broker-wide access.
pub const DEFAULT_SCHEDULER_APP_ID: &str = "bebc5cbf-acc0-431f-8c4e-c582dc2489e2";

/// Shared-subscription group used by scheduler replicas.
pub const DEFAULT_SHARED_SUBSCRIPTION_GROUP: &str = "krypton";

/// Default JWKS fetch timeout in seconds.
pub const DEFAULT_JWKS_FETCH_TIMEOUT_SECONDS: u64 = 3;

/// Upper bound for the JWKS fetch timeout.
pub const MAX_JWKS_FETCH_TIMEOUT_SECONDS: u64 = 30;

/// Default refresh/disconnect interval for authenticated connections.
pub const DEFAULT_SESSION_TTL_SECONDS: u32 = 3600;

/// Broker limits for refresh/disconnect intervals.
pub const MIN_SESSION_TTL_SECONDS: u32 = 300;
pub const MAX_SESSION_TTL_SECONDS: u32 = 86_400;

/// Authorizer configuration.
#[derive(Clone)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// URL of the trust-source JWKS document.
    pub jwks_url: String,

    /// Timeout for a single JWKS fetch.
    pub jwks_fetch_timeout: Duration,

    /// Issuer prefix required on every token.
    pub token_issuer: String,

    /// Application ID allowed to connect with an app token.
    pub scheduler_app_id: String,

    /// Group name used in `$share/<group>/` shared-subscription topics.
    pub shared_subscription_group: String,

    /// JWT clock skew tolerance in seconds for iat validation.
    pub jwt_clock_skew_seconds: i64,

    /// Seconds before the broker re-invokes the authorizer for a connection.
    pub refresh_after_seconds: u32,

    /// Seconds before the broker disconnects an authenticated connection.
    pub disconnect_after_seconds: u32,

    /// Fallback invoked-function ARN when a request carries none.
    pub invoked_function_arn: Option<String>,

    /// Logging configuration.
    pub observability: ObservabilityConfig,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("jwks_url", &self.jwks_url)
            .field("jwks_fetch_timeout", &self.jwks_fetch_timeout)
            .field("token_issuer", &self.token_issuer)
            .field("scheduler_app_id", &"[REDACTED]")
            .field("shared_subscription_group", &self.shared_subscription_group)
            .field("jwt_clock_skew_seconds", &self.jwt_clock_skew_seconds)
            .field("refresh_after_seconds", &self.refresh_after_seconds)
            .field("disconnect_after_seconds", &self.disconnect_after_seconds)
            .field("invoked_function_arn", &self.invoked_function_arn)
            .field("observability", &self.observability)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("Invalid JWT clock skew configuration: {0}")]
    InvalidJwtClockSkew(String),

    #[error("Invalid JWKS fetch timeout configuration: {0}")]
    InvalidFetchTimeout(String),

    #[error("Invalid session TTL configuration: {0}")]
    InvalidSessionTtl(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let jwks_url = vars
            .get("JWKS_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("JWKS_URL".to_string()))?
            .clone();

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let token_issuer = non_empty_or_default(vars, "TOKEN_ISSUER", DEFAULT_TOKEN_ISSUER)?;
        let scheduler_app_id =
            non_empty_or_default(vars, "SCHEDULER_APP_ID", DEFAULT_SCHEDULER_APP_ID)?;

        let shared_subscription_group = non_empty_or_default(
            vars,
            "SHARED_SUBSCRIPTION_GROUP",
            DEFAULT_SHARED_SUBSCRIPTION_GROUP,
        )?;
        if !shared_subscription_group
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ConfigError::InvalidValue(
                "SHARED_SUBSCRIPTION_GROUP".to_string(),
                format!(
                    "must contain only letters, digits, '-' or '_', got '{}'",
                    shared_subscription_group
                ),
            ));
        }

        // Parse JWKS fetch timeout with validation
        let jwks_fetch_timeout_seconds =
            if let Some(value_str) = vars.get("JWKS_FETCH_TIMEOUT_SECONDS") {
                let value: u64 = value_str.parse().map_err(|e| {
                    ConfigError::InvalidFetchTimeout(format!(
                        "JWKS_FETCH_TIMEOUT_SECONDS must be a valid positive integer, got '{}': {}",
                        value_str, e
                    ))
                })?;

                if value == 0 || value > MAX_JWKS_FETCH_TIMEOUT_SECONDS {
                    return Err(ConfigError::InvalidFetchTimeout(format!(
                        "JWKS_FETCH_TIMEOUT_SECONDS must be between 1 and {}, got {}",
                        MAX_JWKS_FETCH_TIMEOUT_SECONDS, value
                    )));
                }

                value
            } else {
                DEFAULT_JWKS_FETCH_TIMEOUT_SECONDS
            };

        // Parse JWT clock skew tolerance with validation
        let jwt_clock_skew_seconds = if let Some(value_str) = vars.get("JWT_CLOCK_SKEW_SECONDS") {
            let value: i64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be a valid integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value <= 0 {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be positive, got {}",
                    value
                )));
            }

            if value > MAX_CLOCK_SKEW.as_secs() as i64 {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must not exceed {} seconds, got {}",
                    MAX_CLOCK_SKEW.as_secs(),
                    value
                )));
            }

            value
        } else {
            DEFAULT_CLOCK_SKEW.as_secs() as i64
        };

        let refresh_after_seconds = parse_session_ttl(vars, "REFRESH_AFTER_SECONDS")?;
        let disconnect_after_seconds = parse_session_ttl(vars, "DISCONNECT_AFTER_SECONDS")?;

        let invoked_function_arn = vars
            .get("INVOKED_FUNCTION_ARN")
            .filter(|v| !v.trim().is_empty())
            .cloned();

        Ok(Config {
            bind_address,
            jwks_url,
            jwks_fetch_timeout: Duration::from_secs(jwks_fetch_timeout_seconds),
            token_issuer,
            scheduler_app_id,
            shared_subscription_group,
            jwt_clock_skew_seconds,
            refresh_after_seconds,
            disconnect_after_seconds,
            invoked_function_arn,
            observability: ObservabilityConfig::from_vars(vars),
        })
    }
}

fn non_empty_or_default(
    vars: &HashMap<String, String>,
    name: &str,
    default: &str,
) -> Result<String, ConfigError> {
    match vars.get(name) {
        Some(value) if value.trim().is_empty() => Err(ConfigError::InvalidValue(
            name.to_string(),
            "must not be empty".to_string(),
        )),
        Some(value) => Ok(value.clone()),
        None => Ok(default.to_string()),
    }
}

fn parse_session_ttl(vars: &HashMap<String, String>, name: &str) -> Result<u32, ConfigError> {
    let Some(value_str) = vars.get(name) else {
        return Ok(DEFAULT_SESSION_TTL_SECONDS);
    };

    let value: u32 = value_str.parse().map_err(|e| {
        ConfigError::InvalidSessionTtl(format!(
            "{} must be a valid positive integer, got '{}': {}",
            name, value_str, e
        ))
    })?;

    if !(MIN_SESSION_TTL_SECONDS..=MAX_SESSION_TTL_SECONDS).contains(&value) {
        return Err(ConfigError::InvalidSessionTtl(format!(
            "{} must be between {} and {}, got {}",
            name, MIN_SESSION_TTL_SECONDS, MAX_SESSION_TTL_SECONDS, value
        )));
    }

    Ok(value)
}
