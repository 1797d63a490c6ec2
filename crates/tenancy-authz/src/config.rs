//! Engine configuration.
//!
//! Configuration is loaded from environment variables with defaults that
//! match the documented invitation policy (7 day TTL, 32 bytes of token
//! entropy, one retry on uniqueness conflicts).

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::retry::RetryConfig;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid configuration value.
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Error message.
        message: String,
    },
}

/// Minimum accepted token entropy in bytes.
pub const MIN_TOKEN_BYTES: usize = 16;

/// Authorization engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthzConfig {
    /// Lifetime of a new invitation in days.
    pub invitation_ttl_days: i64,

    /// Random bytes per invitation token (before encoding).
    pub token_bytes: usize,

    /// Interval between expiry sweeps in seconds.
    pub sweep_interval_secs: u64,

    /// Attempts for invitation creation when a uniqueness constraint conflicts.
    pub create_max_attempts: u32,
}

impl Default for AuthzConfig {
    fn default() -> Self {
        Self {
            invitation_ttl_days: tenancy_org::invitation::DEFAULT_TTL_DAYS,
            token_bytes: 32,
            sweep_interval_secs: 300,
            create_max_attempts: 2,
        }
    }
}

impl AuthzConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `INVITATION_TTL_DAYS`: Invitation lifetime in days (default: 7)
    /// - `INVITATION_TOKEN_BYTES`: Token entropy in bytes (default: 32)
    /// - `INVITATION_SWEEP_INTERVAL_SECS`: Expiry sweep period (default: 300)
    /// - `INVITATION_CREATE_MAX_ATTEMPTS`: Attempts on conflict (default: 2)
    ///
    /// Unparseable values fall back to the default; call [`validate`](Self::validate)
    /// to reject out-of-range ones.
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            invitation_ttl_days: env_or("INVITATION_TTL_DAYS", default.invitation_ttl_days),
            token_bytes: env_or("INVITATION_TOKEN_BYTES", default.token_bytes),
            sweep_interval_secs: env_or(
                "INVITATION_SWEEP_INTERVAL_SECS",
                default.sweep_interval_secs,
            ),
            create_max_attempts: env_or(
                "INVITATION_CREATE_MAX_ATTEMPTS",
                default.create_max_attempts,
            ),
        }
    }

    /// Set the invitation lifetime in days.
    pub fn with_invitation_ttl_days(mut self, days: i64) -> Self {
        self.invitation_ttl_days = days;
        self
    }

    /// Set the sweep interval in seconds.
    pub fn with_sweep_interval_secs(mut self, secs: u64) -> Self {
        self.sweep_interval_secs = secs;
        self
    }

    /// Set the number of creation attempts on conflict.
    pub fn with_create_max_attempts(mut self, attempts: u32) -> Self {
        self.create_max_attempts = attempts;
        self
    }

    /// Check that every value is in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.invitation_ttl_days < 1 {
            return Err(invalid("INVITATION_TTL_DAYS", "must be at least 1 day"));
        }
        if self.token_bytes < MIN_TOKEN_BYTES {
            return Err(invalid(
                "INVITATION_TOKEN_BYTES",
                &format!("must be at least {} bytes", MIN_TOKEN_BYTES),
            ));
        }
        if self.sweep_interval_secs == 0 {
            return Err(invalid("INVITATION_SWEEP_INTERVAL_SECS", "must be positive"));
        }
        if self.create_max_attempts == 0 {
            return Err(invalid("INVITATION_CREATE_MAX_ATTEMPTS", "must be positive"));
        }
        Ok(())
    }

    /// Invitation lifetime as a chrono duration.
    pub fn invitation_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.invitation_ttl_days)
    }

    /// Sweep interval as a std duration.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Retry policy for invitation creation.
    pub fn create_retry(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.create_max_attempts,
            ..RetryConfig::conflict()
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn invalid(key: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AuthzConfig::default();
        assert_eq!(config.invitation_ttl_days, 7);
        assert_eq!(config.token_bytes, 32);
        assert_eq!(config.sweep_interval(), Duration::from_secs(300));
        assert_eq!(config.create_retry().max_attempts, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let config = AuthzConfig::default().with_invitation_ttl_days(0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { key, .. }) if key == "INVITATION_TTL_DAYS"
        ));

        let config = AuthzConfig {
            token_bytes: 8,
            ..AuthzConfig::default()
        };
        assert!(config.validate().is_err());

        assert!(AuthzConfig::default()
            .with_sweep_interval_secs(0)
            .validate()
            .is_err());
        assert!(AuthzConfig::default()
            .with_create_max_attempts(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_from_env_overrides() {
        std::env::set_var("INVITATION_TTL_DAYS", "14");
        std::env::set_var("INVITATION_SWEEP_INTERVAL_SECS", "not-a-number");
        let config = AuthzConfig::from_env();
        std::env::remove_var("INVITATION_TTL_DAYS");
        std::env::remove_var("INVITATION_SWEEP_INTERVAL_SECS");

        assert_eq!(config.invitation_ttl_days, 14);
        assert_eq!(config.invitation_ttl(), chrono::Duration::days(14));
        assert_eq!(config.sweep_interval_secs, 300);
    }
}
