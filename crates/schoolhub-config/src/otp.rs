//! One-time code settings for email verification and password reset.
//!
//! - `OTP_TTL_MINUTES`: lifetime of an issued code (default: 15)
//! - `MAX_RESET_ATTEMPTS`: reset requests allowed before the account is
//!   locked out of the reset flow until a successful reset (default: 3)

use crate::env_parse;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OtpConfig {
    pub ttl_minutes: i64,
    pub max_reset_attempts: i32,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: 15,
            max_reset_attempts: 3,
        }
    }
}

impl OtpConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            ttl_minutes: env_parse("OTP_TTL_MINUTES", defaults.ttl_minutes).max(1),
            max_reset_attempts: env_parse("MAX_RESET_ATTEMPTS", defaults.max_reset_attempts)
                .max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OtpConfig::default();
        assert_eq!(config.ttl_minutes, 15);
        assert_eq!(config.max_reset_attempts, 3);
    }
}
