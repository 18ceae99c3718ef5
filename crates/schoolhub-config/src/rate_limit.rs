//! Per-IP rate limiting for the HTTP API.
//!
//! Two token buckets are configured: a general one for every `/api` route and
//! a stricter one for `/api/auth`, where logins and OTP requests live.
//!
//! - `RATE_LIMIT_ENABLED`: turn limiting off entirely (default: true)
//! - `RATE_LIMIT_GENERAL_PER_SECOND` / `RATE_LIMIT_GENERAL_BURST_SIZE` (default: 2 / 30)
//! - `RATE_LIMIT_AUTH_PER_SECOND` / `RATE_LIMIT_AUTH_BURST_SIZE` (default: 10 / 5)
//!
//! The key is the peer IP, so the server must be started with
//! `into_make_service_with_connect_info::<SocketAddr>()`.

use tower_governor::governor::{GovernorConfig, GovernorConfigBuilder};
use tower_governor::key_extractor::PeerIpKeyExtractor;

use crate::{env_flag, env_parse};

pub type IpGovernorConfig =
    GovernorConfig<PeerIpKeyExtractor, ::governor::middleware::NoOpMiddleware>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub general_per_second: u64,
    pub general_burst_size: u32,
    /// Seconds between token refills on the auth bucket.
    pub auth_per_second: u64,
    pub auth_burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            general_per_second: 2,
            general_burst_size: 30,
            auth_per_second: 10,
            auth_burst_size: 5,
        }
    }
}

impl RateLimitConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: env_flag("RATE_LIMIT_ENABLED", defaults.enabled),
            general_per_second: env_parse(
                "RATE_LIMIT_GENERAL_PER_SECOND",
                defaults.general_per_second,
            ),
            general_burst_size: env_parse(
                "RATE_LIMIT_GENERAL_BURST_SIZE",
                defaults.general_burst_size,
            ),
            auth_per_second: env_parse("RATE_LIMIT_AUTH_PER_SECOND", defaults.auth_per_second),
            auth_burst_size: env_parse("RATE_LIMIT_AUTH_BURST_SIZE", defaults.auth_burst_size),
        }
    }

    /// Configuration disabled, for tests driving the router without a peer address.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Returns `None` when limiting is disabled or a value is zero.
    #[must_use]
    pub fn general_governor_config(&self) -> Option<IpGovernorConfig> {
        if !self.enabled {
            return None;
        }
        GovernorConfigBuilder::default()
            .per_second(self.general_per_second)
            .burst_size(self.general_burst_size)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
    }

    #[must_use]
    pub fn auth_governor_config(&self) -> Option<IpGovernorConfig> {
        if !self.enabled {
            return None;
        }
        GovernorConfigBuilder::default()
            .per_second(self.auth_per_second)
            .burst_size(self.auth_burst_size)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RateLimitConfig::default();
        assert!(config.enabled);
        assert_eq!(config.general_per_second, 2);
        assert_eq!(config.general_burst_size, 30);
        assert_eq!(config.auth_per_second, 10);
        assert_eq!(config.auth_burst_size, 5);
    }

    #[test]
    fn test_disabled_yields_no_governor() {
        let config = RateLimitConfig::disabled();
        assert!(config.general_governor_config().is_none());
        assert!(config.auth_governor_config().is_none());
    }

    #[test]
    fn test_zero_burst_yields_no_governor() {
        let config = RateLimitConfig {
            auth_burst_size: 0,
            ..RateLimitConfig::default()
        };
        assert!(config.auth_governor_config().is_none());
        assert!(config.general_governor_config().is_some());
    }
}
