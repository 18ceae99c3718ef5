//! # SchoolHub Config
//!
//! Configuration structures loaded from environment variables. Every struct
//! has a `from_env()` constructor that falls back to sensible defaults, so a
//! bare `.env` with only `DATABASE_URL` is enough for local development.
//!
//! - [`jwt`]: token signing secret and lifetime
//! - [`cors`]: allowed origins
//! - [`email`]: SMTP delivery
//! - [`rate_limit`]: per-IP request limits
//! - [`otp`]: one-time code lifetime and reset attempt cap
//! - [`scheduler`]: attendance job and test sweep timing
//! - [`uploads`]: upload directory and size limits

pub mod cors;
pub mod email;
pub mod jwt;
pub mod otp;
pub mod rate_limit;
pub mod scheduler;
pub mod uploads;

pub use cors::CorsConfig;
pub use email::EmailConfig;
pub use jwt::JwtConfig;
pub use otp::OtpConfig;
pub use rate_limit::RateLimitConfig;
pub use scheduler::SchedulerConfig;
pub use uploads::UploadConfig;

/// Reads and parses an environment variable, returning `default` when it is
/// unset or unparseable.
pub(crate) fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

pub(crate) fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| {
            let v = v.trim().to_lowercase();
            v == "true" || v == "1"
        })
        .unwrap_or(default)
}
