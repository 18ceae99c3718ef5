//! Six-digit one-time codes for email verification and password reset.
//!
//! The functions here are pure: they take the stored code and the current
//! time and decide. [`OtpService`] applies the decisions to the `users` table.
//!
//! Verification codes live in `otp_code`/`otp_expires_at` and are cleared on
//! success. Reset codes live in `reset_otp_*`; verifying one only marks it as
//! verified, because the reset step checks it again before changing the
//! password. Every reset request bumps `reset_password_attempts`, and once the
//! counter reaches the cap further requests are refused until a reset succeeds.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use schoolhub_core::AppError;
use schoolhub_models::{User, UserId};

pub const OTP_LENGTH: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OtpPurpose {
    Verification,
    PasswordReset,
}

impl OtpPurpose {
    pub fn subject(&self) -> &'static str {
        match self {
            OtpPurpose::Verification => "Verify your email",
            OtpPurpose::PasswordReset => "Password reset code",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OtpError {
    #[error("No OTP found. Please request a new one")]
    NotFound,

    #[error("OTP has expired")]
    Expired,

    #[error("Invalid OTP")]
    Invalid,

    #[error("Too many reset attempts. Please try again later.")]
    AttemptsExceeded,
}

impl OtpError {
    pub fn into_app_error(self) -> AppError {
        match self {
            OtpError::AttemptsExceeded => AppError::too_many_requests(self.to_string()),
            _ => AppError::bad_request(self),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedOtp {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

pub fn generate_code() -> String {
    rand::thread_rng().gen_range(100_000..1_000_000).to_string()
}

pub fn issue(now: DateTime<Utc>, ttl_minutes: i64) -> IssuedOtp {
    IssuedOtp {
        code: generate_code(),
        expires_at: now + Duration::minutes(ttl_minutes),
    }
}

/// Checks `supplied` against the stored code. Expiry is checked before the
/// code itself, so a stale code reports `Expired` even when it matches.
pub fn check(
    stored_code: Option<&str>,
    expires_at: Option<DateTime<Utc>>,
    supplied: &str,
    now: DateTime<Utc>,
) -> Result<(), OtpError> {
    let (Some(code), Some(expires_at)) = (stored_code, expires_at) else {
        return Err(OtpError::NotFound);
    };
    if now > expires_at {
        return Err(OtpError::Expired);
    }
    if code != supplied.trim() {
        return Err(OtpError::Invalid);
    }
    Ok(())
}

/// Refuses a new reset request once `attempts` has reached `max_attempts`.
pub fn ensure_reset_allowed(attempts: i32, max_attempts: i32) -> Result<(), OtpError> {
    if attempts >= max_attempts {
        Err(OtpError::AttemptsExceeded)
    } else {
        Ok(())
    }
}

pub struct OtpService;

impl OtpService {
    /// Stores a fresh verification code on the account.
    #[instrument(skip(db))]
    pub async fn issue_verification(
        db: &PgPool,
        user_id: UserId,
        ttl_minutes: i64,
    ) -> Result<IssuedOtp, AppError> {
        let otp = issue(Utc::now(), ttl_minutes);

        sqlx::query(
            r#"UPDATE users SET otp_code = $2, otp_expires_at = $3, updated_at = NOW()
               WHERE id = $1"#,
        )
        .bind(user_id)
        .bind(&otp.code)
        .bind(otp.expires_at)
        .execute(db)
        .await
        .map_err(AppError::database)?;

        Ok(otp)
    }

    /// Checks a verification code and marks the email verified.
    #[instrument(skip(db, user, supplied), fields(user.id = %user.id))]
    pub async fn verify_email(db: &PgPool, user: &User, supplied: &str) -> Result<(), AppError> {
        check(
            user.otp_code.as_deref(),
            user.otp_expires_at,
            supplied,
            Utc::now(),
        )
        .map_err(OtpError::into_app_error)?;

        sqlx::query(
            r#"UPDATE users
               SET is_email_verified = TRUE, otp_code = NULL, otp_expires_at = NULL, updated_at = NOW()
               WHERE id = $1"#,
        )
        .bind(user.id)
        .execute(db)
        .await
        .map_err(AppError::database)?;

        Ok(())
    }

    /// Issues a reset code and counts the request against the cap.
    ///
    /// The cap is checked in the same statement that bumps the counter, so
    /// concurrent requests cannot overshoot it.
    #[instrument(skip(db))]
    pub async fn issue_reset(
        db: &PgPool,
        user_id: UserId,
        ttl_minutes: i64,
        max_attempts: i32,
    ) -> Result<IssuedOtp, AppError> {
        let otp = issue(Utc::now(), ttl_minutes);

        let updated = sqlx::query(
            r#"UPDATE users
               SET reset_otp_code = $2,
                   reset_otp_expires_at = $3,
                   reset_otp_verified = FALSE,
                   reset_password_attempts = reset_password_attempts + 1,
                   updated_at = NOW()
               WHERE id = $1 AND reset_password_attempts < $4"#,
        )
        .bind(user_id)
        .bind(&otp.code)
        .bind(otp.expires_at)
        .bind(max_attempts)
        .execute(db)
        .await
        .map_err(AppError::database)?;

        if updated.rows_affected() == 0 {
            return Err(OtpError::AttemptsExceeded.into_app_error());
        }

        Ok(otp)
    }

    /// Checks a reset code and marks it verified without clearing it.
    #[instrument(skip(db, user, supplied), fields(user.id = %user.id))]
    pub async fn verify_reset(db: &PgPool, user: &User, supplied: &str) -> Result<(), AppError> {
        check(
            user.reset_otp_code.as_deref(),
            user.reset_otp_expires_at,
            supplied,
            Utc::now(),
        )
        .map_err(OtpError::into_app_error)?;

        sqlx::query("UPDATE users SET reset_otp_verified = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(user.id)
            .execute(db)
            .await
            .map_err(AppError::database)?;

        Ok(())
    }

    /// Re-checks the reset code, stores the new password hash and clears the
    /// reset state, including the attempt counter.
    #[instrument(skip(db, user, supplied, password_hash), fields(user.id = %user.id))]
    pub async fn complete_reset(
        db: &PgPool,
        user: &User,
        supplied: &str,
        password_hash: &str,
    ) -> Result<(), AppError> {
        check(
            user.reset_otp_code.as_deref(),
            user.reset_otp_expires_at,
            supplied,
            Utc::now(),
        )
        .map_err(OtpError::into_app_error)?;

        sqlx::query(
            r#"UPDATE users
               SET password_hash = $2,
                   reset_otp_code = NULL,
                   reset_otp_expires_at = NULL,
                   reset_otp_verified = FALSE,
                   reset_password_attempts = 0,
                   updated_at = NOW()
               WHERE id = $1"#,
        )
        .bind(user.id)
        .bind(password_hash)
        .execute(db)
        .await
        .map_err(AppError::database)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issued_at() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-01-06T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_generate_code_is_six_digits() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), OTP_LENGTH);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_issue_sets_expiry_from_ttl() {
        let otp = issue(issued_at(), 15);
        assert_eq!(otp.expires_at - issued_at(), Duration::minutes(15));
    }

    #[test]
    fn test_accepted_just_before_expiry() {
        let otp = issue(issued_at(), 15);
        let at = issued_at() + Duration::minutes(14) + Duration::seconds(59);
        assert_eq!(check(Some(&otp.code), Some(otp.expires_at), &otp.code, at), Ok(()));
    }

    #[test]
    fn test_rejected_just_after_expiry() {
        let otp = issue(issued_at(), 15);
        let at = issued_at() + Duration::minutes(15) + Duration::seconds(1);
        assert_eq!(
            check(Some(&otp.code), Some(otp.expires_at), &otp.code, at),
            Err(OtpError::Expired)
        );
    }

    #[test]
    fn test_accepted_at_exact_expiry() {
        let otp = issue(issued_at(), 15);
        assert!(check(Some(&otp.code), Some(otp.expires_at), &otp.code, otp.expires_at).is_ok());
    }

    #[test]
    fn test_wrong_code_is_invalid() {
        let expires = issued_at() + Duration::minutes(15);
        assert_eq!(
            check(Some("123456"), Some(expires), "654321", issued_at()),
            Err(OtpError::Invalid)
        );
        assert_eq!(check(Some("123456"), Some(expires), " 123456 ", issued_at()), Ok(()));
    }

    #[test]
    fn test_missing_code_is_not_found() {
        assert_eq!(
            check(None, None, "123456", issued_at()),
            Err(OtpError::NotFound)
        );
        assert_eq!(
            check(Some("123456"), None, "123456", issued_at()),
            Err(OtpError::NotFound)
        );
    }

    #[test]
    fn test_reset_cap() {
        assert!(ensure_reset_allowed(0, 3).is_ok());
        assert!(ensure_reset_allowed(2, 3).is_ok());
        assert_eq!(ensure_reset_allowed(3, 3), Err(OtpError::AttemptsExceeded));
    }

    #[test]
    fn test_error_statuses() {
        assert_eq!(OtpError::Expired.into_app_error().status.as_u16(), 400);
        assert_eq!(OtpError::NotFound.into_app_error().status.as_u16(), 400);
        assert_eq!(
            OtpError::AttemptsExceeded.into_app_error().status.as_u16(),
            429
        );
    }
}
