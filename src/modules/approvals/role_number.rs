//! Student role numbers: a two-letter region prefix and a zero-padded
//! sequence, e.g. `NO001` for the first student of region "North".
//!
//! The next number follows the most recently created account of the same
//! region that already holds a role number. If that candidate is taken, one
//! more attempt is made from the highest number in use under the prefix.
//! Two approvals racing past both checks are caught by the unique index on
//! `users.role_number` and surface as 409.

use anyhow::Context;
use sqlx::PgConnection;
use tracing::{instrument, warn};

use schoolhub_core::AppError;

/// Region used when an admission request carries none.
pub const DEFAULT_REGION: &str = "NO";

pub fn region_prefix(region: &str) -> String {
    let region = region.trim();
    let region = if region.is_empty() { DEFAULT_REGION } else { region };
    region.chars().take(2).collect::<String>().to_uppercase()
}

/// Trailing digits of a role number, 0 when there are none.
pub fn sequence_of(role_number: &str) -> u32 {
    let digits: String = role_number
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    digits.parse().unwrap_or(0)
}

pub fn format_role_number(prefix: &str, sequence: u32) -> String {
    format!("{prefix}{sequence:03}")
}

/// Number that follows `latest` under `prefix`.
pub fn next_role_number(prefix: &str, latest: Option<&str>) -> String {
    let next = latest.map(sequence_of).unwrap_or(0).saturating_add(1);
    format_role_number(prefix, next)
}

/// Sequence after the highest one in use, `None` once it no longer fits.
pub fn sequence_after(highest: Option<i64>) -> Option<u32> {
    u32::try_from(highest.unwrap_or(0).max(0))
        .ok()?
        .checked_add(1)
}

async fn is_taken(conn: &mut PgConnection, role_number: &str) -> Result<bool, AppError> {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE role_number = $1)")
        .bind(role_number)
        .fetch_one(conn)
        .await
        .context("Failed to check role number")
        .map_err(AppError::database)
}

/// Picks the role number for a new student of `region`.
#[instrument(skip(conn))]
pub async fn generate(conn: &mut PgConnection, region: &str) -> Result<String, AppError> {
    let prefix = region_prefix(region);

    let latest: Option<String> = sqlx::query_scalar(
        r#"SELECT role_number FROM users
           WHERE LOWER(academic_region) = LOWER($1) AND role_number IS NOT NULL
           ORDER BY created_at DESC
           LIMIT 1"#,
    )
    .bind(region.trim())
    .fetch_optional(&mut *conn)
    .await
    .context("Failed to fetch latest role number")
    .map_err(AppError::database)?;

    let candidate = next_role_number(&prefix, latest.as_deref());
    if !is_taken(&mut *conn, &candidate).await? {
        return Ok(candidate);
    }

    // Literal prefix match, `_` and `%` included.
    let highest: Option<i64> = sqlx::query_scalar(
        r#"SELECT MAX(substring(role_number FROM '(\d+)$')::BIGINT)
           FROM users
           WHERE starts_with(role_number, $1)"#,
    )
    .bind(&prefix)
    .fetch_one(&mut *conn)
    .await
    .context("Failed to fetch highest role number")
    .map_err(AppError::database)?;

    let sequence = sequence_after(highest).ok_or_else(|| {
        AppError::conflict(anyhow::anyhow!(
            "Role numbers under prefix {prefix} are exhausted"
        ))
    })?;
    let regenerated = format_role_number(&prefix, sequence);
    warn!(
        candidate = %candidate,
        regenerated = %regenerated,
        "Role number collision, regenerated once"
    );
    Ok(regenerated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_prefix() {
        assert_eq!(region_prefix("North"), "NO");
        assert_eq!(region_prefix("  delhi "), "DE");
        assert_eq!(region_prefix(""), "NO");
    }

    #[test]
    fn test_first_and_second_numbers() {
        assert_eq!(next_role_number("NO", None), "NO001");
        assert_eq!(next_role_number("NO", Some("NO001")), "NO002");
        assert_eq!(next_role_number("MU", Some("MU099")), "MU100");
        assert_eq!(next_role_number("MU", Some("MU999")), "MU1000");
    }

    #[test]
    fn test_unparseable_latest_restarts() {
        assert_eq!(sequence_of("NO"), 0);
        assert_eq!(sequence_of("legacy-id"), 0);
        assert_eq!(next_role_number("NO", Some("garbage")), "NO001");
    }

    #[test]
    fn test_sequence_after_highest() {
        assert_eq!(sequence_after(None), Some(1));
        assert_eq!(sequence_after(Some(41)), Some(42));
        assert_eq!(sequence_after(Some(-3)), Some(1));
        assert_eq!(sequence_after(Some(i64::from(u32::MAX))), None);
        assert_eq!(sequence_after(Some(i64::MAX)), None);
    }

    #[test]
    fn test_sequence_uses_trailing_digits() {
        assert_eq!(sequence_of("NO012"), 12);
        assert_eq!(sequence_of("N2O007"), 7);
    }
}
