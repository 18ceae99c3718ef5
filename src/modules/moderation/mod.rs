//! The pending → approved | rejected lifecycle shared by teacher accounts,
//! student accounts, notes, scheduled-subject requests and event
//! announcements.
//!
//! Each of those records implements [`Moderatable`]. A decision is a single
//! conditional `UPDATE ... WHERE status = 'pending'`, so a record that is
//! missing or already decided yields [`ModerationError::NotPending`] and no
//! write happens. The admin review endpoints dispatch on
//! [`ModerationEntity`](schoolhub_models::moderation::ModerationEntity) and
//! call [`decide`] for the matching type.

pub mod controller;
pub mod entities;
pub mod router;

use std::fmt::Debug;
use std::future::Future;

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use thiserror::Error;
use uuid::Uuid;

use schoolhub_core::AppError;
use schoolhub_models::moderation::{ModerationOutcome, PendingItem};
use schoolhub_models::{ApprovalStatus, UserId};

use crate::audit_event;
use crate::metrics::track_moderation_decision;
use crate::state::AppState;

pub use entities::{StudentAccount, TeacherAccount};

#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("{0} not found or already reviewed")]
    NotPending(&'static str),

    #[error("Rejection reason is required")]
    MissingReason,

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl ModerationError {
    pub fn into_app_error(self) -> AppError {
        match self {
            ModerationError::NotPending(_) => AppError::not_found(self),
            ModerationError::MissingReason => AppError::bad_request(self),
            ModerationError::Database(e) => {
                AppError::database(anyhow::Error::new(e).context("Moderation update failed"))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject { reason: String },
}

impl Decision {
    /// A rejection; the reason is trimmed and must not be empty.
    pub fn reject(reason: &str) -> Result<Self, ModerationError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ModerationError::MissingReason);
        }
        Ok(Decision::Reject {
            reason: reason.to_string(),
        })
    }

    pub fn status(&self) -> ApprovalStatus {
        match self {
            Decision::Approve => ApprovalStatus::Approved,
            Decision::Reject { .. } => ApprovalStatus::Rejected,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Decision::Approve => None,
            Decision::Reject { reason } => Some(reason),
        }
    }

    /// `(approved_by, approved_at)` to store with the decision.
    pub fn approval_stamp(
        &self,
        admin: UserId,
        now: DateTime<Utc>,
    ) -> (Option<UserId>, Option<DateTime<Utc>>) {
        match self {
            Decision::Approve => (Some(admin), Some(now)),
            Decision::Reject { .. } => (None, None),
        }
    }
}

pub trait Moderatable: Sized + Send + Sync {
    type Key: Debug + Send + Sync;

    /// Label used for metrics and audit logs.
    const ENTITY: &'static str;
    /// Human readable name used in error messages.
    const LABEL: &'static str;

    /// Applies `decision` if the record is still pending.
    fn decide(
        conn: &mut PgConnection,
        key: &Self::Key,
        admin: UserId,
        decision: &Decision,
    ) -> impl Future<Output = Result<Self, ModerationError>> + Send;

    fn pending(db: &PgPool) -> impl Future<Output = Result<Vec<PendingItem>, ModerationError>> + Send;

    fn id(&self) -> Uuid;

    fn status(&self) -> ApprovalStatus;

    fn rejection_reason(&self) -> Option<&str>;

    /// Notification sent once the decision is committed.
    fn after_decision(&self, _state: &AppState) -> impl Future<Output = ()> + Send {
        async {}
    }

    fn approve<'a>(
        conn: &'a mut PgConnection,
        key: &'a Self::Key,
        admin: UserId,
    ) -> impl Future<Output = Result<Self, ModerationError>> + Send + 'a {
        async move { Self::decide(conn, key, admin, &Decision::Approve).await }
    }

    fn reject<'a>(
        conn: &'a mut PgConnection,
        key: &'a Self::Key,
        admin: UserId,
        reason: &'a str,
    ) -> impl Future<Output = Result<Self, ModerationError>> + Send + 'a {
        async move {
            let decision = Decision::reject(reason)?;
            Self::decide(conn, key, admin, &decision).await
        }
    }

    fn outcome(&self) -> ModerationOutcome {
        ModerationOutcome {
            entity: Self::ENTITY.to_string(),
            id: self.id(),
            status: self.status(),
            rejection_reason: self.rejection_reason().map(str::to_string),
            decided_at: Utc::now(),
        }
    }
}

/// Applies a decision on its own connection, then records it and runs the
/// record's notification.
pub async fn decide<M: Moderatable>(
    state: &AppState,
    key: &M::Key,
    admin: UserId,
    decision: &Decision,
) -> Result<M, AppError> {
    let mut conn = state
        .db
        .acquire()
        .await
        .map_err(|e| AppError::database(anyhow::Error::new(e).context("Failed to acquire connection")))?;

    let record = M::decide(&mut conn, key, admin, decision)
        .await
        .map_err(ModerationError::into_app_error)?;
    drop(conn);

    record_decision::<M>(&record, admin);
    record.after_decision(state).await;

    Ok(record)
}

/// Audit log and metric for a committed decision.
pub fn record_decision<M: Moderatable>(record: &M, admin: UserId) {
    let status = record.status();
    audit_event!(
        status.as_str(),
        M::ENTITY,
        record.id = %record.id(),
        admin.id = %admin,
        reason = record.rejection_reason().unwrap_or_default()
    );
    track_moderation_decision(M::ENTITY, status);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reject_requires_reason() {
        assert!(matches!(
            Decision::reject("   "),
            Err(ModerationError::MissingReason)
        ));
        let decision = Decision::reject("  Blurry scan ").unwrap();
        assert_eq!(decision.reason(), Some("Blurry scan"));
        assert_eq!(decision.status(), ApprovalStatus::Rejected);
    }

    #[test]
    fn test_approval_stamp_only_on_approve() {
        let admin = UserId::new();
        let now = Utc::now();
        assert_eq!(
            Decision::Approve.approval_stamp(admin, now),
            (Some(admin), Some(now))
        );
        let reject = Decision::reject("Duplicate").unwrap();
        assert_eq!(reject.approval_stamp(admin, now), (None, None));
    }

    #[test]
    fn test_error_statuses() {
        assert_eq!(
            ModerationError::NotPending("Note").into_app_error().status.as_u16(),
            404
        );
        assert_eq!(
            ModerationError::MissingReason.into_app_error().status.as_u16(),
            400
        );
        assert_eq!(
            ModerationError::NotPending("Scheduled subject").to_string(),
            "Scheduled subject not found or already reviewed"
        );
    }
}
