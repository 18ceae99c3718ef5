//! [`Moderatable`] implementations.

use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use schoolhub_models::announcements::TeacherAnnouncement;
use schoolhub_models::moderation::PendingItem;
use schoolhub_models::notes::Note;
use schoolhub_models::scheduled_subjects::ScheduledSubject;
use schoolhub_models::value_types::normalize_email;
use schoolhub_models::{
    ApprovalStatus, NoteId, ScheduledSubjectId, TeacherAnnouncementId, User, UserId,
};

use crate::modules::users::UserService;
use crate::state::AppState;
use crate::utils::email_templates;
use crate::utils::notifier::dispatch;

use super::{Decision, Moderatable, ModerationError};

/// A teacher account, keyed by email.
#[derive(Debug, Clone)]
pub struct TeacherAccount(pub User);

/// A student account awaiting admission.
#[derive(Debug, Clone)]
pub struct StudentAccount(pub User);

impl Moderatable for TeacherAccount {
    type Key = String;

    const ENTITY: &'static str = "teacher";
    const LABEL: &'static str = "Pending teacher";

    async fn decide(
        conn: &mut PgConnection,
        email: &String,
        admin: UserId,
        decision: &Decision,
    ) -> Result<Self, ModerationError> {
        let (approved_by, approved_at) = decision.approval_stamp(admin, Utc::now());
        sqlx::query_as::<_, User>(
            r#"UPDATE users
               SET teacher_status = $2, rejection_reason = $3, approved_by = $4, approved_at = $5,
                   updated_at = NOW()
               WHERE email = $1 AND role = 'teacher' AND teacher_status = 'pending'
               RETURNING *"#,
        )
        .bind(normalize_email(email))
        .bind(decision.status())
        .bind(decision.reason())
        .bind(approved_by)
        .bind(approved_at)
        .fetch_optional(conn)
        .await?
        .map(TeacherAccount)
        .ok_or(ModerationError::NotPending(Self::LABEL))
    }

    async fn pending(db: &PgPool) -> Result<Vec<PendingItem>, ModerationError> {
        Ok(sqlx::query_as::<_, PendingItem>(
            r#"SELECT id, full_name AS title, email AS submitted_by, created_at
               FROM users WHERE role = 'teacher' AND teacher_status = 'pending'
               ORDER BY created_at"#,
        )
        .fetch_all(db)
        .await?)
    }

    fn id(&self) -> Uuid {
        self.0.id.into_inner()
    }

    fn status(&self) -> ApprovalStatus {
        self.0.teacher_status.unwrap_or(ApprovalStatus::Pending)
    }

    fn rejection_reason(&self) -> Option<&str> {
        self.0.rejection_reason.as_deref()
    }

    async fn after_decision(&self, state: &AppState) {
        let teacher = &self.0;
        let email = match self.rejection_reason() {
            None => email_templates::teacher_approved(
                &teacher.full_name,
                &state.email_config.frontend_url,
            ),
            Some(reason) => email_templates::teacher_rejected(&teacher.full_name, reason),
        };
        dispatch(state.notifier.as_ref(), &teacher.email, email).await;
    }
}

impl Moderatable for StudentAccount {
    type Key = UserId;

    const ENTITY: &'static str = "student";
    const LABEL: &'static str = "Pending student";

    /// Status transition only. Admission side effects (role number,
    /// credentials, parent account) are applied by the approval workflow in
    /// the same transaction.
    async fn decide(
        conn: &mut PgConnection,
        id: &UserId,
        admin: UserId,
        decision: &Decision,
    ) -> Result<Self, ModerationError> {
        let (approved_by, approved_at) = decision.approval_stamp(admin, Utc::now());
        sqlx::query_as::<_, User>(
            r#"UPDATE users
               SET student_status = $2, rejection_reason = $3, approved_by = $4, approved_at = $5,
                   is_email_verified = is_email_verified OR $6,
                   updated_at = NOW()
               WHERE id = $1 AND role = 'student' AND student_status = 'pending'
               RETURNING *"#,
        )
        .bind(id)
        .bind(decision.status())
        .bind(decision.reason())
        .bind(approved_by)
        .bind(approved_at)
        .bind(matches!(decision, Decision::Approve))
        .fetch_optional(conn)
        .await?
        .map(StudentAccount)
        .ok_or(ModerationError::NotPending(Self::LABEL))
    }

    async fn pending(db: &PgPool) -> Result<Vec<PendingItem>, ModerationError> {
        Ok(sqlx::query_as::<_, PendingItem>(
            r#"SELECT id, full_name AS title, email AS submitted_by, created_at
               FROM users WHERE role = 'student' AND student_status = 'pending'
               ORDER BY created_at"#,
        )
        .fetch_all(db)
        .await?)
    }

    fn id(&self) -> Uuid {
        self.0.id.into_inner()
    }

    fn status(&self) -> ApprovalStatus {
        self.0.student_status.unwrap_or(ApprovalStatus::Pending)
    }

    fn rejection_reason(&self) -> Option<&str> {
        self.0.rejection_reason.as_deref()
    }
}

impl Moderatable for Note {
    type Key = NoteId;

    const ENTITY: &'static str = "notes";
    const LABEL: &'static str = "Pending note";

    async fn decide(
        conn: &mut PgConnection,
        id: &NoteId,
        admin: UserId,
        decision: &Decision,
    ) -> Result<Self, ModerationError> {
        let (approved_by, approved_at) = decision.approval_stamp(admin, Utc::now());
        sqlx::query_as::<_, Note>(
            r#"UPDATE notes
               SET status = $2, rejection_reason = $3, approved_by = $4, approved_at = $5,
                   updated_at = NOW()
               WHERE id = $1 AND status = 'pending'
               RETURNING *"#,
        )
        .bind(id)
        .bind(decision.status())
        .bind(decision.reason())
        .bind(approved_by)
        .bind(approved_at)
        .fetch_optional(conn)
        .await?
        .ok_or(ModerationError::NotPending(Self::LABEL))
    }

    async fn pending(db: &PgPool) -> Result<Vec<PendingItem>, ModerationError> {
        Ok(sqlx::query_as::<_, PendingItem>(
            r#"SELECT n.id, n.title, u.full_name AS submitted_by, n.created_at
               FROM notes n
               JOIN users u ON u.id = n.uploaded_by
               WHERE n.status = 'pending'
               ORDER BY n.created_at"#,
        )
        .fetch_all(db)
        .await?)
    }

    fn id(&self) -> Uuid {
        self.id.into_inner()
    }

    fn status(&self) -> ApprovalStatus {
        self.status
    }

    fn rejection_reason(&self) -> Option<&str> {
        self.rejection_reason.as_deref()
    }

    async fn after_decision(&self, state: &AppState) {
        match UserService::find_by_id(&state.db, self.uploaded_by).await {
            Ok(Some(teacher)) => {
                let email = email_templates::note_decision(
                    &teacher.full_name,
                    &self.title,
                    self.rejection_reason.as_deref(),
                );
                dispatch(state.notifier.as_ref(), &teacher.email, email).await;
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, note.id = %self.id, "Could not load note author"),
        }
    }
}

impl Moderatable for ScheduledSubject {
    type Key = ScheduledSubjectId;

    const ENTITY: &'static str = "scheduled-subjects";
    const LABEL: &'static str = "Pending scheduled subject";

    async fn decide(
        conn: &mut PgConnection,
        id: &ScheduledSubjectId,
        admin: UserId,
        decision: &Decision,
    ) -> Result<Self, ModerationError> {
        let (approved_by, approved_at) = decision.approval_stamp(admin, Utc::now());
        sqlx::query_as::<_, ScheduledSubject>(
            r#"UPDATE scheduled_subjects
               SET status = $2, rejection_reason = $3, approved_by = $4, approved_at = $5,
                   updated_at = NOW()
               WHERE id = $1 AND status = 'pending'
               RETURNING *"#,
        )
        .bind(id)
        .bind(decision.status())
        .bind(decision.reason())
        .bind(approved_by)
        .bind(approved_at)
        .fetch_optional(conn)
        .await?
        .ok_or(ModerationError::NotPending(Self::LABEL))
    }

    async fn pending(db: &PgPool) -> Result<Vec<PendingItem>, ModerationError> {
        Ok(sqlx::query_as::<_, PendingItem>(
            r#"SELECT ss.id, s.subject_name || ' (Class ' || c.class_name || ')' AS title,
                      u.full_name AS submitted_by, ss.requested_at AS created_at
               FROM scheduled_subjects ss
               JOIN subjects s ON s.id = ss.subject_id
               JOIN classes c ON c.id = ss.class_id
               JOIN users u ON u.id = ss.teacher_id
               WHERE ss.status = 'pending'
               ORDER BY ss.requested_at"#,
        )
        .fetch_all(db)
        .await?)
    }

    fn id(&self) -> Uuid {
        self.id.into_inner()
    }

    fn status(&self) -> ApprovalStatus {
        self.status
    }

    fn rejection_reason(&self) -> Option<&str> {
        self.rejection_reason.as_deref()
    }
}

impl Moderatable for TeacherAnnouncement {
    type Key = TeacherAnnouncementId;

    const ENTITY: &'static str = "announcements";
    const LABEL: &'static str = "Pending announcement";

    async fn decide(
        conn: &mut PgConnection,
        id: &TeacherAnnouncementId,
        admin: UserId,
        decision: &Decision,
    ) -> Result<Self, ModerationError> {
        let (approved_by, approved_at) = decision.approval_stamp(admin, Utc::now());
        sqlx::query_as::<_, TeacherAnnouncement>(
            r#"UPDATE teacher_announcements
               SET status = $2, rejection_reason = $3, approved_by = $4, approved_at = $5,
                   updated_at = NOW()
               WHERE id = $1 AND status = 'pending'
               RETURNING *"#,
        )
        .bind(id)
        .bind(decision.status())
        .bind(decision.reason())
        .bind(approved_by)
        .bind(approved_at)
        .fetch_optional(conn)
        .await?
        .ok_or(ModerationError::NotPending(Self::LABEL))
    }

    async fn pending(db: &PgPool) -> Result<Vec<PendingItem>, ModerationError> {
        Ok(sqlx::query_as::<_, PendingItem>(
            r#"SELECT ta.id, ta.title, u.full_name AS submitted_by, ta.created_at
               FROM teacher_announcements ta
               JOIN users u ON u.id = ta.created_by
               WHERE ta.status = 'pending'
               ORDER BY ta.created_at"#,
        )
        .fetch_all(db)
        .await?)
    }

    fn id(&self) -> Uuid {
        self.id.into_inner()
    }

    fn status(&self) -> ApprovalStatus {
        self.status
    }

    fn rejection_reason(&self) -> Option<&str> {
        self.rejection_reason.as_deref()
    }
}
