use anyhow::{Context, anyhow};
use sqlx::PgPool;
use tracing::{info, instrument};

use schoolhub_auth::UserRole;
use schoolhub_core::AppError;
use schoolhub_models::announcements::{
    Announcement, AnnouncementFeed, CreateAnnouncementDto, CreateTeacherAnnouncementDto,
    TeacherAnnouncement, TeacherAnnouncementView, UpdateTeacherAnnouncementDto,
    audience_for_role, resolve_audiences,
};
use schoolhub_models::{
    AnnouncementId, ApprovalStatus, ClassId, TeacherAnnouncementId, TeacherAnnouncementType,
    UserId,
};

use crate::audit_event;
use crate::modules::classes::ClassService;

const TEACHER_VIEW_SELECT: &str = r#"
    SELECT ta.id, ta.title, ta.description, ta.announcement_type, ta.class_id, c.class_name,
           ta.subject_id, s.subject_name, ta.created_by, u.full_name AS teacher_name, ta.status,
           ta.rejection_reason, ta.event_date, ta.event_location, ta.created_at
    FROM teacher_announcements ta
    JOIN users u ON u.id = ta.created_by
    LEFT JOIN classes c ON c.id = ta.class_id
    LEFT JOIN subjects s ON s.id = ta.subject_id
"#;

/// Status of a teacher announcement after its author edits it. Approved
/// events go back to review; rejected announcements cannot be edited.
pub fn status_after_edit(
    kind: TeacherAnnouncementType,
    current: ApprovalStatus,
) -> Result<ApprovalStatus, &'static str> {
    match (kind, current) {
        (_, ApprovalStatus::Rejected) => Err("Rejected announcements cannot be edited"),
        (TeacherAnnouncementType::Event, _) => Ok(ApprovalStatus::Pending),
        (TeacherAnnouncementType::Student, status) => Ok(status),
    }
}

pub struct AnnouncementService;

impl AnnouncementService {
    /// Stores one broadcast row per resolved audience.
    #[instrument(skip(db, dto))]
    pub async fn broadcast(
        db: &PgPool,
        admin_id: UserId,
        dto: CreateAnnouncementDto,
    ) -> Result<Vec<Announcement>, AppError> {
        let audiences = resolve_audiences(&dto.target_audience);
        let mut tx = db
            .begin()
            .await
            .context("Failed to begin transaction")
            .map_err(AppError::database)?;

        let mut created = Vec::with_capacity(audiences.len());
        for audience in audiences {
            let announcement = sqlx::query_as::<_, Announcement>(
                r#"INSERT INTO announcements (title, message, target_audience, created_by)
                   VALUES ($1, $2, $3, $4)
                   RETURNING *"#,
            )
            .bind(dto.title.trim())
            .bind(dto.message.trim())
            .bind(audience)
            .bind(admin_id)
            .fetch_one(&mut *tx)
            .await
            .context("Failed to create announcement")
            .map_err(AppError::database)?;
            created.push(announcement);
        }

        tx.commit()
            .await
            .context("Failed to commit announcements")
            .map_err(AppError::database)?;

        info!(count = created.len(), "Announcement broadcast");
        Ok(created)
    }

    #[instrument(skip(db))]
    pub async fn list_all(db: &PgPool) -> Result<Vec<Announcement>, AppError> {
        sqlx::query_as::<_, Announcement>("SELECT * FROM announcements ORDER BY created_at DESC")
            .fetch_all(db)
            .await
            .context("Failed to fetch announcements")
            .map_err(AppError::database)
    }

    /// Broadcasts addressed to `all` or to the role's audience.
    #[instrument(skip(db))]
    pub async fn for_role(db: &PgPool, role: UserRole) -> Result<Vec<Announcement>, AppError> {
        sqlx::query_as::<_, Announcement>(
            r#"SELECT * FROM announcements
               WHERE target_audience = 'all' OR target_audience = $1
               ORDER BY created_at DESC"#,
        )
        .bind(audience_for_role(role))
        .fetch_all(db)
        .await
        .context("Failed to fetch announcements")
        .map_err(AppError::database)
    }

    #[instrument(skip(db))]
    pub async fn delete_broadcast(
        db: &PgPool,
        id: AnnouncementId,
        admin_id: UserId,
    ) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM announcements WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .context("Failed to delete announcement")
            .map_err(AppError::database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Announcement not found")));
        }
        audit_event!("delete", "announcement", announcement.id = %id, admin.id = %admin_id);
        Ok(())
    }

    /// Student announcements are published at once; events wait for review.
    #[instrument(skip(db, dto))]
    pub async fn create_teacher_announcement(
        db: &PgPool,
        teacher_id: UserId,
        dto: CreateTeacherAnnouncementDto,
    ) -> Result<TeacherAnnouncement, AppError> {
        if let Some(class_id) = dto.class_id {
            let class = ClassService::get_class(db, class_id).await?;
            if let Some(subject_id) = dto.subject_id {
                let subject = ClassService::get_subject(db, subject_id).await?;
                if subject.class_id != class.id {
                    return Err(AppError::bad_request(anyhow!(
                        "Subject does not belong to the selected class"
                    )));
                }
            }
        }

        let announcement = sqlx::query_as::<_, TeacherAnnouncement>(
            r#"INSERT INTO teacher_announcements
                   (title, description, announcement_type, class_id, subject_id, created_by,
                    status, event_date, event_location)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
               RETURNING *"#,
        )
        .bind(dto.title.trim())
        .bind(dto.description.trim())
        .bind(dto.announcement_type)
        .bind(dto.class_id)
        .bind(dto.subject_id)
        .bind(teacher_id)
        .bind(dto.announcement_type.initial_status())
        .bind(dto.event_date)
        .bind(&dto.event_location)
        .fetch_one(db)
        .await
        .context("Failed to create teacher announcement")
        .map_err(AppError::database)?;

        info!(
            announcement.id = %announcement.id,
            kind = %announcement.announcement_type,
            status = %announcement.status,
            "Teacher announcement created"
        );
        Ok(announcement)
    }

    #[instrument(skip(db))]
    pub async fn teacher_announcements(
        db: &PgPool,
        teacher_id: UserId,
    ) -> Result<Vec<TeacherAnnouncementView>, AppError> {
        sqlx::query_as::<_, TeacherAnnouncementView>(&format!(
            "{TEACHER_VIEW_SELECT} WHERE ta.created_by = $1 ORDER BY ta.created_at DESC"
        ))
        .bind(teacher_id)
        .fetch_all(db)
        .await
        .context("Failed to fetch teacher announcements")
        .map_err(AppError::database)
    }

    async fn owned(
        db: &PgPool,
        teacher_id: UserId,
        id: TeacherAnnouncementId,
    ) -> Result<TeacherAnnouncement, AppError> {
        let announcement =
            sqlx::query_as::<_, TeacherAnnouncement>("SELECT * FROM teacher_announcements WHERE id = $1")
                .bind(id)
                .fetch_optional(db)
                .await
                .context("Failed to fetch teacher announcement")
                .map_err(AppError::database)?
                .ok_or_else(|| AppError::not_found(anyhow!("Announcement not found")))?;

        if announcement.created_by != teacher_id {
            return Err(AppError::forbidden("You can only manage your own announcements"));
        }
        Ok(announcement)
    }

    #[instrument(skip(db, dto))]
    pub async fn update_teacher_announcement(
        db: &PgPool,
        teacher_id: UserId,
        id: TeacherAnnouncementId,
        dto: UpdateTeacherAnnouncementDto,
    ) -> Result<TeacherAnnouncement, AppError> {
        let current = Self::owned(db, teacher_id, id).await?;
        let status = status_after_edit(current.announcement_type, current.status)
            .map_err(|message| AppError::bad_request(anyhow!(message)))?;
        let back_to_review = status != current.status;

        let updated = sqlx::query_as::<_, TeacherAnnouncement>(
            r#"UPDATE teacher_announcements
               SET title = COALESCE($2, title),
                   description = COALESCE($3, description),
                   event_date = COALESCE($4, event_date),
                   event_location = COALESCE($5, event_location),
                   status = $6,
                   approved_by = CASE WHEN $7 THEN NULL ELSE approved_by END,
                   approved_at = CASE WHEN $7 THEN NULL ELSE approved_at END,
                   updated_at = NOW()
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(dto.title.as_deref().map(str::trim))
        .bind(dto.description.as_deref().map(str::trim))
        .bind(dto.event_date)
        .bind(&dto.event_location)
        .bind(status)
        .bind(back_to_review)
        .fetch_one(db)
        .await
        .context("Failed to update teacher announcement")
        .map_err(AppError::database)?;

        if back_to_review {
            info!(announcement.id = %id, "Edited event returned to review");
        }
        Ok(updated)
    }

    #[instrument(skip(db))]
    pub async fn delete_teacher_announcement(
        db: &PgPool,
        teacher_id: UserId,
        id: TeacherAnnouncementId,
    ) -> Result<(), AppError> {
        Self::owned(db, teacher_id, id).await?;
        sqlx::query("DELETE FROM teacher_announcements WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .context("Failed to delete teacher announcement")
            .map_err(AppError::database)?;

        audit_event!("delete", "teacher_announcement", announcement.id = %id, teacher.id = %teacher_id);
        Ok(())
    }

    async fn approved_events(db: &PgPool) -> Result<Vec<TeacherAnnouncementView>, AppError> {
        sqlx::query_as::<_, TeacherAnnouncementView>(&format!(
            r#"{TEACHER_VIEW_SELECT}
               WHERE ta.announcement_type = 'event' AND ta.status = 'approved'
               ORDER BY ta.event_date NULLS LAST, ta.created_at DESC"#
        ))
        .fetch_all(db)
        .await
        .context("Failed to fetch events")
        .map_err(AppError::database)
    }

    /// Broadcasts for students, approved class announcements and events.
    #[instrument(skip(db))]
    pub async fn student_feed(
        db: &PgPool,
        class_id: Option<ClassId>,
    ) -> Result<AnnouncementFeed, AppError> {
        let class_announcements = match class_id {
            Some(class_id) => {
                sqlx::query_as::<_, TeacherAnnouncementView>(&format!(
                    r#"{TEACHER_VIEW_SELECT}
                       WHERE ta.announcement_type = 'student' AND ta.status = 'approved'
                         AND ta.class_id = $1
                       ORDER BY ta.created_at DESC"#
                ))
                .bind(class_id)
                .fetch_all(db)
                .await
                .context("Failed to fetch class announcements")
                .map_err(AppError::database)?
            }
            None => Vec::new(),
        };

        Ok(AnnouncementFeed {
            announcements: Self::for_role(db, UserRole::Student).await?,
            class_announcements,
            events: Self::approved_events(db).await?,
        })
    }

    /// Broadcasts for parents and approved events.
    #[instrument(skip(db))]
    pub async fn parent_feed(db: &PgPool) -> Result<AnnouncementFeed, AppError> {
        Ok(AnnouncementFeed {
            announcements: Self::for_role(db, UserRole::Parent).await?,
            class_announcements: Vec::new(),
            events: Self::approved_events(db).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edited_event_goes_back_to_review() {
        assert_eq!(
            status_after_edit(TeacherAnnouncementType::Event, ApprovalStatus::Approved),
            Ok(ApprovalStatus::Pending)
        );
        assert_eq!(
            status_after_edit(TeacherAnnouncementType::Event, ApprovalStatus::Pending),
            Ok(ApprovalStatus::Pending)
        );
    }

    #[test]
    fn test_student_announcement_keeps_status() {
        assert_eq!(
            status_after_edit(TeacherAnnouncementType::Student, ApprovalStatus::Approved),
            Ok(ApprovalStatus::Approved)
        );
    }

    #[test]
    fn test_rejected_cannot_be_edited() {
        assert!(status_after_edit(TeacherAnnouncementType::Event, ApprovalStatus::Rejected).is_err());
    }
}
