use anyhow::{Context, anyhow};
use sqlx::PgPool;
use tracing::{info, instrument};

use schoolhub_core::AppError;
use schoolhub_db::is_unique_violation;
use schoolhub_models::scheduled_subjects::{
    RequestSubjectDto, ScheduledSubject, ScheduledSubjectView,
};
use schoolhub_models::{ApprovalStatus, UserId};

use crate::modules::classes::ClassService;

const VIEW_SELECT: &str = r#"
    SELECT ss.id, ss.teacher_id, u.full_name AS teacher_name, ss.class_id, c.class_name,
           ss.subject_id, s.subject_name, s.subject_code, ss.status, ss.rejection_reason,
           ss.requested_at, ss.approved_at
    FROM scheduled_subjects ss
    JOIN users u ON u.id = ss.teacher_id
    JOIN classes c ON c.id = ss.class_id
    JOIN subjects s ON s.id = ss.subject_id
"#;

pub struct ScheduledSubjectService;

impl ScheduledSubjectService {
    /// Records a pending request to teach a subject in a class.
    #[instrument(skip(db))]
    pub async fn request(
        db: &PgPool,
        teacher_id: UserId,
        dto: &RequestSubjectDto,
    ) -> Result<ScheduledSubject, AppError> {
        let class = ClassService::get_class(db, dto.class_id).await?;
        let subject = ClassService::get_subject(db, dto.subject_id).await?;
        if subject.class_id != class.id {
            return Err(AppError::bad_request(anyhow!(
                "Subject {} does not belong to class {}",
                subject.subject_name,
                class.class_name
            )));
        }

        let request = sqlx::query_as::<_, ScheduledSubject>(
            r#"INSERT INTO scheduled_subjects (teacher_id, class_id, subject_id)
               VALUES ($1, $2, $3)
               RETURNING *"#,
        )
        .bind(teacher_id)
        .bind(class.id)
        .bind(subject.id)
        .fetch_one(db)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::conflict(anyhow!("You have already requested this subject for this class"))
            } else {
                AppError::database(anyhow::Error::new(e).context("Failed to request subject"))
            }
        })?;

        info!(
            request.id = %request.id,
            class = %class.class_name,
            subject = %subject.subject_name,
            "Subject requested"
        );
        Ok(request)
    }

    /// The teacher's requests, optionally narrowed by status.
    #[instrument(skip(db))]
    pub async fn for_teacher(
        db: &PgPool,
        teacher_id: UserId,
        status: Option<ApprovalStatus>,
    ) -> Result<Vec<ScheduledSubjectView>, AppError> {
        sqlx::query_as::<_, ScheduledSubjectView>(&format!(
            r#"{VIEW_SELECT}
               WHERE ss.teacher_id = $1 AND ($2::approval_status IS NULL OR ss.status = $2)
               ORDER BY c.class_name, s.subject_name"#
        ))
        .bind(teacher_id)
        .bind(status)
        .fetch_all(db)
        .await
        .context("Failed to fetch scheduled subjects")
        .map_err(AppError::database)
    }

    #[instrument(skip(db))]
    pub async fn list_all(
        db: &PgPool,
        status: Option<ApprovalStatus>,
    ) -> Result<Vec<ScheduledSubjectView>, AppError> {
        sqlx::query_as::<_, ScheduledSubjectView>(&format!(
            r#"{VIEW_SELECT}
               WHERE ($1::approval_status IS NULL OR ss.status = $1)
               ORDER BY ss.requested_at DESC"#
        ))
        .bind(status)
        .fetch_all(db)
        .await
        .context("Failed to fetch scheduled subjects")
        .map_err(AppError::database)
    }
}
