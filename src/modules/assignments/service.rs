use anyhow::{Context, anyhow};
use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};
use sqlx::PgPool;
use tracing::{info, instrument};

use schoolhub_config::SchedulerConfig;
use schoolhub_core::{AppError, UploadPolicy};
use schoolhub_models::assignments::{
    AssignmentView, CreateAssignmentForm, DeadlineItem, GradeSubmissionDto, StoredFile,
    SubmitAssignmentResponse, Submission, SubmissionView, SubmittedAssignment, UpcomingDeadlines,
    submission_status_at,
};
use schoolhub_models::{AssignmentId, ClassId, SubmissionId, SubmissionStatus, User, UserId};

use crate::audit_event;
use crate::download::FileDownload;
use crate::modules::attendance::AttendanceService;
use crate::modules::classes::ClassService;
use crate::multipart::UploadedFile;
use crate::scheduler::{school_date_at, school_offset};
use crate::state::AppState;

const ASSIGNMENT_VIEW_SELECT: &str = r#"
    SELECT a.id, a.title, a.description, a.subject_id, s.subject_name, a.class_id, c.class_name,
           a.uploaded_by, a.file_name, a.file_mime_type, a.file_size, a.due_date, a.status,
           a.created_at
    FROM assignments a
    JOIN subjects s ON s.id = a.subject_id
    JOIN classes c ON c.id = a.class_id
"#;

const SUBMISSION_COLUMNS: &str = "id, assignment_id, student_id, content, file_name, \
    file_mime_type, status, grade, remark, submitted_at";

/// Assignment columns needed to accept a submission.
#[derive(Debug, sqlx::FromRow)]
struct AssignmentTarget {
    subject_id: schoolhub_models::SubjectId,
    class_id: ClassId,
    due_date: DateTime<Utc>,
}

/// Class of a student, 400 when they have none.
pub fn class_of(student: &User) -> Result<ClassId, AppError> {
    student
        .class_id
        .ok_or_else(|| AppError::bad_request(anyhow!("Student is not assigned to any class")))
}

pub struct AssignmentService;

impl AssignmentService {
    #[instrument(skip(state, form, file), fields(file_name = %file.file_name))]
    pub async fn create(
        state: &AppState,
        teacher_id: UserId,
        form: CreateAssignmentForm,
        file: UploadedFile,
    ) -> Result<AssignmentView, AppError> {
        let due_date = form
            .due_date
            .ok_or_else(|| AppError::bad_request(anyhow!("Due date is required")))?;
        UploadPolicy::documents(state.upload_config.assignment_max_bytes)
            .check(&file.content_type, file.len())
            .map_err(|e| e.into_app_error())?;

        let class = ClassService::get_class_by_name(&state.db, &form.class_name).await?;
        let subject =
            ClassService::find_subject_in_class(&state.db, class.id, &form.subject_name).await?;

        let id: AssignmentId = sqlx::query_scalar(
            r#"INSERT INTO assignments
                   (title, description, subject_id, class_id, uploaded_by,
                    file_data, file_name, file_mime_type, file_size, due_date)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
               RETURNING id"#,
        )
        .bind(form.title.trim())
        .bind(&form.description)
        .bind(subject.id)
        .bind(class.id)
        .bind(teacher_id)
        .bind(file.bytes.as_ref())
        .bind(&file.file_name)
        .bind(&file.content_type)
        .bind(file.len() as i64)
        .bind(due_date)
        .fetch_one(&state.db)
        .await
        .context("Failed to create assignment")
        .map_err(AppError::database)?;

        info!(assignment.id = %id, class = %class.class_name, "Assignment uploaded");
        Self::get_view(&state.db, id).await
    }

    pub async fn get_view(db: &PgPool, id: AssignmentId) -> Result<AssignmentView, AppError> {
        sqlx::query_as::<_, AssignmentView>(&format!("{ASSIGNMENT_VIEW_SELECT} WHERE a.id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await
            .context("Failed to fetch assignment")
            .map_err(AppError::database)?
            .ok_or_else(|| AppError::not_found(anyhow!("Assignment not found")))
    }

    #[instrument(skip(db))]
    pub async fn teacher_assignments(
        db: &PgPool,
        teacher_id: UserId,
    ) -> Result<Vec<AssignmentView>, AppError> {
        sqlx::query_as::<_, AssignmentView>(&format!(
            "{ASSIGNMENT_VIEW_SELECT} WHERE a.uploaded_by = $1 ORDER BY a.created_at DESC"
        ))
        .bind(teacher_id)
        .fetch_all(db)
        .await
        .context("Failed to fetch teacher assignments")
        .map_err(AppError::database)
    }

    /// Active assignments of a class, nearest due date first.
    #[instrument(skip(db))]
    pub async fn class_assignments(
        db: &PgPool,
        class_id: ClassId,
    ) -> Result<Vec<AssignmentView>, AppError> {
        sqlx::query_as::<_, AssignmentView>(&format!(
            "{ASSIGNMENT_VIEW_SELECT} WHERE a.class_id = $1 AND a.status = 'active' ORDER BY a.due_date"
        ))
        .bind(class_id)
        .fetch_all(db)
        .await
        .context("Failed to fetch class assignments")
        .map_err(AppError::database)
    }

    /// Assignments of the student's class they have not submitted yet.
    #[instrument(skip(db, student), fields(student.id = %student.id))]
    pub async fn pending_for(db: &PgPool, student: &User) -> Result<Vec<AssignmentView>, AppError> {
        let class_id = class_of(student)?;
        sqlx::query_as::<_, AssignmentView>(&format!(
            r#"{ASSIGNMENT_VIEW_SELECT}
               WHERE a.class_id = $1
                 AND NOT EXISTS (
                     SELECT 1 FROM assignment_submissions sub
                     WHERE sub.assignment_id = a.id AND sub.student_id = $2
                 )
               ORDER BY a.due_date"#
        ))
        .bind(class_id)
        .bind(student.id)
        .fetch_all(db)
        .await
        .context("Failed to fetch pending assignments")
        .map_err(AppError::database)
    }

    #[instrument(skip(db))]
    pub async fn submitted_by(
        db: &PgPool,
        student_id: UserId,
    ) -> Result<Vec<SubmittedAssignment>, AppError> {
        sqlx::query_as::<_, SubmittedAssignment>(
            r#"SELECT sub.id AS submission_id, a.id AS assignment_id, a.title, s.subject_name,
                      a.due_date, sub.status, sub.grade, sub.remark, sub.submitted_at
               FROM assignment_submissions sub
               JOIN assignments a ON a.id = sub.assignment_id
               JOIN subjects s ON s.id = a.subject_id
               WHERE sub.student_id = $1
               ORDER BY sub.submitted_at DESC"#,
        )
        .bind(student_id)
        .fetch_all(db)
        .await
        .context("Failed to fetch submitted assignments")
        .map_err(AppError::database)
    }

    async fn stored_file(db: &PgPool, id: AssignmentId) -> Result<(StoredFile, ClassId, UserId), AppError> {
        let row: Option<(String, String, Vec<u8>, ClassId, UserId)> = sqlx::query_as(
            r#"SELECT file_name, file_mime_type, file_data, class_id, uploaded_by
               FROM assignments WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(db)
        .await
        .context("Failed to fetch assignment file")
        .map_err(AppError::database)?;

        let (file_name, file_mime_type, file_data, class_id, uploaded_by) =
            row.ok_or_else(|| AppError::not_found(anyhow!("Assignment not found")))?;
        Ok((
            StoredFile {
                file_name,
                file_mime_type,
                file_data,
            },
            class_id,
            uploaded_by,
        ))
    }

    /// Assignment file for a student of the assignment's class.
    #[instrument(skip(db, student), fields(student.id = %student.id))]
    pub async fn download_for_student(
        db: &PgPool,
        student: &User,
        id: AssignmentId,
    ) -> Result<FileDownload, AppError> {
        let (file, class_id, _) = Self::stored_file(db, id).await?;
        if student.class_id != Some(class_id) {
            return Err(AppError::forbidden("Access denied"));
        }
        Ok(FileDownload::new(file.file_name, file.file_mime_type, file.file_data))
    }

    /// Assignment file for the teacher who uploaded it.
    #[instrument(skip(db))]
    pub async fn download_for_teacher(
        db: &PgPool,
        teacher_id: UserId,
        id: AssignmentId,
    ) -> Result<FileDownload, AppError> {
        let (file, _, uploaded_by) = Self::stored_file(db, id).await?;
        if uploaded_by != teacher_id {
            return Err(AppError::forbidden("You can only download your own assignments"));
        }
        Ok(FileDownload::new(file.file_name, file.file_mime_type, file.file_data))
    }

    /// Stores a submission. An on-time submission also marks the student
    /// present for the assignment's subject today; a late one leaves
    /// attendance as it is.
    #[instrument(skip(state, student, file, content), fields(student.id = %student.id))]
    pub async fn submit(
        state: &AppState,
        student: &User,
        assignment_id: AssignmentId,
        file: UploadedFile,
        content: Option<String>,
    ) -> Result<SubmitAssignmentResponse, AppError> {
        UploadPolicy::any(state.upload_config.assignment_max_bytes)
            .check(&file.content_type, file.len())
            .map_err(|e| e.into_app_error())?;

        let target = sqlx::query_as::<_, AssignmentTarget>(
            "SELECT subject_id, class_id, due_date FROM assignments WHERE id = $1",
        )
        .bind(assignment_id)
        .fetch_optional(&state.db)
        .await
        .context("Failed to fetch assignment")
        .map_err(AppError::database)?
        .ok_or_else(|| AppError::not_found(anyhow!("Assignment not found")))?;

        if student.class_id != Some(target.class_id) {
            return Err(AppError::forbidden("This assignment is not for your class"));
        }

        let now = Utc::now();
        let status = submission_status_at(now, target.due_date);

        let mut tx = state
            .db
            .begin()
            .await
            .context("Failed to begin transaction")
            .map_err(AppError::database)?;

        let submission = sqlx::query_as::<_, Submission>(&format!(
            r#"INSERT INTO assignment_submissions
                   (assignment_id, student_id, content, file_data, file_name, file_mime_type,
                    status, submitted_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
               ON CONFLICT (assignment_id, student_id) DO NOTHING
               RETURNING {SUBMISSION_COLUMNS}"#
        ))
        .bind(assignment_id)
        .bind(student.id)
        .bind(content)
        .bind(file.bytes.as_ref())
        .bind(&file.file_name)
        .bind(&file.content_type)
        .bind(status)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to save submission")
        .map_err(AppError::database)?
        .ok_or_else(|| AppError::conflict(anyhow!("You have already submitted this assignment")))?;

        let attendance_updated = status == SubmissionStatus::Submitted;
        if attendance_updated {
            let today = school_date_at(now, &state.scheduler_config);
            AttendanceService::mark_present(
                &mut tx,
                student.id,
                target.subject_id,
                target.class_id,
                today,
            )
            .await?;
        } else {
            info!(assignment.id = %assignment_id, "Late submission, attendance unchanged");
        }

        tx.commit()
            .await
            .context("Failed to commit submission")
            .map_err(AppError::database)?;

        let message = if attendance_updated {
            "Assignment submitted successfully and attendance marked present"
        } else {
            "Assignment submitted late; attendance not updated"
        };

        Ok(SubmitAssignmentResponse {
            message: message.to_string(),
            submission,
            attendance_updated,
        })
    }

    async fn ensure_owner(
        db: &PgPool,
        teacher_id: UserId,
        assignment_id: AssignmentId,
    ) -> Result<(), AppError> {
        let owner: Option<UserId> =
            sqlx::query_scalar("SELECT uploaded_by FROM assignments WHERE id = $1")
                .bind(assignment_id)
                .fetch_optional(db)
                .await
                .context("Failed to fetch assignment owner")
                .map_err(AppError::database)?;

        match owner {
            None => Err(AppError::not_found(anyhow!("Assignment not found"))),
            Some(owner) if owner != teacher_id => Err(AppError::forbidden(
                "You can only manage submissions of your own assignments",
            )),
            Some(_) => Ok(()),
        }
    }

    #[instrument(skip(db))]
    pub async fn submissions_of(
        db: &PgPool,
        teacher_id: UserId,
        assignment_id: AssignmentId,
    ) -> Result<Vec<SubmissionView>, AppError> {
        Self::ensure_owner(db, teacher_id, assignment_id).await?;
        sqlx::query_as::<_, SubmissionView>(
            r#"SELECT sub.id, sub.assignment_id, sub.student_id, u.full_name AS student_name,
                      u.role_number, sub.file_name, sub.status, sub.grade, sub.remark,
                      sub.submitted_at
               FROM assignment_submissions sub
               JOIN users u ON u.id = sub.student_id
               WHERE sub.assignment_id = $1
               ORDER BY sub.submitted_at"#,
        )
        .bind(assignment_id)
        .fetch_all(db)
        .await
        .context("Failed to fetch submissions")
        .map_err(AppError::database)
    }

    /// Grades a submission of one of the teacher's assignments.
    #[instrument(skip(db, dto))]
    pub async fn grade(
        db: &PgPool,
        teacher_id: UserId,
        submission_id: SubmissionId,
        dto: GradeSubmissionDto,
    ) -> Result<Submission, AppError> {
        let assignment_id: AssignmentId =
            sqlx::query_scalar("SELECT assignment_id FROM assignment_submissions WHERE id = $1")
                .bind(submission_id)
                .fetch_optional(db)
                .await
                .context("Failed to fetch submission")
                .map_err(AppError::database)?
                .ok_or_else(|| AppError::not_found(anyhow!("Submission not found")))?;
        Self::ensure_owner(db, teacher_id, assignment_id).await?;

        let submission = sqlx::query_as::<_, Submission>(&format!(
            r#"UPDATE assignment_submissions
               SET grade = $2, remark = $3, status = 'graded'
               WHERE id = $1
               RETURNING {SUBMISSION_COLUMNS}"#
        ))
        .bind(submission_id)
        .bind(dto.grade)
        .bind(dto.remark.as_deref().map(str::trim))
        .fetch_one(db)
        .await
        .context("Failed to grade submission")
        .map_err(AppError::database)?;

        audit_event!(
            "submission.grade",
            "assignment_submission",
            submission.id = %submission_id,
            teacher.id = %teacher_id,
            grade = dto.grade
        );
        Ok(submission)
    }

    #[instrument(skip(db))]
    pub async fn download_submission(
        db: &PgPool,
        teacher_id: UserId,
        submission_id: SubmissionId,
    ) -> Result<FileDownload, AppError> {
        let row: Option<(AssignmentId, Option<String>, Option<String>, Option<Vec<u8>>)> =
            sqlx::query_as(
                r#"SELECT assignment_id, file_name, file_mime_type, file_data
                   FROM assignment_submissions WHERE id = $1"#,
            )
            .bind(submission_id)
            .fetch_optional(db)
            .await
            .context("Failed to fetch submission file")
            .map_err(AppError::database)?;

        let (assignment_id, file_name, mime, data) =
            row.ok_or_else(|| AppError::not_found(anyhow!("Submission not found")))?;
        Self::ensure_owner(db, teacher_id, assignment_id).await?;

        let data = data.ok_or_else(|| AppError::not_found(anyhow!("Submission has no file")))?;
        Ok(FileDownload::new(
            file_name.unwrap_or_else(|| "submission".to_string()),
            mime.unwrap_or_else(|| "application/octet-stream".to_string()),
            data,
        ))
    }

    /// Tests and assignments of the class falling on today, tomorrow or the
    /// day after, in the school's timezone.
    #[instrument(skip(db, config))]
    pub async fn upcoming_deadlines(
        db: &PgPool,
        class_id: ClassId,
        today: NaiveDate,
        config: &SchedulerConfig,
    ) -> Result<UpcomingDeadlines, AppError> {
        let offset = school_offset(config);
        let window_start = today
            .and_hms_opt(0, 0, 0)
            .and_then(|start| offset.from_local_datetime(&start).single())
            .map(|start| start.with_timezone(&Utc))
            .ok_or_else(|| AppError::internal_error("Invalid school date"))?;
        let window_end = window_start + chrono::Duration::days(3);

        let items = sqlx::query_as::<_, DeadlineItem>(
            r#"SELECT t.id, 'test' AS kind, t.title, s.subject_name, t.test_date AS due_at
               FROM tests t JOIN subjects s ON s.id = t.subject_id
               WHERE t.class_id = $1 AND t.test_date >= $2 AND t.test_date < $3
               UNION ALL
               SELECT a.id, 'assignment' AS kind, a.title, s.subject_name, a.due_date AS due_at
               FROM assignments a JOIN subjects s ON s.id = a.subject_id
               WHERE a.class_id = $1 AND a.due_date >= $2 AND a.due_date < $3
               ORDER BY due_at"#,
        )
        .bind(class_id)
        .bind(window_start)
        .bind(window_end)
        .fetch_all(db)
        .await
        .context("Failed to fetch upcoming deadlines")
        .map_err(AppError::database)?;

        Ok(bucket_deadlines(items, today, config))
    }
}

/// Sorts items into today, tomorrow and the day after by their local date.
/// Anything outside those three days is dropped.
pub fn bucket_deadlines(
    items: Vec<DeadlineItem>,
    today: NaiveDate,
    config: &SchedulerConfig,
) -> UpcomingDeadlines {
    let tomorrow = today.checked_add_days(Days::new(1));
    let day_after = today.checked_add_days(Days::new(2));

    let mut upcoming = UpcomingDeadlines::default();
    for item in items {
        let date = Some(school_date_at(item.due_at, config));
        if date == Some(today) {
            upcoming.today.push(item);
        } else if date == tomorrow {
            upcoming.tomorrow.push(item);
        } else if date == day_after {
            upcoming.day_after_tomorrow.push(item);
        }
    }
    upcoming
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(title: &str, due_at: &str) -> DeadlineItem {
        DeadlineItem {
            id: uuid::Uuid::new_v4(),
            kind: "assignment".to_string(),
            title: title.to_string(),
            subject_name: "Science".to_string(),
            due_at: DateTime::parse_from_rfc3339(due_at).unwrap().with_timezone(&Utc),
        }
    }

    #[test]
    fn test_bucket_by_school_date() {
        let config = SchedulerConfig::default();
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let upcoming = bucket_deadlines(
            vec![
                item("Late evening", "2026-10-19T17:00:00Z"),
                // 00:30 on the 20th at UTC+05:30
                item("Just after midnight", "2026-10-19T19:00:00Z"),
                item("Day after", "2026-10-21T08:00:00Z"),
                item("Next week", "2026-10-26T08:00:00Z"),
            ],
            today,
            &config,
        );
        assert_eq!(upcoming.today.len(), 1);
        assert_eq!(upcoming.tomorrow[0].title, "Just after midnight");
        assert_eq!(upcoming.day_after_tomorrow[0].title, "Day after");
    }
}
