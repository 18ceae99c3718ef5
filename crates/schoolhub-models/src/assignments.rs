//! Assignments and student submissions.
//!
//! Assignment and submission files are small (at most a few MiB) and live in
//! the row itself. Listing queries never select the `file_data` column.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::ids::{AssignmentId, ClassId, SubjectId, SubmissionId, UserId};
use crate::status::{AssignmentStatus, SubmissionStatus};

/// Assignment metadata without the file bytes.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentView {
    pub id: AssignmentId,
    pub title: String,
    pub description: Option<String>,
    pub subject_id: SubjectId,
    pub subject_name: String,
    pub class_id: ClassId,
    pub class_name: String,
    pub uploaded_by: UserId,
    pub file_name: String,
    pub file_mime_type: String,
    pub file_size: i64,
    pub due_date: DateTime<Utc>,
    pub status: AssignmentStatus,
    pub created_at: DateTime<Utc>,
}

/// File content of an assignment or submission, for download.
#[derive(Debug, Clone, FromRow)]
pub struct StoredFile {
    pub file_name: String,
    pub file_mime_type: String,
    pub file_data: Vec<u8>,
}

/// Text fields of the multipart assignment upload.
#[derive(Debug, Default, Validate)]
pub struct CreateAssignmentForm {
    #[validate(length(min = 1, max = 255, message = "Title is required"))]
    pub title: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(length(min = 1, message = "Subject name is required"))]
    pub subject_name: String,
    #[validate(length(min = 1, message = "Class name is required"))]
    pub class_name: String,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: SubmissionId,
    pub assignment_id: AssignmentId,
    pub student_id: UserId,
    pub content: Option<String>,
    pub file_name: Option<String>,
    pub file_mime_type: Option<String>,
    pub status: SubmissionStatus,
    pub grade: Option<f64>,
    pub remark: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAssignmentResponse {
    pub message: String,
    pub submission: Submission,
    pub attendance_updated: bool,
}

/// A student's submission joined with its assignment.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedAssignment {
    pub submission_id: SubmissionId,
    pub assignment_id: AssignmentId,
    pub title: String,
    pub subject_name: String,
    pub due_date: DateTime<Utc>,
    pub status: SubmissionStatus,
    pub grade: Option<f64>,
    pub remark: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

/// Submission as seen by the teacher who set the assignment.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionView {
    pub id: SubmissionId,
    pub assignment_id: AssignmentId,
    pub student_id: UserId,
    pub student_name: String,
    pub role_number: Option<String>,
    pub file_name: Option<String>,
    pub status: SubmissionStatus,
    pub grade: Option<f64>,
    pub remark: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GradeSubmissionDto {
    #[validate(range(min = 0.0, max = 100.0, message = "Grade must be between 0 and 100"))]
    pub grade: f64,
    #[validate(length(max = 2000))]
    pub remark: Option<String>,
}

/// A dated item on a student's calendar.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeadlineItem {
    pub id: uuid::Uuid,
    /// `test` or `assignment`
    pub kind: String,
    pub title: String,
    pub subject_name: String,
    pub due_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingDeadlines {
    pub today: Vec<DeadlineItem>,
    pub tomorrow: Vec<DeadlineItem>,
    pub day_after_tomorrow: Vec<DeadlineItem>,
}

/// Status a submission made at `now` gets for an assignment due at `due_date`.
pub fn submission_status_at(now: DateTime<Utc>, due_date: DateTime<Utc>) -> SubmissionStatus {
    if now > due_date {
        SubmissionStatus::Late
    } else {
        SubmissionStatus::Submitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_on_time_and_late() {
        let due = Utc::now();
        assert_eq!(
            submission_status_at(due - Duration::minutes(1), due),
            SubmissionStatus::Submitted
        );
        assert_eq!(submission_status_at(due, due), SubmissionStatus::Submitted);
        assert_eq!(
            submission_status_at(due + Duration::seconds(1), due),
            SubmissionStatus::Late
        );
    }

    #[test]
    fn test_grade_range() {
        let dto = GradeSubmissionDto {
            grade: 101.0,
            remark: None,
        };
        assert!(dto.validate().is_err());
        let dto = GradeSubmissionDto {
            grade: 88.5,
            remark: Some("Good work".to_string()),
        };
        assert!(dto.validate().is_ok());
    }
}
