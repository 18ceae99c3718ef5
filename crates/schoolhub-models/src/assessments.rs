//! Tests and their results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::attendance::round2;
use crate::ids::{ClassId, SubjectId, TestId, TestResultId, UserId};
use crate::status::TestStatus;

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Test {
    pub id: TestId,
    pub title: String,
    pub subject_id: SubjectId,
    pub class_id: ClassId,
    pub total_marks: f64,
    pub test_date: DateTime<Utc>,
    pub link: String,
    pub created_by: Option<UserId>,
    pub status: TestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A test joined with its subject and class names.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TestView {
    pub id: TestId,
    pub title: String,
    pub subject_id: SubjectId,
    pub subject_name: String,
    pub class_id: ClassId,
    pub class_name: String,
    pub total_marks: f64,
    pub test_date: DateTime<Utc>,
    pub link: String,
    pub status: TestStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTestDto {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    pub subject_id: SubjectId,
    pub class_id: ClassId,
    #[validate(range(exclusive_min = 0.0, message = "Total marks must be positive"))]
    pub total_marks: f64,
    pub test_date: DateTime<Utc>,
    #[serde(default)]
    #[validate(length(max = 2048))]
    pub link: String,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub id: TestResultId,
    pub student_id: UserId,
    pub test_id: TestId,
    pub marks: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Marks for one student in one test, keyed by roll number.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UploadMarksDto {
    #[validate(length(min = 1, max = 20, message = "Roll number is required"))]
    pub roll_number: String,
    #[validate(length(min = 1, max = 255, message = "Subject name is required"))]
    pub subject_name: String,
    #[validate(length(min = 1, max = 255, message = "Test title is required"))]
    pub test_title: String,
    #[validate(range(min = 0.0, message = "Obtained marks cannot be negative"))]
    pub obtained_marks: f64,
    #[validate(range(exclusive_min = 0.0, message = "Total marks must be positive"))]
    pub total_marks: f64,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UploadMultipleMarksDto {
    #[validate(length(min = 1, message = "At least one entry is required"), nested)]
    pub marks: Vec<UploadMarksDto>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadedMark {
    pub roll_number: String,
    pub student_name: String,
    pub test_id: TestId,
    pub test_title: String,
    pub subject_name: String,
    pub obtained_marks: f64,
    pub total_marks: f64,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadMarksResponse {
    pub message: String,
    pub result: UploadedMark,
}

/// Outcome of one entry of a bulk upload.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkMarkOutcome {
    pub roll_number: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<UploadedMark>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkMarksResponse {
    pub message: String,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<BulkMarkOutcome>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StudentMarksQuery {
    #[validate(length(min = 1, message = "Roll number is required"))]
    pub roll_number: String,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ClassMarksQuery {
    #[validate(length(min = 1, message = "Class name is required"))]
    pub class_name: String,
    #[validate(length(min = 1, message = "Subject name is required"))]
    pub subject_name: String,
}

/// One result row joined with its student, test, subject and class.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarkRow {
    pub result_id: TestResultId,
    pub student_id: UserId,
    pub student_name: String,
    pub role_number: Option<String>,
    pub test_id: TestId,
    pub test_title: String,
    pub test_date: DateTime<Utc>,
    pub subject_name: String,
    pub class_name: String,
    pub marks: f64,
    pub total_marks: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarkView {
    #[serde(flatten)]
    pub row: MarkRow,
    pub percentage: f64,
}

impl From<MarkRow> for MarkView {
    fn from(row: MarkRow) -> Self {
        let percentage = marks_percentage(row.marks, row.total_marks);
        Self { row, percentage }
    }
}

/// Aggregate results per subject, for the admin overview.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubjectResultsSummary {
    pub subject_id: SubjectId,
    pub subject_name: String,
    pub class_name: String,
    pub result_count: i64,
    pub average_percentage: Option<f64>,
    pub highest_percentage: Option<f64>,
    pub lowest_percentage: Option<f64>,
}

/// Number of tests a teacher created per class and subject.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TestCount {
    pub class_id: ClassId,
    pub class_name: String,
    pub subject_id: SubjectId,
    pub subject_name: String,
    pub count: i64,
}

pub fn marks_percentage(obtained: f64, total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    round2(obtained * 100.0 / total)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(obtained: f64, total: f64) -> UploadMarksDto {
        UploadMarksDto {
            roll_number: "NO001".to_string(),
            subject_name: "Mathematics".to_string(),
            test_title: "Unit Test 1".to_string(),
            obtained_marks: obtained,
            total_marks: total,
        }
    }

    #[test]
    fn test_marks_percentage() {
        assert_eq!(marks_percentage(45.0, 50.0), 90.0);
        assert_eq!(marks_percentage(1.0, 3.0), 33.33);
        assert_eq!(marks_percentage(5.0, 0.0), 0.0);
    }

    #[test]
    fn test_upload_marks_ranges() {
        assert!(upload(40.0, 50.0).validate().is_ok());
        assert!(upload(-1.0, 50.0).validate().is_err());
        assert!(upload(10.0, 0.0).validate().is_err());
    }

    #[test]
    fn test_bulk_requires_entries() {
        let dto = UploadMultipleMarksDto { marks: vec![] };
        let errors = dto.validate().unwrap_err();
        let marks = errors.field_errors()["marks"];
        assert_eq!(marks[0].code, "length");
        assert_eq!(marks[0].params["value"], serde_json::json!([]));
    }

    #[test]
    fn test_bulk_reports_invalid_entry() {
        let dto = UploadMultipleMarksDto {
            marks: vec![upload(40.0, 50.0), upload(-1.0, 50.0)],
        };
        let errors = dto.validate().unwrap_err();
        assert!(errors.errors().contains_key("marks"));
        assert!(upload(40.0, 50.0).validate().is_ok());
    }
}
