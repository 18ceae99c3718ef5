//! Attendance rows, filters and summaries.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use crate::ids::{AttendanceId, ClassId, SubjectId, UserId};
use crate::status::AttendanceStatus;

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Attendance {
    pub id: AttendanceId,
    pub student_id: UserId,
    pub subject_id: SubjectId,
    pub class_id: Option<ClassId>,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub marked_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An attendance row joined with its subject.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: AttendanceId,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub subject_id: SubjectId,
    pub subject_name: String,
    pub subject_code: String,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AttendanceQuery {
    /// Only rows for this subject code
    pub subject_code: Option<String>,
    /// Inclusive lower bound (YYYY-MM-DD)
    pub start_date: Option<NaiveDate>,
    /// Inclusive upper bound (YYYY-MM-DD)
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ClassAttendanceQuery {
    pub class_id: Option<ClassId>,
    /// Only rows for this day (YYYY-MM-DD)
    pub date: Option<NaiveDate>,
}

/// Per-status counts for one subject.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubjectAttendanceCounts {
    pub subject_id: SubjectId,
    pub subject_name: String,
    pub subject_code: String,
    pub total: i64,
    pub present: i64,
    pub absent: i64,
    pub late: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubjectAttendanceSummary {
    #[serde(flatten)]
    pub counts: SubjectAttendanceCounts,
    pub percentage: f64,
}

impl From<SubjectAttendanceCounts> for SubjectAttendanceSummary {
    fn from(counts: SubjectAttendanceCounts) -> Self {
        let percentage = attendance_percentage(counts.present, counts.total);
        Self { counts, percentage }
    }
}

/// Attendance summary of a whole class, per subject.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClassAttendanceRow {
    pub class_id: ClassId,
    pub class_name: String,
    pub subject_id: SubjectId,
    pub subject_name: String,
    pub total: i64,
    pub present: i64,
    pub absent: i64,
    pub late: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClassAttendanceSummary {
    #[serde(flatten)]
    pub row: ClassAttendanceRow,
    pub percentage: f64,
}

impl From<ClassAttendanceRow> for ClassAttendanceSummary {
    fn from(row: ClassAttendanceRow) -> Self {
        let percentage = attendance_percentage(row.present, row.total);
        Self { row, percentage }
    }
}

/// Outcome of one run of the daily absentee batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceBatchReport {
    pub date: Option<NaiveDate>,
    pub students_processed: u64,
    pub records_attempted: u64,
    pub records_created: u64,
}

/// Present share as a percentage rounded to two decimals; 0 when nothing was recorded.
pub fn attendance_percentage(present: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    round2(present as f64 * 100.0 / total as f64)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_rounding() {
        assert_eq!(attendance_percentage(2, 3), 66.67);
        assert_eq!(attendance_percentage(1, 8), 12.5);
        assert_eq!(attendance_percentage(0, 0), 0.0);
    }

    #[test]
    fn test_summary_flattens_counts() {
        let summary = SubjectAttendanceSummary::from(SubjectAttendanceCounts {
            subject_id: SubjectId::new(),
            subject_name: "Mathematics".to_string(),
            subject_code: "MATH-6".to_string(),
            total: 4,
            present: 3,
            absent: 1,
            late: 0,
        });
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["subjectCode"], "MATH-6");
        assert_eq!(json["percentage"], 75.0);
    }
}
