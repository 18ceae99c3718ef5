//! Teacher requests to teach a subject in a class.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::ids::{ClassId, ScheduledSubjectId, SubjectId, UserId};
use crate::status::ApprovalStatus;

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledSubject {
    pub id: ScheduledSubjectId,
    pub teacher_id: UserId,
    pub class_id: ClassId,
    pub subject_id: SubjectId,
    pub status: ApprovalStatus,
    pub rejection_reason: Option<String>,
    pub approved_by: Option<UserId>,
    pub requested_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledSubjectView {
    pub id: ScheduledSubjectId,
    pub teacher_id: UserId,
    pub teacher_name: String,
    pub class_id: ClassId,
    pub class_name: String,
    pub subject_id: SubjectId,
    pub subject_name: String,
    pub subject_code: String,
    pub status: ApprovalStatus,
    pub rejection_reason: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RequestSubjectDto {
    pub class_id: ClassId,
    pub subject_id: SubjectId,
}
