//! Admin broadcasts and teacher announcements.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use schoolhub_auth::UserRole;

use crate::ids::{AnnouncementId, ClassId, SubjectId, TeacherAnnouncementId, UserId};
use crate::status::{AnnouncementAudience, ApprovalStatus, TeacherAnnouncementType};

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    pub id: AnnouncementId,
    pub title: String,
    pub message: String,
    pub target_audience: AnnouncementAudience,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAnnouncementDto {
    #[validate(length(min = 1, max = 255, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, max = 10000, message = "Message is required"))]
    pub message: String,
    #[validate(length(min = 1, message = "At least one audience is required"))]
    pub target_audience: Vec<AnnouncementAudience>,
}

/// Audiences an admin broadcast is stored under. `all` overrides the rest;
/// duplicates are dropped.
pub fn resolve_audiences(requested: &[AnnouncementAudience]) -> Vec<AnnouncementAudience> {
    if requested.contains(&AnnouncementAudience::All) {
        return vec![AnnouncementAudience::All];
    }
    let mut audiences = Vec::with_capacity(requested.len());
    for audience in requested {
        if !audiences.contains(audience) {
            audiences.push(*audience);
        }
    }
    audiences
}

/// Audience an account of `role` reads, besides `all`.
pub fn audience_for_role(role: UserRole) -> Option<AnnouncementAudience> {
    match role {
        UserRole::Student => Some(AnnouncementAudience::Student),
        UserRole::Teacher => Some(AnnouncementAudience::Teacher),
        UserRole::Parent => Some(AnnouncementAudience::Parent),
        UserRole::Admin => None,
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeacherAnnouncement {
    pub id: TeacherAnnouncementId,
    pub title: String,
    pub description: String,
    pub announcement_type: TeacherAnnouncementType,
    pub class_id: Option<ClassId>,
    pub subject_id: Option<SubjectId>,
    pub created_by: UserId,
    pub status: ApprovalStatus,
    pub approved_by: Option<UserId>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub event_date: Option<DateTime<Utc>>,
    pub event_location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Teacher announcement joined with class, subject and author names.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeacherAnnouncementView {
    pub id: TeacherAnnouncementId,
    pub title: String,
    pub description: String,
    pub announcement_type: TeacherAnnouncementType,
    pub class_id: Option<ClassId>,
    pub class_name: Option<String>,
    pub subject_id: Option<SubjectId>,
    pub subject_name: Option<String>,
    pub created_by: UserId,
    pub teacher_name: String,
    pub status: ApprovalStatus,
    pub rejection_reason: Option<String>,
    pub event_date: Option<DateTime<Utc>>,
    pub event_location: Option<String>,
    pub created_at: DateTime<Utc>,
}

fn validate_teacher_announcement(dto: &CreateTeacherAnnouncementDto) -> Result<(), ValidationError> {
    match dto.announcement_type {
        TeacherAnnouncementType::Student if dto.class_id.is_none() => {
            let mut err = ValidationError::new("class_id");
            err.message = Some("Class is required for student announcements".into());
            Err(err)
        }
        TeacherAnnouncementType::Event if dto.event_date.is_none() => {
            let mut err = ValidationError::new("event_date");
            err.message = Some("Event date is required for event announcements".into());
            Err(err)
        }
        _ => Ok(()),
    }
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_teacher_announcement"))]
pub struct CreateTeacherAnnouncementDto {
    #[validate(length(min = 1, max = 255, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, max = 10000, message = "Description is required"))]
    pub description: String,
    #[serde(rename = "type", alias = "announcementType")]
    pub announcement_type: TeacherAnnouncementType,
    pub class_id: Option<ClassId>,
    pub subject_id: Option<SubjectId>,
    pub event_date: Option<DateTime<Utc>>,
    #[validate(length(max = 255))]
    pub event_location: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTeacherAnnouncementDto {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 10000))]
    pub description: Option<String>,
    pub event_date: Option<DateTime<Utc>>,
    #[validate(length(max = 255))]
    pub event_location: Option<String>,
}

/// Announcements visible to a student or parent.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementFeed {
    pub announcements: Vec<Announcement>,
    pub class_announcements: Vec<TeacherAnnouncementView>,
    pub events: Vec<TeacherAnnouncementView>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_overrides_other_audiences() {
        let resolved = resolve_audiences(&[
            AnnouncementAudience::Student,
            AnnouncementAudience::All,
            AnnouncementAudience::Parent,
        ]);
        assert_eq!(resolved, vec![AnnouncementAudience::All]);
    }

    #[test]
    fn test_duplicate_audiences_dropped() {
        let resolved = resolve_audiences(&[
            AnnouncementAudience::Student,
            AnnouncementAudience::Parent,
            AnnouncementAudience::Student,
        ]);
        assert_eq!(
            resolved,
            vec![AnnouncementAudience::Student, AnnouncementAudience::Parent]
        );
    }

    #[test]
    fn test_audience_for_role() {
        assert_eq!(audience_for_role(UserRole::Parent), Some(AnnouncementAudience::Parent));
        assert_eq!(audience_for_role(UserRole::Admin), None);
    }

    #[test]
    fn test_student_announcement_needs_class() {
        let dto: CreateTeacherAnnouncementDto =
            serde_json::from_str(r#"{"title":"Quiz","description":"Friday","type":"student"}"#)
                .unwrap();
        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_event_announcement_needs_date() {
        let dto: CreateTeacherAnnouncementDto = serde_json::from_str(
            r#"{"title":"Sports day","description":"Ground","type":"event","eventDate":"2026-11-02T09:00:00Z"}"#,
        )
        .unwrap();
        assert!(dto.validate().is_ok());
    }
}
