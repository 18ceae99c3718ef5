//! Kinds of records an admin reviews through the generic review endpoints.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::status::ApprovalStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ModerationEntity {
    Notes,
    ScheduledSubjects,
    Announcements,
}

impl ModerationEntity {
    pub const ALL: [ModerationEntity; 3] = [
        ModerationEntity::Notes,
        ModerationEntity::ScheduledSubjects,
        ModerationEntity::Announcements,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationEntity::Notes => "notes",
            ModerationEntity::ScheduledSubjects => "scheduled-subjects",
            ModerationEntity::Announcements => "announcements",
        }
    }

    /// Singular, human readable label used in messages.
    pub fn label(&self) -> &'static str {
        match self {
            ModerationEntity::Notes => "Note",
            ModerationEntity::ScheduledSubjects => "Scheduled subject",
            ModerationEntity::Announcements => "Announcement",
        }
    }
}

impl fmt::Display for ModerationEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModerationEntity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "notes" | "note" => Ok(ModerationEntity::Notes),
            "scheduled-subjects" | "scheduled-subject" => Ok(ModerationEntity::ScheduledSubjects),
            "announcements" | "announcement" => Ok(ModerationEntity::Announcements),
            other => Err(format!("Unknown review entity: {other}")),
        }
    }
}

/// Result of an approve or reject decision.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModerationOutcome {
    pub entity: String,
    pub id: Uuid,
    pub status: ApprovalStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    pub decided_at: DateTime<Utc>,
}

/// A pending record, summarised for the review queue.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PendingItem {
    pub id: Uuid,
    pub title: String,
    pub submitted_by: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entity() {
        assert_eq!(
            "scheduled-subjects".parse::<ModerationEntity>().unwrap(),
            ModerationEntity::ScheduledSubjects
        );
        assert_eq!(
            "scheduled_subjects".parse::<ModerationEntity>().unwrap(),
            ModerationEntity::ScheduledSubjects
        );
        assert_eq!("Notes".parse::<ModerationEntity>().unwrap(), ModerationEntity::Notes);
        assert!("teachers".parse::<ModerationEntity>().is_err());
    }

    #[test]
    fn test_round_trip_names() {
        for entity in ModerationEntity::ALL {
            assert_eq!(entity.as_str().parse::<ModerationEntity>().unwrap(), entity);
        }
    }
}
