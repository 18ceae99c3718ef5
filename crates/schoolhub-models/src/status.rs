//! Status and category enums stored as PostgreSQL enum types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

macro_rules! pg_enum {
    (
        $(#[$meta:meta])*
        $name:ident as $pg:literal { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
        #[sqlx(type_name = $pg, rename_all = "lowercase")]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($text => Ok(Self::$variant),)+
                    other => Err(format!("Invalid {}: {other}", stringify!($name))),
                }
            }
        }
    };
}

pg_enum!(
    /// Tri-state shared by every moderated record.
    ApprovalStatus as "approval_status" {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
    }
);

pg_enum!(
    /// Who filed a student admission request.
    RegistrationSource as "registration_source" {
        Student => "student",
        Parent => "parent",
        Admin => "admin",
    }
);

pg_enum!(
    AttendanceStatus as "attendance_status" {
        Present => "present",
        Absent => "absent",
        Late => "late",
    }
);

pg_enum!(
    TestStatus as "test_status" {
        Pending => "pending",
        Completed => "completed",
    }
);

pg_enum!(
    SubmissionStatus as "submission_status" {
        Submitted => "submitted",
        Late => "late",
        Graded => "graded",
    }
);

pg_enum!(
    AssignmentStatus as "assignment_status" {
        Active => "active",
        Expired => "expired",
    }
);

pg_enum!(
    AnnouncementAudience as "announcement_audience" {
        Student => "student",
        Teacher => "teacher",
        Parent => "parent",
        All => "all",
    }
);

pg_enum!(
    /// `student` announcements target one class and are published at once;
    /// `event` announcements wait for an admin.
    TeacherAnnouncementType as "teacher_announcement_type" {
        Student => "student",
        Event => "event",
    }
);

impl TeacherAnnouncementType {
    /// Status a freshly created announcement of this type starts in.
    pub fn initial_status(&self) -> ApprovalStatus {
        match self {
            TeacherAnnouncementType::Student => ApprovalStatus::Approved,
            TeacherAnnouncementType::Event => ApprovalStatus::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!("Approved".parse::<ApprovalStatus>().unwrap(), ApprovalStatus::Approved);
        assert_eq!("LATE".parse::<SubmissionStatus>().unwrap(), SubmissionStatus::Late);
        assert!("maybe".parse::<ApprovalStatus>().is_err());
    }

    #[test]
    fn test_teacher_announcement_initial_status() {
        assert_eq!(
            TeacherAnnouncementType::Student.initial_status(),
            ApprovalStatus::Approved
        );
        assert_eq!(
            TeacherAnnouncementType::Event.initial_status(),
            ApprovalStatus::Pending
        );
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&AnnouncementAudience::All).unwrap(),
            r#""all""#
        );
        let status: AttendanceStatus = serde_json::from_str(r#""absent""#).unwrap();
        assert_eq!(status, AttendanceStatus::Absent);
    }
}
