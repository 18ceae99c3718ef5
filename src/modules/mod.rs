pub mod announcements;
pub mod approvals;
pub mod assessments;
pub mod assignments;
pub mod attendance;
pub mod auth;
pub mod classes;
pub mod moderation;
pub mod notes;
pub mod parents;
pub mod scheduled_subjects;
pub mod students;
pub mod teachers;
pub mod users;
