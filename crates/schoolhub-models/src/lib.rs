//! Domain models for the SchoolHub API.
//!
//! Row types derive `sqlx::FromRow`; request and response types derive
//! `utoipa::ToSchema` and use camelCase field names on the wire.

pub mod academics;
pub mod announcements;
pub mod assessments;
pub mod assignments;
pub mod attendance;
pub mod auth;
pub mod ids;
pub mod moderation;
pub mod notes;
pub mod scheduled_subjects;
pub mod status;
pub mod users;
pub mod value_types;

pub use ids::*;
pub use status::*;
pub use users::{User, UserProfile};

pub use schoolhub_auth::UserRole;
