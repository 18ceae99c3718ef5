//! Authentication and authorization.
//!
//! - [`auth`]: the [`auth::AuthUser`] bearer-token extractor, one extractor per
//!   role ([`auth::AdminUser`], [`auth::TeacherUser`], ...) and
//!   [`auth::LinkedChild`] for the parent child views
//! - [`role`]: router layers rejecting tokens of the wrong role
//!
//! ```ignore
//! async fn my_notes(teacher: TeacherUser, State(state): State<AppState>) -> Result<..., AppError> {
//!     let teacher_id = teacher.user_id()?;
//!     // ...
//! }
//! ```

pub mod auth;
pub mod role;
