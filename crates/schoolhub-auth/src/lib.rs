//! # SchoolHub Auth
//!
//! Roles and bearer tokens.
//!
//! - [`roles`]: the four account roles and their database mapping
//! - [`claims`]: the JWT payload
//! - [`jwt`]: signing and verification
//!
//! ```ignore
//! use schoolhub_auth::{UserRole, create_access_token, verify_token};
//!
//! let token = create_access_token(user_id, "kid@school.test", UserRole::Student, Some("NO001"), &config)?;
//! let claims = verify_token(&token, &config)?;
//! assert_eq!(claims.role, UserRole::Student);
//! ```

pub mod claims;
pub mod jwt;
pub mod roles;

pub use claims::Claims;
pub use jwt::{create_access_token, verify_token};
pub use roles::UserRole;
