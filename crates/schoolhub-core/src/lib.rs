//! # SchoolHub Core
//!
//! Foundational types shared by the SchoolHub crates:
//!
//! - [`errors`]: the [`AppError`] type and its JSON response body
//! - [`pagination`]: page/limit query parameters for admin listings
//! - [`password`]: bcrypt hashing and generated credentials
//! - [`file_storage`]: upload policies and the local file storage backend

pub mod errors;
pub mod file_storage;
pub mod pagination;
pub mod password;

pub use errors::AppError;
pub use file_storage::{FileStorage, LocalFileStorage, StorageError, UploadPolicy};
pub use pagination::{PageMeta, PageParams, Paginated};
pub use password::{hash_password, verify_password};
