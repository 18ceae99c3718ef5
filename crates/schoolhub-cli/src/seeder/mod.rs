//! Database seeding.
//!
//! `seed_classes` installs the fixed class list (1-10) with each class's
//! syllabus. `seed_demo` adds fake teachers, approved students and their
//! parents on top of it. Every demo account uses an `@example.com` address so
//! `clear_demo` can remove them again.

pub mod classes;
pub mod models;
pub mod users;

pub use classes::{seed_classes, syllabus};
pub use models::DemoConfig;
pub use users::{clear_demo, seed_demo};

pub type SeedResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Password shared by every demo teacher and parent.
pub const DEMO_PASSWORD: &str = "password123";
