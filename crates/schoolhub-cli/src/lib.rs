//! # SchoolHub CLI
//!
//! Administrative and seeding utilities for SchoolHub development.
//!
//! ## Usage
//!
//! ```ignore
//! use schoolhub_cli::seeder::{seed_classes, seed_demo, DemoConfig};
//!
//! seed_classes(&pool).await?;
//! seed_demo(&pool, DemoConfig::default()).await?;
//! ```

pub mod seeder;
