//! Shared utilities for the SchoolHub API.
//!
//! - [`notifier`]: outbound email delivery behind the [`notifier::Notifier`] trait
//! - [`email_templates`]: subjects and HTML bodies of every email the API sends
//! - [`tracing`]: audit and security logging macros

pub mod email_templates;
pub mod notifier;
pub mod tracing;
