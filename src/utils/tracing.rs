//! Structured logging helpers.
//!
//! Audit events record decisions and destructive operations (approvals,
//! rejections, deletions, batch runs) with a fixed set of `audit.*` fields so
//! they can be filtered out of the JSON log.

/// Log an audit event at INFO level.
///
/// ```ignore
/// audit_event!("approve", "student", student.id = %id, admin.id = %admin_id);
/// ```
#[macro_export]
macro_rules! audit_event {
    ($action:expr, $resource:expr) => {
        tracing::info!(
            audit.action = $action,
            audit.resource = $resource,
            "audit"
        )
    };
    ($action:expr, $resource:expr, $($field:tt)*) => {
        tracing::info!(
            audit.action = $action,
            audit.resource = $resource,
            $($field)*
        )
    };
}

/// Log a security-relevant event at WARN level, such as a failed login or a
/// parent asking for a child they are not linked to.
#[macro_export]
macro_rules! security_event {
    ($event:expr, $($field:tt)*) => {
        tracing::warn!(
            security.event = $event,
            $($field)*
        )
    };
}
