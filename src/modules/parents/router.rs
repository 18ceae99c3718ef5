use axum::{Router, routing::get};

use crate::modules::announcements::controller::parent_feed;
use crate::state::AppState;

use super::controller::{
    child_attendance, child_attendance_summary, child_class, child_deadlines, child_marks,
    child_notes, child_pending_assignments, child_profile, child_subjects,
    child_submitted_assignments, child_tests, children, profile,
};

fn child_router() -> Router<AppState> {
    Router::new()
        .route("/profile", get(child_profile))
        .route("/class", get(child_class))
        .route("/subjects", get(child_subjects))
        .route("/attendance", get(child_attendance))
        .route("/attendance/summary", get(child_attendance_summary))
        .route("/tests", get(child_tests))
        .route("/marks/{subject_name}", get(child_marks))
        .route("/notes", get(child_notes))
        .route("/assignments/pending", get(child_pending_assignments))
        .route("/assignments/submitted", get(child_submitted_assignments))
        .route("/deadlines", get(child_deadlines))
}

pub fn init_parent_router() -> Router<AppState> {
    Router::new()
        .route("/profile", get(profile))
        .route("/children", get(children))
        .route("/announcements", get(parent_feed))
        .nest("/child/{role_number}", child_router())
}
