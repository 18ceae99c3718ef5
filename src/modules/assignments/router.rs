use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

use super::controller::{
    class_assignments, create_assignment, download_submission, grade_submission, my_assignments,
    pending_assignments, student_download, submissions, submit_assignment, submitted_assignments,
    teacher_download,
};

pub fn init_teacher_assignments_router() -> Router<AppState> {
    Router::new()
        .route("/assignments", post(create_assignment).get(my_assignments))
        .route("/assignments/{id}/download", get(teacher_download))
        .route("/assignments/{id}/submissions", get(submissions))
        .route("/submissions/{id}/grade", put(grade_submission))
        .route("/submissions/{id}/download", get(download_submission))
}

pub fn init_student_assignments_router() -> Router<AppState> {
    Router::new()
        .route("/", get(class_assignments))
        .route("/pending", get(pending_assignments))
        .route("/submitted", get(submitted_assignments))
        .route("/{id}/download", get(student_download))
        .route("/{id}/submit", post(submit_assignment))
}
