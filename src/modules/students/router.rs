use axum::{Router, routing::get};

use crate::modules::announcements::controller::student_feed;
use crate::modules::assignments::router::init_student_assignments_router;
use crate::modules::notes::router::init_student_notes_router;
use crate::state::AppState;

use super::controller::{
    my_attendance, my_attendance_summary, my_class, my_deadlines, my_marks, my_subjects, my_tests,
    profile,
};

pub fn init_student_router() -> Router<AppState> {
    Router::new()
        .route("/profile", get(profile))
        .route("/class", get(my_class))
        .route("/subjects", get(my_subjects))
        .route("/tests", get(my_tests))
        .route("/attendance", get(my_attendance))
        .route("/attendance/summary", get(my_attendance_summary))
        .route("/marks/{subject_name}", get(my_marks))
        .route("/deadlines", get(my_deadlines))
        .route("/announcements", get(student_feed))
        .nest("/assignments", init_student_assignments_router())
        .nest("/notes", init_student_notes_router())
}
