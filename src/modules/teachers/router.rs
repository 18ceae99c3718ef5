use axum::{
    Router,
    routing::{get, put},
};

use crate::modules::announcements::router::init_teacher_announcements_router;
use crate::modules::assessments::router::init_teacher_assessments_router;
use crate::modules::assignments::router::init_teacher_assignments_router;
use crate::modules::notes::router::init_teacher_notes_router;
use crate::modules::scheduled_subjects::router::init_teacher_scheduled_subjects_router;
use crate::state::AppState;

use super::controller::{class_students, profile, update_subjects};

pub fn init_teacher_router() -> Router<AppState> {
    Router::new()
        .route("/profile", get(profile))
        .route("/subjects", put(update_subjects))
        .route("/students/{class_name}/{subject_name}", get(class_students))
        .merge(init_teacher_assessments_router())
        .merge(init_teacher_assignments_router())
        .nest("/notes", init_teacher_notes_router())
        .nest("/scheduled-subjects", init_teacher_scheduled_subjects_router())
        .nest("/announcements", init_teacher_announcements_router())
}
