use axum::{Router, routing::get};

use crate::state::AppState;

use super::controller::{list_scheduled_subjects, my_subjects, request_subject, teacher_subjects};

pub fn init_teacher_scheduled_subjects_router() -> Router<AppState> {
    Router::new().route("/", get(my_subjects).post(request_subject))
}

pub fn init_admin_scheduled_subjects_router() -> Router<AppState> {
    Router::new()
        .route("/scheduled-subjects", get(list_scheduled_subjects))
        .route("/scheduled-subjects/teacher/{teacher_id}", get(teacher_subjects))
}
