use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

use super::controller::{
    approve_student, approve_teacher, count_students, get_teacher, list_parents, list_students,
    list_teachers, parents_with_students, pending_students, pending_teachers, reject_student,
    reject_teacher,
};

pub fn init_approvals_router() -> Router<AppState> {
    Router::new()
        .route("/teachers", get(list_teachers))
        .route("/teachers/pending", get(pending_teachers))
        .route("/teachers/{email}", get(get_teacher))
        .route("/teachers/{email}/approve", put(approve_teacher))
        .route("/teachers/{email}/reject", put(reject_teacher))
        .route("/students", get(list_students))
        .route("/students/pending", get(pending_students))
        .route("/students/count", get(count_students))
        .route("/students/{id}/approve", post(approve_student))
        .route("/students/{id}/reject", post(reject_student))
        .route("/parents", get(list_parents))
        .route("/parents/with-students", get(parents_with_students))
}
