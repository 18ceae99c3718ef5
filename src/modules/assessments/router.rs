use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{
    class_marks, create_test, my_tests, my_uploaded_marks, results_summary, student_marks,
    test_counts, upload_many_marks, upload_marks,
};

pub fn init_teacher_assessments_router() -> Router<AppState> {
    Router::new()
        .route("/tests", post(create_test).get(my_tests))
        .route("/tests/counts", get(test_counts))
        .route("/marks", post(upload_marks))
        .route("/marks/bulk", post(upload_many_marks))
        .route("/marks/student", post(student_marks))
        .route("/marks/class", post(class_marks))
        .route("/marks/uploaded", get(my_uploaded_marks))
}

pub fn init_admin_results_router() -> Router<AppState> {
    Router::new().route("/summary", get(results_summary))
}
