use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{class_summary, run_batch};

pub fn init_attendance_admin_router() -> Router<AppState> {
    Router::new()
        .route("/summary", get(class_summary))
        .route("/run", post(run_batch))
}
