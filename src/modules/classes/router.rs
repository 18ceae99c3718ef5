use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{create_class, create_subject, get_class, list_classes};

/// Public class listing, used by the registration forms.
pub fn init_classes_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_classes))
        .route("/{id}", get(get_class))
}

pub fn init_admin_classes_router() -> Router<AppState> {
    Router::new()
        .route("/classes", post(create_class))
        .route("/subjects", post(create_subject))
}
