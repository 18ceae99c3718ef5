use axum::{
    Router,
    routing::{delete, get},
};

use crate::state::AppState;

use super::controller::{delete_user, get_user_counts};

pub fn init_users_router() -> Router<AppState> {
    Router::new()
        .route("/counts", get(get_user_counts))
        .route("/{id}", delete(delete_user))
}
