use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{approve, list_pending, reject};

pub fn init_review_router() -> Router<AppState> {
    Router::new()
        .route("/{entity}/pending", get(list_pending))
        .route("/{entity}/{id}/approve", post(approve))
        .route("/{entity}/{id}/reject", post(reject))
}
