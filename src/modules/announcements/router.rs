use axum::{
    Router,
    routing::{delete, get, put},
};

use crate::state::AppState;

use super::controller::{
    create_announcement, create_teacher_announcement, delete_announcement,
    delete_teacher_announcement, list_announcements, my_feed, my_teacher_announcements,
    update_teacher_announcement,
};

pub fn init_admin_announcements_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_announcements).post(create_announcement))
        .route("/{id}", delete(delete_announcement))
}

pub fn init_teacher_announcements_router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(my_teacher_announcements).post(create_teacher_announcement),
        )
        .route(
            "/{id}",
            put(update_teacher_announcement).delete(delete_teacher_announcement),
        )
}

pub fn init_announcements_router() -> Router<AppState> {
    Router::new().route("/", get(my_feed))
}
