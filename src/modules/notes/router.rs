use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{
    approved_notes, download_note, my_notes, note_counts, student_notes, student_subject_notes,
    upload_note,
};

pub fn init_teacher_notes_router() -> Router<AppState> {
    Router::new()
        .route("/", post(upload_note).get(my_notes))
        .route("/counts", get(note_counts))
}

/// Shared by every role; access is checked per note.
pub fn init_notes_router() -> Router<AppState> {
    Router::new()
        .route("/approved", get(approved_notes))
        .route("/{id}/download", get(download_note))
}

pub fn init_student_notes_router() -> Router<AppState> {
    Router::new()
        .route("/", get(student_notes))
        .route("/{subject_name}", get(student_subject_notes))
}
