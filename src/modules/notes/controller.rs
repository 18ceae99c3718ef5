use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;
use validator::Validate;

use schoolhub_auth::UserRole;
use schoolhub_core::AppError;
use schoolhub_core::errors::ErrorBody;
use schoolhub_models::notes::{
    ApprovedNotesQuery, NoteCount, NoteView, SubjectNotes, UploadNoteForm, group_by_subject,
};
use schoolhub_models::NoteId;

use crate::download::FileDownload;
use crate::middleware::auth::{AuthUser, StudentUser, TeacherUser};
use crate::modules::assignments::service::class_of;
use crate::modules::students::StudentService;
use crate::multipart::MultipartForm;
use crate::state::AppState;
use crate::validator::validation_error;

use super::service::{NoteReader, NoteService};

fn note_form(form: &MultipartForm) -> Result<UploadNoteForm, AppError> {
    let parsed = UploadNoteForm {
        title: form.text("title").unwrap_or_default(),
        description: form.text("description"),
        subject_name: form.text_any(&["subjectName", "subject"]).unwrap_or_default(),
        class_name: form.text_any(&["className", "class"]).unwrap_or_default(),
    };
    parsed.validate().map_err(|e| validation_error(&e))?;
    Ok(parsed)
}

/// Upload a note (PDF or Word) for admin review
#[utoipa::path(
    post,
    path = "/api/teacher/notes",
    request_body(content_type = "multipart/form-data", description = "title, description, subjectName, className and file"),
    responses(
        (status = 201, description = "Note uploaded and pending review", body = NoteView),
        (status = 400, description = "Missing file, unsupported type or file too large", body = ErrorBody),
        (status = 404, description = "Class or subject not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Teacher"
)]
#[instrument(skip(state, teacher, form))]
pub async fn upload_note(
    State(state): State<AppState>,
    teacher: TeacherUser,
    mut form: MultipartForm,
) -> Result<(StatusCode, Json<NoteView>), AppError> {
    let fields = note_form(&form)?;
    let file = form.require_file("file", "Note file is required")?;
    let note = NoteService::upload(&state, teacher.user_id()?, fields, file).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

#[utoipa::path(
    get,
    path = "/api/teacher/notes",
    responses((status = 200, description = "Notes uploaded by the caller", body = Vec<NoteView>)),
    security(("bearer_auth" = [])),
    tag = "Teacher"
)]
#[instrument(skip(state, teacher))]
pub async fn my_notes(
    State(state): State<AppState>,
    teacher: TeacherUser,
) -> Result<Json<Vec<NoteView>>, AppError> {
    Ok(Json(NoteService::teacher_notes(&state.db, teacher.user_id()?).await?))
}

#[utoipa::path(
    get,
    path = "/api/teacher/notes/counts",
    responses((status = 200, description = "Notes per class and subject", body = Vec<NoteCount>)),
    security(("bearer_auth" = [])),
    tag = "Teacher"
)]
#[instrument(skip(state, teacher))]
pub async fn note_counts(
    State(state): State<AppState>,
    teacher: TeacherUser,
) -> Result<Json<Vec<NoteCount>>, AppError> {
    Ok(Json(NoteService::note_counts(&state.db, teacher.user_id()?).await?))
}

/// Approved notes, filtered by class and subject name
#[utoipa::path(
    get,
    path = "/api/notes/approved",
    params(ApprovedNotesQuery),
    responses((status = 200, description = "Approved notes", body = Vec<NoteView>)),
    security(("bearer_auth" = [])),
    tag = "Notes"
)]
#[instrument(skip(state, _user))]
pub async fn approved_notes(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<ApprovedNotesQuery>,
) -> Result<Json<Vec<NoteView>>, AppError> {
    Ok(Json(NoteService::approved(&state.db, &query).await?))
}

/// Download a note
///
/// Approved notes are open to teachers and to students of the note's class.
/// Pending and rejected notes only to admins and the uploading teacher.
#[utoipa::path(
    get,
    path = "/api/notes/{id}/download",
    params(("id" = NoteId, Path, description = "Note ID")),
    responses(
        (status = 200, description = "Note file", content_type = "application/octet-stream"),
        (status = 403, description = "No access to this note", body = ErrorBody),
        (status = 404, description = "Note not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Notes"
)]
#[instrument(skip(state, user))]
pub async fn download_note(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<NoteId>,
) -> Result<FileDownload, AppError> {
    let reader_id = user.user_id()?;
    let class_id = match user.role() {
        UserRole::Student => StudentService::load(&state.db, reader_id).await?.class_id,
        _ => None,
    };
    let reader = NoteReader {
        id: reader_id,
        role: user.role(),
        class_id,
    };
    NoteService::download(&state, id, reader).await
}

/// Approved notes of the caller's class, grouped by subject
#[utoipa::path(
    get,
    path = "/api/student/notes",
    responses(
        (status = 200, description = "Notes grouped by subject", body = Vec<SubjectNotes>),
        (status = 400, description = "Student has no class", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
#[instrument(skip(state, student))]
pub async fn student_notes(
    State(state): State<AppState>,
    student: StudentUser,
) -> Result<Json<Vec<SubjectNotes>>, AppError> {
    let me = StudentService::load(&state.db, student.user_id()?).await?;
    let notes = NoteService::class_notes(&state.db, class_of(&me)?, None).await?;
    Ok(Json(group_by_subject(notes)))
}

#[utoipa::path(
    get,
    path = "/api/student/notes/{subject_name}",
    params(("subject_name" = String, Path, description = "Subject name")),
    responses((status = 200, description = "Approved notes for the subject", body = Vec<NoteView>)),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
#[instrument(skip(state, student))]
pub async fn student_subject_notes(
    State(state): State<AppState>,
    student: StudentUser,
    Path(subject_name): Path<String>,
) -> Result<Json<Vec<NoteView>>, AppError> {
    let me = StudentService::load(&state.db, student.user_id()?).await?;
    Ok(Json(
        NoteService::class_notes(&state.db, class_of(&me)?, Some(&subject_name)).await?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_form_reads_both_field_names() {
        let form = MultipartForm::from_parts(
            &[("title", "Plants"), ("subject", "Science"), ("className", "6")],
            vec![],
        );
        let parsed = note_form(&form).unwrap();
        assert_eq!(parsed.subject_name, "Science");
        assert_eq!(parsed.class_name, "6");
    }

    #[test]
    fn test_note_form_requires_class() {
        let form = MultipartForm::from_parts(&[("title", "Plants"), ("subject", "Science")], vec![]);
        assert!(note_form(&form).is_err());
    }
}
