use anyhow::{Context, anyhow};
use sqlx::PgPool;
use tracing::{info, instrument, warn};

use schoolhub_auth::UserRole;
use schoolhub_core::file_storage::build_key;
use schoolhub_core::{AppError, UploadPolicy};
use schoolhub_models::notes::{ApprovedNotesQuery, Note, NoteCount, NoteView, UploadNoteForm};
use schoolhub_models::{ApprovalStatus, ClassId, NoteId, UserId};

use crate::download::FileDownload;
use crate::modules::classes::ClassService;
use crate::multipart::UploadedFile;
use crate::state::AppState;

const NOTE_VIEW_SELECT: &str = r#"
    SELECT n.id, n.title, n.description, n.subject_id, s.subject_name, n.class_id, c.class_name,
           n.uploaded_by, u.full_name AS teacher_name, n.file_name, n.file_mime_type, n.file_size,
           n.status, n.rejection_reason, n.created_at
    FROM notes n
    JOIN subjects s ON s.id = n.subject_id
    JOIN classes c ON c.id = n.class_id
    JOIN users u ON u.id = n.uploaded_by
"#;

/// Who is asking for a note file.
#[derive(Debug, Clone, Copy)]
pub struct NoteReader {
    pub id: UserId,
    pub role: UserRole,
    /// Set for students.
    pub class_id: Option<ClassId>,
}

/// Whether `reader` may download `note`.
pub fn can_download(note: &Note, reader: &NoteReader) -> bool {
    match reader.role {
        UserRole::Admin => true,
        UserRole::Teacher => note.uploaded_by == reader.id || note.status == ApprovalStatus::Approved,
        UserRole::Student => {
            note.status == ApprovalStatus::Approved && reader.class_id == Some(note.class_id)
        }
        UserRole::Parent => false,
    }
}

pub struct NoteService;

impl NoteService {
    /// Stores the file under `notes/` and records a pending note.
    #[instrument(skip(state, form, file), fields(file_name = %file.file_name))]
    pub async fn upload(
        state: &AppState,
        teacher_id: UserId,
        form: UploadNoteForm,
        file: UploadedFile,
    ) -> Result<NoteView, AppError> {
        UploadPolicy::documents(state.upload_config.note_max_bytes)
            .check(&file.content_type, file.len())
            .map_err(|e| e.into_app_error())?;

        let class = ClassService::get_class_by_name(&state.db, &form.class_name).await?;
        let subject =
            ClassService::find_subject_in_class(&state.db, class.id, &form.subject_name).await?;

        let id = NoteId::new();
        let key = build_key("notes", &id.to_string(), &file.file_name);
        state
            .storage
            .save(&key, &file.bytes)
            .await
            .map_err(|e| e.into_app_error())?;

        let inserted = sqlx::query(
            r#"INSERT INTO notes
                   (id, title, description, subject_id, class_id, uploaded_by,
                    file_key, file_name, file_mime_type, file_size)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"#,
        )
        .bind(id)
        .bind(form.title.trim())
        .bind(&form.description)
        .bind(subject.id)
        .bind(class.id)
        .bind(teacher_id)
        .bind(&key)
        .bind(&file.file_name)
        .bind(&file.content_type)
        .bind(file.len() as i64)
        .execute(&state.db)
        .await
        .context("Failed to record note");

        if let Err(e) = inserted {
            if let Err(cleanup) = state.storage.delete(&key).await {
                warn!(error = %cleanup, key = %key, "Failed to remove orphaned note file");
            }
            return Err(AppError::database(e));
        }

        info!(note.id = %id, class = %class.class_name, subject = %subject.subject_name, "Note uploaded");
        Self::get_view(&state.db, id).await
    }

    pub async fn get_view(db: &PgPool, id: NoteId) -> Result<NoteView, AppError> {
        sqlx::query_as::<_, NoteView>(&format!("{NOTE_VIEW_SELECT} WHERE n.id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await
            .context("Failed to fetch note")
            .map_err(AppError::database)?
            .ok_or_else(|| AppError::not_found(anyhow!("Note not found")))
    }

    #[instrument(skip(db))]
    pub async fn teacher_notes(db: &PgPool, teacher_id: UserId) -> Result<Vec<NoteView>, AppError> {
        sqlx::query_as::<_, NoteView>(&format!(
            "{NOTE_VIEW_SELECT} WHERE n.uploaded_by = $1 ORDER BY n.created_at DESC"
        ))
        .bind(teacher_id)
        .fetch_all(db)
        .await
        .context("Failed to fetch teacher notes")
        .map_err(AppError::database)
    }

    /// Approved notes, optionally narrowed by class and subject name.
    #[instrument(skip(db))]
    pub async fn approved(
        db: &PgPool,
        query: &ApprovedNotesQuery,
    ) -> Result<Vec<NoteView>, AppError> {
        sqlx::query_as::<_, NoteView>(&format!(
            r#"{NOTE_VIEW_SELECT}
               WHERE n.status = 'approved'
                 AND ($1::TEXT IS NULL OR c.class_name = $1)
                 AND ($2::TEXT IS NULL OR LOWER(s.subject_name) = LOWER($2))
               ORDER BY c.class_name, s.subject_name, n.created_at DESC"#
        ))
        .bind(query.class_name.as_deref().map(str::trim))
        .bind(query.subject_name.as_deref().map(str::trim))
        .fetch_all(db)
        .await
        .context("Failed to fetch approved notes")
        .map_err(AppError::database)
    }

    /// Approved notes of a class, optionally for one subject.
    #[instrument(skip(db))]
    pub async fn class_notes(
        db: &PgPool,
        class_id: ClassId,
        subject_name: Option<&str>,
    ) -> Result<Vec<NoteView>, AppError> {
        sqlx::query_as::<_, NoteView>(&format!(
            r#"{NOTE_VIEW_SELECT}
               WHERE n.status = 'approved' AND n.class_id = $1
                 AND ($2::TEXT IS NULL OR LOWER(s.subject_name) = LOWER($2))
               ORDER BY s.subject_name, n.created_at DESC"#
        ))
        .bind(class_id)
        .bind(subject_name.map(str::trim))
        .fetch_all(db)
        .await
        .context("Failed to fetch class notes")
        .map_err(AppError::database)
    }

    /// Number of the teacher's notes per class and subject.
    #[instrument(skip(db))]
    pub async fn note_counts(db: &PgPool, teacher_id: UserId) -> Result<Vec<NoteCount>, AppError> {
        sqlx::query_as::<_, NoteCount>(
            r#"SELECT n.class_id, c.class_name, n.subject_id, s.subject_name, COUNT(*) AS count
               FROM notes n
               JOIN classes c ON c.id = n.class_id
               JOIN subjects s ON s.id = n.subject_id
               WHERE n.uploaded_by = $1
               GROUP BY n.class_id, c.class_name, n.subject_id, s.subject_name
               ORDER BY c.class_name, s.subject_name"#,
        )
        .bind(teacher_id)
        .fetch_all(db)
        .await
        .context("Failed to count notes")
        .map_err(AppError::database)
    }

    #[instrument(skip(state))]
    pub async fn download(
        state: &AppState,
        id: NoteId,
        reader: NoteReader,
    ) -> Result<FileDownload, AppError> {
        let note = sqlx::query_as::<_, Note>("SELECT * FROM notes WHERE id = $1")
            .bind(id)
            .fetch_optional(&state.db)
            .await
            .context("Failed to fetch note")
            .map_err(AppError::database)?
            .ok_or_else(|| AppError::not_found(anyhow!("Note not found")))?;

        if !can_download(&note, &reader) {
            return Err(AppError::forbidden("You do not have access to this note"));
        }

        let bytes = state
            .storage
            .read(&note.file_key)
            .await
            .map_err(|e| e.into_app_error())?;
        Ok(FileDownload::new(note.file_name, note.file_mime_type, bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use schoolhub_models::SubjectId;

    fn note(status: ApprovalStatus, uploaded_by: UserId, class_id: ClassId) -> Note {
        Note {
            id: NoteId::new(),
            title: "Fractions".to_string(),
            description: None,
            subject_id: SubjectId::new(),
            class_id,
            uploaded_by,
            file_key: "notes/x.pdf".to_string(),
            file_name: "x.pdf".to_string(),
            file_mime_type: "application/pdf".to_string(),
            file_size: 3,
            status,
            rejection_reason: None,
            approved_by: None,
            approved_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn reader(role: UserRole, class_id: Option<ClassId>) -> NoteReader {
        NoteReader {
            id: UserId::new(),
            role,
            class_id,
        }
    }

    #[test]
    fn test_pending_note_only_for_admin_and_uploader() {
        let uploader = UserId::new();
        let class_id = ClassId::new();
        let pending = note(ApprovalStatus::Pending, uploader, class_id);

        assert!(can_download(&pending, &reader(UserRole::Admin, None)));
        assert!(!can_download(&pending, &reader(UserRole::Teacher, None)));
        assert!(!can_download(&pending, &reader(UserRole::Student, Some(class_id))));

        let own = NoteReader {
            id: uploader,
            role: UserRole::Teacher,
            class_id: None,
        };
        assert!(can_download(&pending, &own));
    }

    #[test]
    fn test_students_limited_to_their_class() {
        let class_id = ClassId::new();
        let approved = note(ApprovalStatus::Approved, UserId::new(), class_id);

        assert!(can_download(&approved, &reader(UserRole::Student, Some(class_id))));
        assert!(!can_download(&approved, &reader(UserRole::Student, Some(ClassId::new()))));
        assert!(!can_download(&approved, &reader(UserRole::Student, None)));
        assert!(!can_download(&approved, &reader(UserRole::Parent, None)));
    }
}
