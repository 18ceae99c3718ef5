//! Teacher notes awaiting or past moderation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::ids::{ClassId, NoteId, SubjectId, UserId};
use crate::status::ApprovalStatus;

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    pub description: Option<String>,
    pub subject_id: SubjectId,
    pub class_id: ClassId,
    pub uploaded_by: UserId,
    #[serde(skip)]
    pub file_key: String,
    pub file_name: String,
    pub file_mime_type: String,
    pub file_size: i64,
    pub status: ApprovalStatus,
    pub rejection_reason: Option<String>,
    pub approved_by: Option<UserId>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A note joined with its class, subject and uploader names.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NoteView {
    pub id: NoteId,
    pub title: String,
    pub description: Option<String>,
    pub subject_id: SubjectId,
    pub subject_name: String,
    pub class_id: ClassId,
    pub class_name: String,
    pub uploaded_by: UserId,
    pub teacher_name: String,
    pub file_name: String,
    pub file_mime_type: String,
    pub file_size: i64,
    pub status: ApprovalStatus,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Text fields of the multipart note upload.
#[derive(Debug, Default, Validate)]
pub struct UploadNoteForm {
    #[validate(length(min = 1, max = 255, message = "Title is required"))]
    pub title: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(length(min = 1, message = "Subject name is required"))]
    pub subject_name: String,
    #[validate(length(min = 1, message = "Class name is required"))]
    pub class_name: String,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ApprovedNotesQuery {
    pub class_name: Option<String>,
    pub subject_name: Option<String>,
}

/// Approved notes of one subject, for the student notes page.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubjectNotes {
    pub subject_id: SubjectId,
    pub subject_name: String,
    pub notes: Vec<NoteView>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NoteCount {
    pub class_id: ClassId,
    pub class_name: String,
    pub subject_id: SubjectId,
    pub subject_name: String,
    pub count: i64,
}

/// Groups notes by subject, keeping the order in which subjects first appear.
pub fn group_by_subject(notes: Vec<NoteView>) -> Vec<SubjectNotes> {
    let mut groups: Vec<SubjectNotes> = Vec::new();
    for note in notes {
        match groups.iter_mut().find(|g| g.subject_id == note.subject_id) {
            Some(group) => group.notes.push(note),
            None => groups.push(SubjectNotes {
                subject_id: note.subject_id,
                subject_name: note.subject_name.clone(),
                notes: vec![note],
            }),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(subject_id: SubjectId, subject_name: &str, title: &str) -> NoteView {
        NoteView {
            id: NoteId::new(),
            title: title.to_string(),
            description: None,
            subject_id,
            subject_name: subject_name.to_string(),
            class_id: ClassId::new(),
            class_name: "6".to_string(),
            uploaded_by: UserId::new(),
            teacher_name: "R. Iyer".to_string(),
            file_name: "n.pdf".to_string(),
            file_mime_type: "application/pdf".to_string(),
            file_size: 10,
            status: ApprovalStatus::Approved,
            rejection_reason: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_group_by_subject() {
        let maths = SubjectId::new();
        let science = SubjectId::new();
        let groups = group_by_subject(vec![
            note(maths, "Mathematics", "Fractions"),
            note(science, "Science", "Plants"),
            note(maths, "Mathematics", "Decimals"),
        ]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].subject_name, "Mathematics");
        assert_eq!(groups[0].notes.len(), 2);
        assert_eq!(groups[1].notes[0].title, "Plants");
    }

    #[test]
    fn test_upload_form_requires_title() {
        let form = UploadNoteForm {
            subject_name: "Science".to_string(),
            class_name: "6".to_string(),
            ..Default::default()
        };
        assert!(form.validate().is_err());
    }
}
