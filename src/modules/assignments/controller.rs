use anyhow::anyhow;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use tracing::instrument;
use validator::Validate;

use schoolhub_config::SchedulerConfig;
use schoolhub_core::AppError;
use schoolhub_core::errors::ErrorBody;
use schoolhub_models::assignments::{
    AssignmentView, CreateAssignmentForm, GradeSubmissionDto, SubmitAssignmentResponse,
    Submission, SubmissionView, SubmittedAssignment,
};
use schoolhub_models::{AssignmentId, SubmissionId};

use crate::download::FileDownload;
use crate::middleware::auth::{StudentUser, TeacherUser};
use crate::modules::students::StudentService;
use crate::multipart::MultipartForm;
use crate::scheduler::school_offset;
use crate::state::AppState;
use crate::validator::{ValidatedJson, validation_error};

use super::service::{AssignmentService, class_of};

/// Accepts RFC 3339, a local `YYYY-MM-DDTHH:MM[:SS]` or a plain date, which
/// means the end of that day at the school.
pub fn parse_due_date(raw: &str, config: &SchedulerConfig) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    let offset = school_offset(config);
    let local = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(23, 59, 59))
        })?;
    offset
        .from_local_datetime(&local)
        .single()
        .map(|due| due.with_timezone(&Utc))
}

fn assignment_form(
    form: &MultipartForm,
    config: &SchedulerConfig,
) -> Result<CreateAssignmentForm, AppError> {
    let due_date = match form.text("dueDate") {
        Some(raw) => Some(parse_due_date(&raw, config).ok_or_else(|| {
            AppError::bad_request(anyhow!("dueDate must be a date or an RFC 3339 timestamp"))
        })?),
        None => None,
    };

    let parsed = CreateAssignmentForm {
        title: form.text("title").unwrap_or_default(),
        description: form.text("description"),
        subject_name: form.text_any(&["subjectName", "subject"]).unwrap_or_default(),
        class_name: form.text_any(&["className", "class"]).unwrap_or_default(),
        due_date,
    };
    parsed.validate().map_err(|e| validation_error(&e))?;
    Ok(parsed)
}

/// Upload an assignment file for a class
///
/// Multipart fields: `title`, `description`, `subjectName`, `className`,
/// `dueDate` and the PDF or Word document as `file`.
#[utoipa::path(
    post,
    path = "/api/teacher/assignments",
    request_body(content_type = "multipart/form-data", description = "Assignment fields and file"),
    responses(
        (status = 201, description = "Assignment created", body = AssignmentView),
        (status = 400, description = "Missing field, unsupported type or file too large", body = ErrorBody),
        (status = 404, description = "Class or subject not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Teacher"
)]
#[instrument(skip(state, teacher, form))]
pub async fn create_assignment(
    State(state): State<AppState>,
    teacher: TeacherUser,
    mut form: MultipartForm,
) -> Result<(StatusCode, Json<AssignmentView>), AppError> {
    let fields = assignment_form(&form, &state.scheduler_config)?;
    let file = form.require_file("file", "Assignment file is required")?;
    let assignment = AssignmentService::create(&state, teacher.user_id()?, fields, file).await?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

#[utoipa::path(
    get,
    path = "/api/teacher/assignments",
    responses((status = 200, description = "Assignments uploaded by the caller", body = Vec<AssignmentView>)),
    security(("bearer_auth" = [])),
    tag = "Teacher"
)]
#[instrument(skip(state, teacher))]
pub async fn my_assignments(
    State(state): State<AppState>,
    teacher: TeacherUser,
) -> Result<Json<Vec<AssignmentView>>, AppError> {
    Ok(Json(
        AssignmentService::teacher_assignments(&state.db, teacher.user_id()?).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/teacher/assignments/{id}/download",
    params(("id" = AssignmentId, Path, description = "Assignment ID")),
    responses(
        (status = 200, description = "Assignment file", content_type = "application/octet-stream"),
        (status = 403, description = "Not the caller's assignment", body = ErrorBody),
        (status = 404, description = "Assignment not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Teacher"
)]
#[instrument(skip(state, teacher))]
pub async fn teacher_download(
    State(state): State<AppState>,
    teacher: TeacherUser,
    Path(id): Path<AssignmentId>,
) -> Result<FileDownload, AppError> {
    AssignmentService::download_for_teacher(&state.db, teacher.user_id()?, id).await
}

/// Submissions for one of the caller's assignments
#[utoipa::path(
    get,
    path = "/api/teacher/assignments/{id}/submissions",
    params(("id" = AssignmentId, Path, description = "Assignment ID")),
    responses(
        (status = 200, description = "Submissions", body = Vec<SubmissionView>),
        (status = 403, description = "Not the caller's assignment", body = ErrorBody),
        (status = 404, description = "Assignment not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Teacher"
)]
#[instrument(skip(state, teacher))]
pub async fn submissions(
    State(state): State<AppState>,
    teacher: TeacherUser,
    Path(id): Path<AssignmentId>,
) -> Result<Json<Vec<SubmissionView>>, AppError> {
    Ok(Json(
        AssignmentService::submissions_of(&state.db, teacher.user_id()?, id).await?,
    ))
}

/// Grade a submission
#[utoipa::path(
    put,
    path = "/api/teacher/submissions/{id}/grade",
    params(("id" = SubmissionId, Path, description = "Submission ID")),
    request_body = GradeSubmissionDto,
    responses(
        (status = 200, description = "Submission graded", body = Submission),
        (status = 403, description = "Not the caller's assignment", body = ErrorBody),
        (status = 404, description = "Submission not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Teacher"
)]
#[instrument(skip(state, teacher, dto))]
pub async fn grade_submission(
    State(state): State<AppState>,
    teacher: TeacherUser,
    Path(id): Path<SubmissionId>,
    ValidatedJson(dto): ValidatedJson<GradeSubmissionDto>,
) -> Result<Json<Submission>, AppError> {
    Ok(Json(
        AssignmentService::grade(&state.db, teacher.user_id()?, id, dto).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/teacher/submissions/{id}/download",
    params(("id" = SubmissionId, Path, description = "Submission ID")),
    responses(
        (status = 200, description = "Submitted file", content_type = "application/octet-stream"),
        (status = 403, description = "Not the caller's assignment", body = ErrorBody),
        (status = 404, description = "Submission not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Teacher"
)]
#[instrument(skip(state, teacher))]
pub async fn download_submission(
    State(state): State<AppState>,
    teacher: TeacherUser,
    Path(id): Path<SubmissionId>,
) -> Result<FileDownload, AppError> {
    AssignmentService::download_submission(&state.db, teacher.user_id()?, id).await
}

/// Active assignments of the caller's class
#[utoipa::path(
    get,
    path = "/api/student/assignments",
    responses(
        (status = 200, description = "Class assignments", body = Vec<AssignmentView>),
        (status = 400, description = "Student has no class", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
#[instrument(skip(state, student))]
pub async fn class_assignments(
    State(state): State<AppState>,
    student: StudentUser,
) -> Result<Json<Vec<AssignmentView>>, AppError> {
    let me = StudentService::load(&state.db, student.user_id()?).await?;
    Ok(Json(
        AssignmentService::class_assignments(&state.db, class_of(&me)?).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/student/assignments/pending",
    responses((status = 200, description = "Assignments not yet submitted", body = Vec<AssignmentView>)),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
#[instrument(skip(state, student))]
pub async fn pending_assignments(
    State(state): State<AppState>,
    student: StudentUser,
) -> Result<Json<Vec<AssignmentView>>, AppError> {
    let me = StudentService::load(&state.db, student.user_id()?).await?;
    Ok(Json(AssignmentService::pending_for(&state.db, &me).await?))
}

#[utoipa::path(
    get,
    path = "/api/student/assignments/submitted",
    responses((status = 200, description = "The caller's submissions", body = Vec<SubmittedAssignment>)),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
#[instrument(skip(state, student))]
pub async fn submitted_assignments(
    State(state): State<AppState>,
    student: StudentUser,
) -> Result<Json<Vec<SubmittedAssignment>>, AppError> {
    Ok(Json(
        AssignmentService::submitted_by(&state.db, student.user_id()?).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/student/assignments/{id}/download",
    params(("id" = AssignmentId, Path, description = "Assignment ID")),
    responses(
        (status = 200, description = "Assignment file", content_type = "application/octet-stream"),
        (status = 403, description = "Assignment is for another class", body = ErrorBody),
        (status = 404, description = "Assignment not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
#[instrument(skip(state, student))]
pub async fn student_download(
    State(state): State<AppState>,
    student: StudentUser,
    Path(id): Path<AssignmentId>,
) -> Result<FileDownload, AppError> {
    let me = StudentService::load(&state.db, student.user_id()?).await?;
    AssignmentService::download_for_student(&state.db, &me, id).await
}

/// Submit an assignment
///
/// Multipart with the answer as `file` and optional `content` text. A
/// submission before the due date marks the caller present for the
/// assignment's subject today.
#[utoipa::path(
    post,
    path = "/api/student/assignments/{id}/submit",
    params(("id" = AssignmentId, Path, description = "Assignment ID")),
    request_body(content_type = "multipart/form-data", description = "Submission file"),
    responses(
        (status = 201, description = "Submission stored", body = SubmitAssignmentResponse),
        (status = 400, description = "File missing", body = ErrorBody),
        (status = 403, description = "Assignment is for another class", body = ErrorBody),
        (status = 404, description = "Assignment not found", body = ErrorBody),
        (status = 409, description = "Already submitted", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
#[instrument(skip(state, student, form))]
pub async fn submit_assignment(
    State(state): State<AppState>,
    student: StudentUser,
    Path(id): Path<AssignmentId>,
    mut form: MultipartForm,
) -> Result<(StatusCode, Json<SubmitAssignmentResponse>), AppError> {
    let me = StudentService::load(&state.db, student.user_id()?).await?;
    let file = form.require_file("file", "Submission file is required")?;
    let content = form.text("content");
    let response = AssignmentService::submit(&state, &me, id, file, content).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_due_date_formats() {
        let config = SchedulerConfig::default();
        assert_eq!(
            parse_due_date("2026-10-20T10:00:00Z", &config).unwrap().to_rfc3339(),
            "2026-10-20T10:00:00+00:00"
        );
        // Local 10:00 at UTC+05:30.
        assert_eq!(
            parse_due_date("2026-10-20T10:00", &config).unwrap().to_rfc3339(),
            "2026-10-20T04:30:00+00:00"
        );
        assert_eq!(
            parse_due_date("2026-10-20", &config).unwrap().to_rfc3339(),
            "2026-10-20T18:29:59+00:00"
        );
        assert!(parse_due_date("next friday", &config).is_none());
    }

    #[test]
    fn test_form_requires_title() {
        let form = MultipartForm::from_parts(
            &[("subjectName", "Science"), ("className", "Class 6")],
            vec![],
        );
        let err = assignment_form(&form, &SchedulerConfig::default()).unwrap_err();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_form_accepts_short_field_names() {
        let form = MultipartForm::from_parts(
            &[
                ("title", "Fractions worksheet"),
                ("subject", "Maths"),
                ("class", "Class 6"),
                ("dueDate", "2026-10-21"),
            ],
            vec![],
        );
        let parsed = assignment_form(&form, &SchedulerConfig::default()).unwrap();
        assert_eq!(parsed.subject_name, "Maths");
        assert_eq!(parsed.class_name, "Class 6");
        assert!(parsed.due_date.is_some());
    }
}
