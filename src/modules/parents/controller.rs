use anyhow::anyhow;
use axum::{
    Json,
    extract::{Path, Query, State},
};
use tracing::instrument;

use schoolhub_core::AppError;
use schoolhub_core::errors::ErrorBody;
use schoolhub_models::academics::{ClassWithSubjects, Subject};
use schoolhub_models::assessments::{MarkView, TestView};
use schoolhub_models::assignments::{AssignmentView, SubmittedAssignment, UpcomingDeadlines};
use schoolhub_models::attendance::{AttendanceQuery, AttendanceRecord, SubjectAttendanceSummary};
use schoolhub_models::notes::{SubjectNotes, group_by_subject};
use schoolhub_models::users::{LinkedStudentInfo, ParentWithStudents};
use schoolhub_models::{UserProfile, UserRole};

use crate::middleware::auth::{LinkedChild, ParentUser};
use crate::modules::assignments::AssignmentService;
use crate::modules::assignments::service::class_of;
use crate::modules::notes::NoteService;
use crate::modules::students::StudentService;
use crate::modules::users::UserService;
use crate::state::AppState;

use super::service::ParentService;

#[utoipa::path(
    get,
    path = "/api/parent/profile",
    responses(
        (status = 200, description = "Parent profile with linked students", body = ParentWithStudents),
        (status = 403, description = "Parents only", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Parent"
)]
#[instrument(skip(state, parent))]
pub async fn profile(
    State(state): State<AppState>,
    parent: ParentUser,
) -> Result<Json<ParentWithStudents>, AppError> {
    let parent_id = parent.user_id()?;
    let me = UserService::find_by_id(&state.db, parent_id)
        .await?
        .filter(|user| user.role == UserRole::Parent)
        .ok_or_else(|| AppError::not_found(anyhow!("Parent not found")))?;
    Ok(Json(ParentWithStudents {
        parent: UserProfile::from(me),
        linked_students: ParentService::linked_students(&state.db, parent_id).await?,
    }))
}

#[utoipa::path(
    get,
    path = "/api/parent/children",
    responses((status = 200, description = "Linked students", body = Vec<LinkedStudentInfo>)),
    security(("bearer_auth" = [])),
    tag = "Parent"
)]
#[instrument(skip(state, parent))]
pub async fn children(
    State(state): State<AppState>,
    parent: ParentUser,
) -> Result<Json<Vec<LinkedStudentInfo>>, AppError> {
    Ok(Json(
        ParentService::linked_students(&state.db, parent.user_id()?).await?,
    ))
}

/// Profile of a linked student
#[utoipa::path(
    get,
    path = "/api/parent/child/{role_number}/profile",
    params(("role_number" = String, Path, description = "Student role number")),
    responses(
        (status = 200, description = "Student profile", body = UserProfile),
        (status = 403, description = "Not linked to this student", body = ErrorBody),
        (status = 404, description = "Student not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Parent"
)]
#[instrument(skip(child))]
pub async fn child_profile(child: LinkedChild) -> Result<Json<UserProfile>, AppError> {
    Ok(Json(UserProfile::from(child.student)))
}

#[utoipa::path(
    get,
    path = "/api/parent/child/{role_number}/class",
    params(("role_number" = String, Path, description = "Student role number")),
    responses((status = 200, description = "Class and subjects", body = ClassWithSubjects)),
    security(("bearer_auth" = [])),
    tag = "Parent"
)]
#[instrument(skip(state, child))]
pub async fn child_class(
    State(state): State<AppState>,
    child: LinkedChild,
) -> Result<Json<ClassWithSubjects>, AppError> {
    Ok(Json(StudentService::class(&state.db, &child.student).await?))
}

#[utoipa::path(
    get,
    path = "/api/parent/child/{role_number}/subjects",
    params(("role_number" = String, Path, description = "Student role number")),
    responses((status = 200, description = "Subjects of the student's class", body = Vec<Subject>)),
    security(("bearer_auth" = [])),
    tag = "Parent"
)]
#[instrument(skip(state, child))]
pub async fn child_subjects(
    State(state): State<AppState>,
    child: LinkedChild,
) -> Result<Json<Vec<Subject>>, AppError> {
    Ok(Json(StudentService::subjects(&state.db, &child.student).await?))
}

#[utoipa::path(
    get,
    path = "/api/parent/child/{role_number}/attendance",
    params(("role_number" = String, Path, description = "Student role number"), AttendanceQuery),
    responses((status = 200, description = "Attendance rows", body = Vec<AttendanceRecord>)),
    security(("bearer_auth" = [])),
    tag = "Parent"
)]
#[instrument(skip(state, child))]
pub async fn child_attendance(
    State(state): State<AppState>,
    child: LinkedChild,
    Query(query): Query<AttendanceQuery>,
) -> Result<Json<Vec<AttendanceRecord>>, AppError> {
    Ok(Json(
        StudentService::attendance(&state.db, &child.student, &query).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/parent/child/{role_number}/attendance/summary",
    params(("role_number" = String, Path, description = "Student role number")),
    responses((status = 200, description = "Per subject attendance percentages", body = Vec<SubjectAttendanceSummary>)),
    security(("bearer_auth" = [])),
    tag = "Parent"
)]
#[instrument(skip(state, child))]
pub async fn child_attendance_summary(
    State(state): State<AppState>,
    child: LinkedChild,
) -> Result<Json<Vec<SubjectAttendanceSummary>>, AppError> {
    Ok(Json(
        StudentService::attendance_summary(&state.db, &child.student).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/parent/child/{role_number}/tests",
    params(("role_number" = String, Path, description = "Student role number")),
    responses((status = 200, description = "Tests of the student's class", body = Vec<TestView>)),
    security(("bearer_auth" = [])),
    tag = "Parent"
)]
#[instrument(skip(state, child))]
pub async fn child_tests(
    State(state): State<AppState>,
    child: LinkedChild,
) -> Result<Json<Vec<TestView>>, AppError> {
    Ok(Json(StudentService::tests(&state.db, &child.student).await?))
}

#[utoipa::path(
    get,
    path = "/api/parent/child/{role_number}/marks/{subject_name}",
    params(
        ("role_number" = String, Path, description = "Student role number"),
        ("subject_name" = String, Path, description = "Subject name")
    ),
    responses(
        (status = 200, description = "Results in the subject", body = Vec<MarkView>),
        (status = 404, description = "Subject not found in this class", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Parent"
)]
#[instrument(skip(state, child))]
pub async fn child_marks(
    State(state): State<AppState>,
    child: LinkedChild,
    Path((_role_number, subject_name)): Path<(String, String)>,
) -> Result<Json<Vec<MarkView>>, AppError> {
    Ok(Json(
        StudentService::marks(&state.db, &child.student, &subject_name).await?,
    ))
}

/// Approved notes of the student's class, grouped by subject
#[utoipa::path(
    get,
    path = "/api/parent/child/{role_number}/notes",
    params(("role_number" = String, Path, description = "Student role number")),
    responses((status = 200, description = "Notes grouped by subject", body = Vec<SubjectNotes>)),
    security(("bearer_auth" = [])),
    tag = "Parent"
)]
#[instrument(skip(state, child))]
pub async fn child_notes(
    State(state): State<AppState>,
    child: LinkedChild,
) -> Result<Json<Vec<SubjectNotes>>, AppError> {
    let notes = NoteService::class_notes(&state.db, class_of(&child.student)?, None).await?;
    Ok(Json(group_by_subject(notes)))
}

#[utoipa::path(
    get,
    path = "/api/parent/child/{role_number}/assignments/pending",
    params(("role_number" = String, Path, description = "Student role number")),
    responses((status = 200, description = "Assignments not yet submitted", body = Vec<AssignmentView>)),
    security(("bearer_auth" = [])),
    tag = "Parent"
)]
#[instrument(skip(state, child))]
pub async fn child_pending_assignments(
    State(state): State<AppState>,
    child: LinkedChild,
) -> Result<Json<Vec<AssignmentView>>, AppError> {
    Ok(Json(
        AssignmentService::pending_for(&state.db, &child.student).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/parent/child/{role_number}/assignments/submitted",
    params(("role_number" = String, Path, description = "Student role number")),
    responses((status = 200, description = "Submissions with grades", body = Vec<SubmittedAssignment>)),
    security(("bearer_auth" = [])),
    tag = "Parent"
)]
#[instrument(skip(state, child))]
pub async fn child_submitted_assignments(
    State(state): State<AppState>,
    child: LinkedChild,
) -> Result<Json<Vec<SubmittedAssignment>>, AppError> {
    Ok(Json(
        AssignmentService::submitted_by(&state.db, child.student.id).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/parent/child/{role_number}/deadlines",
    params(("role_number" = String, Path, description = "Student role number")),
    responses((status = 200, description = "Upcoming deadlines", body = UpcomingDeadlines)),
    security(("bearer_auth" = [])),
    tag = "Parent"
)]
#[instrument(skip(state, child))]
pub async fn child_deadlines(
    State(state): State<AppState>,
    child: LinkedChild,
) -> Result<Json<UpcomingDeadlines>, AppError> {
    Ok(Json(
        StudentService::deadlines(&state.db, &child.student, &state.scheduler_config).await?,
    ))
}
