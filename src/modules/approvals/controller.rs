use axum::{
    Json,
    extract::{Path, Query, State},
};
use tracing::instrument;

use schoolhub_core::errors::ErrorBody;
use schoolhub_core::{AppError, PageParams, Paginated};
use schoolhub_models::users::{
    CountResponse, ParentWithStudents, RejectDto, StudentApprovalResponse, StudentSummary,
    TeacherSummary,
};
use schoolhub_models::{UserId, UserProfile};

use crate::metrics::track_registration;
use crate::middleware::auth::AdminUser;
use crate::modules::moderation::{Decision, ModerationError};
use crate::modules::parents::service::ParentService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

use super::service::ApprovalService;

/// List teachers awaiting approval
#[utoipa::path(
    get,
    path = "/api/admin/teachers/pending",
    responses(
        (status = 200, description = "Pending teachers", body = Vec<TeacherSummary>),
        (status = 403, description = "Admins only", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
#[instrument(skip(state))]
pub async fn pending_teachers(
    State(state): State<AppState>,
) -> Result<Json<Vec<TeacherSummary>>, AppError> {
    Ok(Json(ApprovalService::pending_teachers(&state.db).await?))
}

/// List all teachers
#[utoipa::path(
    get,
    path = "/api/admin/teachers",
    params(PageParams),
    responses(
        (status = 200, description = "Teachers", body = Paginated<TeacherSummary>),
        (status = 403, description = "Admins only", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
#[instrument(skip(state))]
pub async fn list_teachers(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<Paginated<TeacherSummary>>, AppError> {
    Ok(Json(ApprovalService::list_teachers(&state.db, &params).await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/teachers/{email}",
    params(("email" = String, Path, description = "Teacher email")),
    responses(
        (status = 200, description = "Teacher profile", body = UserProfile),
        (status = 404, description = "Teacher not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
#[instrument(skip(state))]
pub async fn get_teacher(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<UserProfile>, AppError> {
    Ok(Json(ApprovalService::teacher_by_email(&state.db, &email).await?))
}

/// Approve a pending teacher
#[utoipa::path(
    put,
    path = "/api/admin/teachers/{email}/approve",
    params(("email" = String, Path, description = "Teacher email")),
    responses(
        (status = 200, description = "Teacher approved", body = UserProfile),
        (status = 404, description = "No pending teacher with this email", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
#[instrument(skip(state, admin))]
pub async fn approve_teacher(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(email): Path<String>,
) -> Result<Json<UserProfile>, AppError> {
    let teacher =
        ApprovalService::decide_teacher(&state, &email, admin.user_id()?, Decision::Approve)
            .await?;
    Ok(Json(teacher))
}

/// Reject a pending teacher
#[utoipa::path(
    put,
    path = "/api/admin/teachers/{email}/reject",
    params(("email" = String, Path, description = "Teacher email")),
    request_body = RejectDto,
    responses(
        (status = 200, description = "Teacher rejected", body = UserProfile),
        (status = 400, description = "Rejection reason is required", body = ErrorBody),
        (status = 404, description = "No pending teacher with this email", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
#[instrument(skip(state, admin, dto))]
pub async fn reject_teacher(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(email): Path<String>,
    ValidatedJson(dto): ValidatedJson<RejectDto>,
) -> Result<Json<UserProfile>, AppError> {
    let decision = Decision::reject(&dto.reason).map_err(ModerationError::into_app_error)?;
    let teacher =
        ApprovalService::decide_teacher(&state, &email, admin.user_id()?, decision).await?;
    Ok(Json(teacher))
}

/// List admission requests awaiting approval
#[utoipa::path(
    get,
    path = "/api/admin/students/pending",
    responses(
        (status = 200, description = "Pending students", body = Vec<StudentSummary>),
        (status = 403, description = "Admins only", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
#[instrument(skip(state))]
pub async fn pending_students(
    State(state): State<AppState>,
) -> Result<Json<Vec<StudentSummary>>, AppError> {
    Ok(Json(ApprovalService::pending_students(&state.db).await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/students",
    params(PageParams),
    responses(
        (status = 200, description = "Students", body = Paginated<StudentSummary>),
        (status = 403, description = "Admins only", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
#[instrument(skip(state))]
pub async fn list_students(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<Paginated<StudentSummary>>, AppError> {
    Ok(Json(ApprovalService::list_students(&state.db, &params).await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/students/count",
    responses(
        (status = 200, description = "Number of students", body = CountResponse),
        (status = 403, description = "Admins only", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
#[instrument(skip(state))]
pub async fn count_students(State(state): State<AppState>) -> Result<Json<CountResponse>, AppError> {
    let count = ApprovalService::count_students(&state.db).await?;
    Ok(Json(CountResponse { count }))
}

/// Approve an admission request
///
/// Assigns a role number when the student has none, makes the role number the
/// initial password and provisions the parent account named in the request.
#[utoipa::path(
    post,
    path = "/api/admin/students/{id}/approve",
    params(("id" = UserId, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Student approved", body = StudentApprovalResponse),
        (status = 404, description = "No pending student with this ID", body = ErrorBody),
        (status = 409, description = "Role number collision", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
#[instrument(skip(state, admin))]
pub async fn approve_student(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<UserId>,
) -> Result<Json<StudentApprovalResponse>, AppError> {
    let approval = ApprovalService::approve_student(&state, id, admin.user_id()?).await?;

    let parent_created = approval.parent.as_ref().is_some_and(|p| p.created);
    if parent_created {
        track_registration(schoolhub_auth::UserRole::Parent);
    }

    Ok(Json(StudentApprovalResponse {
        message: "Student approved successfully".to_string(),
        student: UserProfile::from(&approval.student),
        parent_email: approval.parent.map(|p| p.email),
        parent_account_created: parent_created,
    }))
}

/// Reject an admission request
#[utoipa::path(
    post,
    path = "/api/admin/students/{id}/reject",
    params(("id" = UserId, Path, description = "Student ID")),
    request_body = RejectDto,
    responses(
        (status = 200, description = "Student rejected", body = UserProfile),
        (status = 400, description = "Rejection reason is required", body = ErrorBody),
        (status = 404, description = "No pending student with this ID", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
#[instrument(skip(state, admin, dto))]
pub async fn reject_student(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<UserId>,
    ValidatedJson(dto): ValidatedJson<RejectDto>,
) -> Result<Json<UserProfile>, AppError> {
    let student =
        ApprovalService::reject_student(&state, id, admin.user_id()?, &dto.reason).await?;
    Ok(Json(UserProfile::from(student)))
}

#[utoipa::path(
    get,
    path = "/api/admin/parents",
    params(PageParams),
    responses(
        (status = 200, description = "Parents", body = Paginated<UserProfile>),
        (status = 403, description = "Admins only", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
#[instrument(skip(state))]
pub async fn list_parents(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<Paginated<UserProfile>>, AppError> {
    Ok(Json(ParentService::list_parents(&state.db, &params).await?))
}

/// List parents with their linked students
#[utoipa::path(
    get,
    path = "/api/admin/parents/with-students",
    responses(
        (status = 200, description = "Parents and linked students", body = Vec<ParentWithStudents>),
        (status = 403, description = "Admins only", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
#[instrument(skip(state))]
pub async fn parents_with_students(
    State(state): State<AppState>,
) -> Result<Json<Vec<ParentWithStudents>>, AppError> {
    Ok(Json(ParentService::parents_with_students(&state.db).await?))
}
