use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;
use utoipa::IntoParams;

use schoolhub_core::AppError;
use schoolhub_core::errors::ErrorBody;
use schoolhub_models::scheduled_subjects::{
    RequestSubjectDto, ScheduledSubject, ScheduledSubjectView,
};
use schoolhub_models::{ApprovalStatus, UserId};

use crate::middleware::auth::{AdminUser, TeacherUser};
use crate::state::AppState;
use crate::validator::ValidatedJson;

use super::service::ScheduledSubjectService;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StatusFilter {
    /// `pending`, `approved` or `rejected`
    pub status: Option<ApprovalStatus>,
}

/// Ask to teach a subject in a class
#[utoipa::path(
    post,
    path = "/api/teacher/scheduled-subjects",
    request_body = RequestSubjectDto,
    responses(
        (status = 201, description = "Request recorded, pending review", body = ScheduledSubject),
        (status = 400, description = "Subject is not taught in the class", body = ErrorBody),
        (status = 404, description = "Class or subject not found", body = ErrorBody),
        (status = 409, description = "Already requested", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Teacher"
)]
#[instrument(skip(state, teacher, dto))]
pub async fn request_subject(
    State(state): State<AppState>,
    teacher: TeacherUser,
    ValidatedJson(dto): ValidatedJson<RequestSubjectDto>,
) -> Result<(StatusCode, Json<ScheduledSubject>), AppError> {
    let request = ScheduledSubjectService::request(&state.db, teacher.user_id()?, &dto).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

#[utoipa::path(
    get,
    path = "/api/teacher/scheduled-subjects",
    params(StatusFilter),
    responses((status = 200, description = "The caller's subject requests", body = Vec<ScheduledSubjectView>)),
    security(("bearer_auth" = [])),
    tag = "Teacher"
)]
#[instrument(skip(state, teacher))]
pub async fn my_subjects(
    State(state): State<AppState>,
    teacher: TeacherUser,
    Query(filter): Query<StatusFilter>,
) -> Result<Json<Vec<ScheduledSubjectView>>, AppError> {
    Ok(Json(
        ScheduledSubjectService::for_teacher(&state.db, teacher.user_id()?, filter.status).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/admin/scheduled-subjects",
    params(StatusFilter),
    responses((status = 200, description = "All subject requests", body = Vec<ScheduledSubjectView>)),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
#[instrument(skip(state, _admin))]
pub async fn list_scheduled_subjects(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(filter): Query<StatusFilter>,
) -> Result<Json<Vec<ScheduledSubjectView>>, AppError> {
    Ok(Json(ScheduledSubjectService::list_all(&state.db, filter.status).await?))
}

/// Subjects requested by one teacher
#[utoipa::path(
    get,
    path = "/api/admin/scheduled-subjects/teacher/{teacher_id}",
    params(("teacher_id" = UserId, Path, description = "Teacher ID"), StatusFilter),
    responses((status = 200, description = "The teacher's subject requests", body = Vec<ScheduledSubjectView>)),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
#[instrument(skip(state, _admin))]
pub async fn teacher_subjects(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(teacher_id): Path<UserId>,
    Query(filter): Query<StatusFilter>,
) -> Result<Json<Vec<ScheduledSubjectView>>, AppError> {
    Ok(Json(
        ScheduledSubjectService::for_teacher(&state.db, teacher_id, filter.status).await?,
    ))
}
