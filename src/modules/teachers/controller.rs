use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;

use schoolhub_core::AppError;
use schoolhub_core::errors::ErrorBody;
use schoolhub_models::UserProfile;
use schoolhub_models::users::{ClassRoster, UpdateSpecializationDto};

use crate::middleware::auth::TeacherUser;
use crate::state::AppState;
use crate::validator::ValidatedJson;

use super::service::TeacherService;

#[utoipa::path(
    get,
    path = "/api/teacher/profile",
    responses(
        (status = 200, description = "Teacher profile", body = UserProfile),
        (status = 403, description = "Teachers only", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Teacher"
)]
#[instrument(skip(state, teacher))]
pub async fn profile(
    State(state): State<AppState>,
    teacher: TeacherUser,
) -> Result<Json<UserProfile>, AppError> {
    let me = TeacherService::load(&state.db, teacher.user_id()?).await?;
    Ok(Json(UserProfile::from(me)))
}

/// Replace the subjects the teacher specialises in
#[utoipa::path(
    put,
    path = "/api/teacher/subjects",
    request_body = UpdateSpecializationDto,
    responses(
        (status = 200, description = "Updated profile", body = UserProfile),
        (status = 400, description = "Unknown subject names", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Teacher"
)]
#[instrument(skip(state, teacher, dto))]
pub async fn update_subjects(
    State(state): State<AppState>,
    teacher: TeacherUser,
    ValidatedJson(dto): ValidatedJson<UpdateSpecializationDto>,
) -> Result<Json<UserProfile>, AppError> {
    let updated = TeacherService::update_specialization(
        &state.db,
        teacher.user_id()?,
        &dto.subject_specialization,
    )
    .await?;
    Ok(Json(UserProfile::from(updated)))
}

#[utoipa::path(
    get,
    path = "/api/teacher/students/{class_name}/{subject_name}",
    params(
        ("class_name" = String, Path, description = "Class name"),
        ("subject_name" = String, Path, description = "Subject name")
    ),
    responses(
        (status = 200, description = "Approved students of the class", body = ClassRoster),
        (status = 404, description = "Class or subject not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Teacher"
)]
#[instrument(skip(state, _teacher))]
pub async fn class_students(
    State(state): State<AppState>,
    _teacher: TeacherUser,
    Path((class_name, subject_name)): Path<(String, String)>,
) -> Result<Json<ClassRoster>, AppError> {
    Ok(Json(
        TeacherService::roster(&state.db, &class_name, &subject_name).await?,
    ))
}
