use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::instrument;

use schoolhub_core::AppError;
use schoolhub_core::errors::ErrorBody;
use schoolhub_models::ClassId;
use schoolhub_models::academics::{
    Class, ClassWithSubjects, CreateClassDto, CreateSubjectDto, Subject,
};

use crate::state::AppState;
use crate::validator::ValidatedJson;

use super::service::ClassService;

#[utoipa::path(
    get,
    path = "/api/classes",
    responses((status = 200, description = "All classes", body = Vec<Class>)),
    tag = "Classes"
)]
#[instrument(skip(state))]
pub async fn list_classes(State(state): State<AppState>) -> Result<Json<Vec<Class>>, AppError> {
    Ok(Json(ClassService::list_classes(&state.db).await?))
}

#[utoipa::path(
    get,
    path = "/api/classes/{id}",
    params(("id" = ClassId, Path, description = "Class ID")),
    responses(
        (status = 200, description = "Class with its subjects", body = ClassWithSubjects),
        (status = 404, description = "Class not found", body = ErrorBody)
    ),
    tag = "Classes"
)]
#[instrument(skip(state))]
pub async fn get_class(
    State(state): State<AppState>,
    Path(id): Path<ClassId>,
) -> Result<Json<ClassWithSubjects>, AppError> {
    Ok(Json(ClassService::get_class_with_subjects(&state.db, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/admin/classes",
    request_body = CreateClassDto,
    responses(
        (status = 201, description = "Class created", body = Class),
        (status = 409, description = "Class already exists", body = ErrorBody),
        (status = 422, description = "Validation error", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
#[instrument(skip(state))]
pub async fn create_class(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<CreateClassDto>,
) -> Result<(StatusCode, Json<Class>), AppError> {
    let class = ClassService::create_class(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(class)))
}

#[utoipa::path(
    post,
    path = "/api/admin/subjects",
    request_body = CreateSubjectDto,
    responses(
        (status = 201, description = "Subject created", body = Subject),
        (status = 404, description = "Class not found", body = ErrorBody),
        (status = 409, description = "Subject code already exists", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
#[instrument(skip(state))]
pub async fn create_subject(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<CreateSubjectDto>,
) -> Result<(StatusCode, Json<Subject>), AppError> {
    let subject = ClassService::create_subject(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(subject)))
}
