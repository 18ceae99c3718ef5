use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::instrument;

use schoolhub_auth::UserRole;
use schoolhub_core::AppError;
use schoolhub_core::errors::ErrorBody;
use schoolhub_models::announcements::{
    Announcement, AnnouncementFeed, CreateAnnouncementDto, CreateTeacherAnnouncementDto,
    TeacherAnnouncement, TeacherAnnouncementView, UpdateTeacherAnnouncementDto,
};
use schoolhub_models::auth::MessageResponse;
use schoolhub_models::{AnnouncementId, TeacherAnnouncementId};

use crate::middleware::auth::{AdminUser, AuthUser, ParentUser, StudentUser, TeacherUser};
use crate::modules::students::StudentService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

use super::service::AnnouncementService;

/// Broadcast an announcement to one or more audiences
///
/// `all` in `targetAudience` replaces every other audience.
#[utoipa::path(
    post,
    path = "/api/admin/announcements",
    request_body = CreateAnnouncementDto,
    responses(
        (status = 201, description = "One announcement per audience", body = Vec<Announcement>),
        (status = 422, description = "Validation error", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
#[instrument(skip(state, admin, dto))]
pub async fn create_announcement(
    State(state): State<AppState>,
    admin: AdminUser,
    ValidatedJson(dto): ValidatedJson<CreateAnnouncementDto>,
) -> Result<(StatusCode, Json<Vec<Announcement>>), AppError> {
    let created = AnnouncementService::broadcast(&state.db, admin.user_id()?, dto).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    get,
    path = "/api/admin/announcements",
    responses((status = 200, description = "Every broadcast", body = Vec<Announcement>)),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
#[instrument(skip(state, _admin))]
pub async fn list_announcements(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Vec<Announcement>>, AppError> {
    Ok(Json(AnnouncementService::list_all(&state.db).await?))
}

#[utoipa::path(
    delete,
    path = "/api/admin/announcements/{id}",
    params(("id" = AnnouncementId, Path, description = "Announcement ID")),
    responses(
        (status = 200, description = "Announcement deleted", body = MessageResponse),
        (status = 404, description = "Announcement not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
#[instrument(skip(state, admin))]
pub async fn delete_announcement(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<AnnouncementId>,
) -> Result<Json<MessageResponse>, AppError> {
    AnnouncementService::delete_broadcast(&state.db, id, admin.user_id()?).await?;
    Ok(Json(MessageResponse::new("Announcement deleted successfully")))
}

/// Broadcasts addressed to the caller's role
#[utoipa::path(
    get,
    path = "/api/announcements",
    responses((status = 200, description = "Announcements", body = Vec<Announcement>)),
    security(("bearer_auth" = [])),
    tag = "Announcements"
)]
#[instrument(skip(state, user))]
pub async fn my_feed(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<Announcement>>, AppError> {
    let announcements = match user.role() {
        UserRole::Admin => AnnouncementService::list_all(&state.db).await?,
        role => AnnouncementService::for_role(&state.db, role).await?,
    };
    Ok(Json(announcements))
}

/// Post a class announcement or propose an event
#[utoipa::path(
    post,
    path = "/api/teacher/announcements",
    request_body = CreateTeacherAnnouncementDto,
    responses(
        (status = 201, description = "Created; events start pending", body = TeacherAnnouncement),
        (status = 400, description = "Subject is not taught in the class", body = ErrorBody),
        (status = 404, description = "Class or subject not found", body = ErrorBody),
        (status = 422, description = "Validation error", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Teacher"
)]
#[instrument(skip(state, teacher, dto))]
pub async fn create_teacher_announcement(
    State(state): State<AppState>,
    teacher: TeacherUser,
    ValidatedJson(dto): ValidatedJson<CreateTeacherAnnouncementDto>,
) -> Result<(StatusCode, Json<TeacherAnnouncement>), AppError> {
    let announcement =
        AnnouncementService::create_teacher_announcement(&state.db, teacher.user_id()?, dto)
            .await?;
    Ok((StatusCode::CREATED, Json(announcement)))
}

#[utoipa::path(
    get,
    path = "/api/teacher/announcements",
    responses((status = 200, description = "The caller's announcements", body = Vec<TeacherAnnouncementView>)),
    security(("bearer_auth" = [])),
    tag = "Teacher"
)]
#[instrument(skip(state, teacher))]
pub async fn my_teacher_announcements(
    State(state): State<AppState>,
    teacher: TeacherUser,
) -> Result<Json<Vec<TeacherAnnouncementView>>, AppError> {
    Ok(Json(
        AnnouncementService::teacher_announcements(&state.db, teacher.user_id()?).await?,
    ))
}

/// Edit an announcement; an approved event goes back to review
#[utoipa::path(
    put,
    path = "/api/teacher/announcements/{id}",
    params(("id" = TeacherAnnouncementId, Path, description = "Announcement ID")),
    request_body = UpdateTeacherAnnouncementDto,
    responses(
        (status = 200, description = "Announcement updated", body = TeacherAnnouncement),
        (status = 400, description = "Announcement was rejected", body = ErrorBody),
        (status = 403, description = "Not the author", body = ErrorBody),
        (status = 404, description = "Announcement not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Teacher"
)]
#[instrument(skip(state, teacher, dto))]
pub async fn update_teacher_announcement(
    State(state): State<AppState>,
    teacher: TeacherUser,
    Path(id): Path<TeacherAnnouncementId>,
    ValidatedJson(dto): ValidatedJson<UpdateTeacherAnnouncementDto>,
) -> Result<Json<TeacherAnnouncement>, AppError> {
    Ok(Json(
        AnnouncementService::update_teacher_announcement(&state.db, teacher.user_id()?, id, dto)
            .await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/teacher/announcements/{id}",
    params(("id" = TeacherAnnouncementId, Path, description = "Announcement ID")),
    responses(
        (status = 200, description = "Announcement deleted", body = MessageResponse),
        (status = 403, description = "Not the author", body = ErrorBody),
        (status = 404, description = "Announcement not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Teacher"
)]
#[instrument(skip(state, teacher))]
pub async fn delete_teacher_announcement(
    State(state): State<AppState>,
    teacher: TeacherUser,
    Path(id): Path<TeacherAnnouncementId>,
) -> Result<Json<MessageResponse>, AppError> {
    AnnouncementService::delete_teacher_announcement(&state.db, teacher.user_id()?, id).await?;
    Ok(Json(MessageResponse::new("Announcement deleted successfully")))
}

#[utoipa::path(
    get,
    path = "/api/student/announcements",
    responses((status = 200, description = "Broadcasts, class announcements and events", body = AnnouncementFeed)),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
#[instrument(skip(state, student))]
pub async fn student_feed(
    State(state): State<AppState>,
    student: StudentUser,
) -> Result<Json<AnnouncementFeed>, AppError> {
    let me = StudentService::load(&state.db, student.user_id()?).await?;
    Ok(Json(AnnouncementService::student_feed(&state.db, me.class_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/parent/announcements",
    responses((status = 200, description = "Broadcasts for parents and events", body = AnnouncementFeed)),
    security(("bearer_auth" = [])),
    tag = "Parent"
)]
#[instrument(skip(state, _parent))]
pub async fn parent_feed(
    State(state): State<AppState>,
    _parent: ParentUser,
) -> Result<Json<AnnouncementFeed>, AppError> {
    Ok(Json(AnnouncementService::parent_feed(&state.db).await?))
}
