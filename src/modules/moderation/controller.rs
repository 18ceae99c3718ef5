use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;
use uuid::Uuid;

use schoolhub_core::AppError;
use schoolhub_core::errors::ErrorBody;
use schoolhub_models::announcements::TeacherAnnouncement;
use schoolhub_models::moderation::{ModerationEntity, ModerationOutcome, PendingItem};
use schoolhub_models::notes::Note;
use schoolhub_models::scheduled_subjects::ScheduledSubject;
use schoolhub_models::users::RejectDto;
use schoolhub_models::{NoteId, ScheduledSubjectId, TeacherAnnouncementId, UserId};

use crate::middleware::auth::AdminUser;
use crate::state::AppState;
use crate::validator::ValidatedJson;

use super::{Decision, Moderatable, ModerationError, decide};

fn parse_entity(raw: &str) -> Result<ModerationEntity, AppError> {
    raw.parse::<ModerationEntity>()
        .map_err(|e| AppError::bad_request(anyhow::anyhow!(e)))
}

async fn pending_of<M: Moderatable>(state: &AppState) -> Result<Vec<PendingItem>, AppError> {
    M::pending(&state.db)
        .await
        .map_err(ModerationError::into_app_error)
}

async fn decide_outcome<M: Moderatable>(
    state: &AppState,
    key: M::Key,
    admin: UserId,
    decision: &Decision,
) -> Result<ModerationOutcome, AppError> {
    let record = decide::<M>(state, &key, admin, decision).await?;
    Ok(record.outcome())
}

/// Dispatches a decision to the record type behind `entity`.
pub async fn review(
    state: &AppState,
    entity: ModerationEntity,
    id: Uuid,
    admin: UserId,
    decision: Decision,
) -> Result<ModerationOutcome, AppError> {
    match entity {
        ModerationEntity::Notes => {
            decide_outcome::<Note>(state, NoteId::from(id), admin, &decision).await
        }
        ModerationEntity::ScheduledSubjects => {
            decide_outcome::<ScheduledSubject>(state, ScheduledSubjectId::from(id), admin, &decision)
                .await
        }
        ModerationEntity::Announcements => {
            decide_outcome::<TeacherAnnouncement>(
                state,
                TeacherAnnouncementId::from(id),
                admin,
                &decision,
            )
            .await
        }
    }
}

/// List records awaiting review
#[utoipa::path(
    get,
    path = "/api/admin/review/{entity}/pending",
    params(("entity" = ModerationEntity, Path, description = "notes, scheduled-subjects or announcements")),
    responses(
        (status = 200, description = "Records awaiting review", body = Vec<PendingItem>),
        (status = 400, description = "Unknown entity", body = ErrorBody),
        (status = 403, description = "Admins only", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Review"
)]
#[instrument(skip(state))]
pub async fn list_pending(
    State(state): State<AppState>,
    Path(entity): Path<String>,
) -> Result<Json<Vec<PendingItem>>, AppError> {
    let items = match parse_entity(&entity)? {
        ModerationEntity::Notes => pending_of::<Note>(&state).await?,
        ModerationEntity::ScheduledSubjects => pending_of::<ScheduledSubject>(&state).await?,
        ModerationEntity::Announcements => pending_of::<TeacherAnnouncement>(&state).await?,
    };
    Ok(Json(items))
}

/// Approve a pending note, scheduled subject or event announcement
#[utoipa::path(
    post,
    path = "/api/admin/review/{entity}/{id}/approve",
    params(
        ("entity" = ModerationEntity, Path, description = "notes, scheduled-subjects or announcements"),
        ("id" = Uuid, Path, description = "Record ID")
    ),
    responses(
        (status = 200, description = "Record approved", body = ModerationOutcome),
        (status = 404, description = "Not found or already reviewed", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Review"
)]
#[instrument(skip(state, admin))]
pub async fn approve(
    State(state): State<AppState>,
    admin: AdminUser,
    Path((entity, id)): Path<(String, Uuid)>,
) -> Result<Json<ModerationOutcome>, AppError> {
    let entity = parse_entity(&entity)?;
    let outcome = review(&state, entity, id, admin.user_id()?, Decision::Approve).await?;
    Ok(Json(outcome))
}

/// Reject a pending record with a reason
#[utoipa::path(
    post,
    path = "/api/admin/review/{entity}/{id}/reject",
    params(
        ("entity" = ModerationEntity, Path, description = "notes, scheduled-subjects or announcements"),
        ("id" = Uuid, Path, description = "Record ID")
    ),
    request_body = RejectDto,
    responses(
        (status = 200, description = "Record rejected", body = ModerationOutcome),
        (status = 400, description = "Rejection reason is required", body = ErrorBody),
        (status = 404, description = "Not found or already reviewed", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Review"
)]
#[instrument(skip(state, admin, dto))]
pub async fn reject(
    State(state): State<AppState>,
    admin: AdminUser,
    Path((entity, id)): Path<(String, Uuid)>,
    ValidatedJson(dto): ValidatedJson<RejectDto>,
) -> Result<Json<ModerationOutcome>, AppError> {
    let entity = parse_entity(&entity)?;
    let decision = Decision::reject(&dto.reason).map_err(ModerationError::into_app_error)?;
    let outcome = review(&state, entity, id, admin.user_id()?, decision).await?;
    Ok(Json(outcome))
}
