use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;

use schoolhub_core::AppError;
use schoolhub_core::errors::ErrorBody;
use schoolhub_models::auth::MessageResponse;
use schoolhub_models::users::UserCounts;
use schoolhub_models::UserId;

use crate::middleware::auth::AdminUser;
use crate::state::AppState;

use super::service::UserService;

#[utoipa::path(
    get,
    path = "/api/admin/users/counts",
    responses(
        (status = 200, description = "Number of accounts per role", body = UserCounts),
        (status = 401, description = "Unauthorized", body = ErrorBody),
        (status = 403, description = "Admins only", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
#[instrument(skip(state))]
pub async fn get_user_counts(State(state): State<AppState>) -> Result<Json<UserCounts>, AppError> {
    Ok(Json(UserService::counts(&state.db).await?))
}

#[utoipa::path(
    delete,
    path = "/api/admin/users/{id}",
    params(("id" = UserId, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 403, description = "Admin accounts cannot be deleted", body = ErrorBody),
        (status = 404, description = "User not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
#[instrument(skip(state, admin))]
pub async fn delete_user(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<UserId>,
) -> Result<Json<MessageResponse>, AppError> {
    UserService::delete_user(&state.db, id, admin.user_id()?).await?;
    Ok(Json(MessageResponse::new("User deleted successfully")))
}
