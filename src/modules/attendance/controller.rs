use axum::{
    Json,
    extract::{Query, State},
};
use tracing::instrument;

use schoolhub_core::AppError;
use schoolhub_core::errors::ErrorBody;
use schoolhub_models::attendance::{
    AttendanceBatchReport, ClassAttendanceQuery, ClassAttendanceSummary,
};

use crate::middleware::auth::AdminUser;
use crate::scheduler::school_today;
use crate::state::AppState;

use super::service::AttendanceService;

/// Attendance totals per class and subject
#[utoipa::path(
    get,
    path = "/api/admin/attendance/summary",
    params(ClassAttendanceQuery),
    responses(
        (status = 200, description = "Attendance per class and subject", body = Vec<ClassAttendanceSummary>),
        (status = 403, description = "Admins only", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
#[instrument(skip(state))]
pub async fn class_summary(
    State(state): State<AppState>,
    Query(query): Query<ClassAttendanceQuery>,
) -> Result<Json<Vec<ClassAttendanceSummary>>, AppError> {
    let rows = AttendanceService::class_summary(&state.db, query.class_id, query.date).await?;
    Ok(Json(rows))
}

/// Run the absentee batch for today now
///
/// Same job the scheduler runs every school morning. Rows that already exist
/// for today are kept as they are.
#[utoipa::path(
    post,
    path = "/api/admin/attendance/run",
    responses(
        (status = 200, description = "Batch report", body = AttendanceBatchReport),
        (status = 403, description = "Admins only", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
#[instrument(skip(state, admin))]
pub async fn run_batch(
    State(state): State<AppState>,
    admin: AdminUser,
) -> Result<Json<AttendanceBatchReport>, AppError> {
    tracing::info!(admin.id = %admin.user_id()?, "Attendance batch triggered manually");
    let today = school_today(&state.scheduler_config);
    Ok(Json(AttendanceService::run_batch(&state.db, today).await?))
}
