use axum::{
    Json,
    extract::{Path, Query, State},
};
use tracing::instrument;

use schoolhub_core::AppError;
use schoolhub_core::errors::ErrorBody;
use schoolhub_models::UserProfile;
use schoolhub_models::academics::{ClassWithSubjects, Subject};
use schoolhub_models::assessments::{MarkView, TestView};
use schoolhub_models::assignments::UpcomingDeadlines;
use schoolhub_models::attendance::{AttendanceQuery, AttendanceRecord, SubjectAttendanceSummary};

use crate::middleware::auth::StudentUser;
use crate::state::AppState;

use super::service::StudentService;

#[utoipa::path(
    get,
    path = "/api/student/profile",
    responses(
        (status = 200, description = "Student profile", body = UserProfile),
        (status = 403, description = "Students only", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
#[instrument(skip(state, student))]
pub async fn profile(
    State(state): State<AppState>,
    student: StudentUser,
) -> Result<Json<UserProfile>, AppError> {
    let me = StudentService::load(&state.db, student.user_id()?).await?;
    Ok(Json(UserProfile::from(me)))
}

/// The student's class with its subjects
#[utoipa::path(
    get,
    path = "/api/student/class",
    responses(
        (status = 200, description = "Class and subjects", body = ClassWithSubjects),
        (status = 400, description = "Student has no class", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
#[instrument(skip(state, student))]
pub async fn my_class(
    State(state): State<AppState>,
    student: StudentUser,
) -> Result<Json<ClassWithSubjects>, AppError> {
    let me = StudentService::load(&state.db, student.user_id()?).await?;
    Ok(Json(StudentService::class(&state.db, &me).await?))
}

#[utoipa::path(
    get,
    path = "/api/student/subjects",
    responses((status = 200, description = "Subjects of the student's class", body = Vec<Subject>)),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
#[instrument(skip(state, student))]
pub async fn my_subjects(
    State(state): State<AppState>,
    student: StudentUser,
) -> Result<Json<Vec<Subject>>, AppError> {
    let me = StudentService::load(&state.db, student.user_id()?).await?;
    Ok(Json(StudentService::subjects(&state.db, &me).await?))
}

#[utoipa::path(
    get,
    path = "/api/student/tests",
    responses((status = 200, description = "Tests of the student's class", body = Vec<TestView>)),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
#[instrument(skip(state, student))]
pub async fn my_tests(
    State(state): State<AppState>,
    student: StudentUser,
) -> Result<Json<Vec<TestView>>, AppError> {
    let me = StudentService::load(&state.db, student.user_id()?).await?;
    Ok(Json(StudentService::tests(&state.db, &me).await?))
}

/// Attendance rows, filtered by subject code and date range
#[utoipa::path(
    get,
    path = "/api/student/attendance",
    params(AttendanceQuery),
    responses(
        (status = 200, description = "Attendance rows", body = Vec<AttendanceRecord>),
        (status = 400, description = "Invalid date range", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
#[instrument(skip(state, student))]
pub async fn my_attendance(
    State(state): State<AppState>,
    student: StudentUser,
    Query(query): Query<AttendanceQuery>,
) -> Result<Json<Vec<AttendanceRecord>>, AppError> {
    let me = StudentService::load(&state.db, student.user_id()?).await?;
    Ok(Json(StudentService::attendance(&state.db, &me, &query).await?))
}

#[utoipa::path(
    get,
    path = "/api/student/attendance/summary",
    responses((status = 200, description = "Per subject attendance percentages", body = Vec<SubjectAttendanceSummary>)),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
#[instrument(skip(state, student))]
pub async fn my_attendance_summary(
    State(state): State<AppState>,
    student: StudentUser,
) -> Result<Json<Vec<SubjectAttendanceSummary>>, AppError> {
    let me = StudentService::load(&state.db, student.user_id()?).await?;
    Ok(Json(StudentService::attendance_summary(&state.db, &me).await?))
}

#[utoipa::path(
    get,
    path = "/api/student/marks/{subject_name}",
    params(("subject_name" = String, Path, description = "Subject name")),
    responses(
        (status = 200, description = "Results in the subject", body = Vec<MarkView>),
        (status = 404, description = "Subject not found in this class", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
#[instrument(skip(state, student))]
pub async fn my_marks(
    State(state): State<AppState>,
    student: StudentUser,
    Path(subject_name): Path<String>,
) -> Result<Json<Vec<MarkView>>, AppError> {
    let me = StudentService::load(&state.db, student.user_id()?).await?;
    Ok(Json(StudentService::marks(&state.db, &me, &subject_name).await?))
}

/// Tests and assignments due today, tomorrow and the day after
#[utoipa::path(
    get,
    path = "/api/student/deadlines",
    responses((status = 200, description = "Upcoming deadlines", body = UpcomingDeadlines)),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
#[instrument(skip(state, student))]
pub async fn my_deadlines(
    State(state): State<AppState>,
    student: StudentUser,
) -> Result<Json<UpcomingDeadlines>, AppError> {
    let me = StudentService::load(&state.db, student.user_id()?).await?;
    Ok(Json(
        StudentService::deadlines(&state.db, &me, &state.scheduler_config).await?,
    ))
}
