use axum::{Json, extract::State, http::StatusCode};
use tracing::instrument;

use schoolhub_core::AppError;
use schoolhub_core::errors::ErrorBody;
use schoolhub_models::assessments::{
    BulkMarksResponse, ClassMarksQuery, CreateTestDto, MarkView, StudentMarksQuery,
    SubjectResultsSummary, Test, TestCount, TestView, UploadMarksDto, UploadMarksResponse,
    UploadMultipleMarksDto,
};

use crate::middleware::auth::TeacherUser;
use crate::state::AppState;
use crate::validator::ValidatedJson;

use super::service::AssessmentService;

/// Schedule a test for a class
#[utoipa::path(
    post,
    path = "/api/teacher/tests",
    request_body = CreateTestDto,
    responses(
        (status = 201, description = "Test created", body = Test),
        (status = 400, description = "Subject does not belong to the class", body = ErrorBody),
        (status = 404, description = "Subject not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Teacher"
)]
#[instrument(skip(state, teacher, dto))]
pub async fn create_test(
    State(state): State<AppState>,
    teacher: TeacherUser,
    ValidatedJson(dto): ValidatedJson<CreateTestDto>,
) -> Result<(StatusCode, Json<Test>), AppError> {
    let test = AssessmentService::create_test(&state.db, teacher.user_id()?, dto).await?;
    Ok((StatusCode::CREATED, Json(test)))
}

#[utoipa::path(
    get,
    path = "/api/teacher/tests",
    responses((status = 200, description = "Tests created by the caller", body = Vec<TestView>)),
    security(("bearer_auth" = [])),
    tag = "Teacher"
)]
#[instrument(skip(state, teacher))]
pub async fn my_tests(
    State(state): State<AppState>,
    teacher: TeacherUser,
) -> Result<Json<Vec<TestView>>, AppError> {
    Ok(Json(AssessmentService::teacher_tests(&state.db, teacher.user_id()?).await?))
}

/// Number of tests per class and subject
#[utoipa::path(
    get,
    path = "/api/teacher/tests/counts",
    responses((status = 200, description = "Test counts", body = Vec<TestCount>)),
    security(("bearer_auth" = [])),
    tag = "Teacher"
)]
#[instrument(skip(state, teacher))]
pub async fn test_counts(
    State(state): State<AppState>,
    teacher: TeacherUser,
) -> Result<Json<Vec<TestCount>>, AppError> {
    Ok(Json(AssessmentService::test_counts(&state.db, teacher.user_id()?).await?))
}

/// Upload marks for one student by roll number
///
/// Creates the test (title, subject and the student's class) the first time
/// it is used. Uploading again for the same student replaces the marks.
#[utoipa::path(
    post,
    path = "/api/teacher/marks",
    request_body = UploadMarksDto,
    responses(
        (status = 201, description = "Marks saved", body = UploadMarksResponse),
        (status = 400, description = "Invalid marks or unknown subject", body = ErrorBody),
        (status = 404, description = "Student not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Teacher"
)]
#[instrument(skip(state, teacher, dto))]
pub async fn upload_marks(
    State(state): State<AppState>,
    teacher: TeacherUser,
    ValidatedJson(dto): ValidatedJson<UploadMarksDto>,
) -> Result<(StatusCode, Json<UploadMarksResponse>), AppError> {
    let result = AssessmentService::upload_mark(&state.db, teacher.user_id()?, &dto).await?;
    Ok((
        StatusCode::CREATED,
        Json(UploadMarksResponse {
            message: "Marks uploaded successfully".to_string(),
            result,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/teacher/marks/bulk",
    request_body = UploadMultipleMarksDto,
    responses((status = 200, description = "Per-student outcome", body = BulkMarksResponse)),
    security(("bearer_auth" = [])),
    tag = "Teacher"
)]
#[instrument(skip(state, teacher, dto))]
pub async fn upload_many_marks(
    State(state): State<AppState>,
    teacher: TeacherUser,
    ValidatedJson(dto): ValidatedJson<UploadMultipleMarksDto>,
) -> Result<Json<BulkMarksResponse>, AppError> {
    let response =
        AssessmentService::upload_many(&state.db, teacher.user_id()?, &dto.marks).await?;
    Ok(Json(response))
}

/// Results of one student
#[utoipa::path(
    post,
    path = "/api/teacher/marks/student",
    request_body = StudentMarksQuery,
    responses(
        (status = 200, description = "Marks", body = Vec<MarkView>),
        (status = 404, description = "Student not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Teacher"
)]
#[instrument(skip(state, query))]
pub async fn student_marks(
    State(state): State<AppState>,
    ValidatedJson(query): ValidatedJson<StudentMarksQuery>,
) -> Result<Json<Vec<MarkView>>, AppError> {
    Ok(Json(AssessmentService::student_marks(&state.db, &query.roll_number).await?))
}

/// Results of a class in one subject
#[utoipa::path(
    post,
    path = "/api/teacher/marks/class",
    request_body = ClassMarksQuery,
    responses(
        (status = 200, description = "Marks", body = Vec<MarkView>),
        (status = 404, description = "Class or subject not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Teacher"
)]
#[instrument(skip(state, query))]
pub async fn class_marks(
    State(state): State<AppState>,
    ValidatedJson(query): ValidatedJson<ClassMarksQuery>,
) -> Result<Json<Vec<MarkView>>, AppError> {
    let marks =
        AssessmentService::class_marks(&state.db, &query.class_name, &query.subject_name).await?;
    Ok(Json(marks))
}

#[utoipa::path(
    get,
    path = "/api/teacher/marks/uploaded",
    responses((status = 200, description = "Marks for the caller's tests", body = Vec<MarkView>)),
    security(("bearer_auth" = [])),
    tag = "Teacher"
)]
#[instrument(skip(state, teacher))]
pub async fn my_uploaded_marks(
    State(state): State<AppState>,
    teacher: TeacherUser,
) -> Result<Json<Vec<MarkView>>, AppError> {
    Ok(Json(AssessmentService::uploaded_by(&state.db, teacher.user_id()?).await?))
}

/// Average, highest and lowest percentage per subject
#[utoipa::path(
    get,
    path = "/api/admin/results/summary",
    responses(
        (status = 200, description = "Results per subject", body = Vec<SubjectResultsSummary>),
        (status = 403, description = "Admins only", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
#[instrument(skip(state))]
pub async fn results_summary(
    State(state): State<AppState>,
) -> Result<Json<Vec<SubjectResultsSummary>>, AppError> {
    Ok(Json(AssessmentService::results_summary(&state.db).await?))
}
