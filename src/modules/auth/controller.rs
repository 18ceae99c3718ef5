use anyhow::anyhow;
use axum::{Json, extract::State, http::StatusCode};
use chrono::NaiveDate;
use tracing::instrument;
use validator::Validate;

use schoolhub_core::AppError;
use schoolhub_core::errors::ErrorBody;
use schoolhub_models::auth::{
    AdminRegisterDto, AuthResponse, EmailMessageResponse, ForgotPasswordDto, LoginDto,
    MessageResponse, ParentAuthResponse, ParentLoginDto, ParentRegisterDto,
    ParentRegisterResponse, ResetPasswordDto, StudentLoginDto, StudentRegisterDto,
    StudentRegisterResponse, StudentRequestForm, TeacherSignupDto, VerifyOtpDto,
};
use schoolhub_models::users::{Address, ParentDetails};
use schoolhub_models::{RegistrationSource, UserProfile};

use crate::middleware::auth::AuthUser;
use crate::multipart::MultipartForm;
use crate::state::AppState;
use crate::validator::{ValidatedJson, validation_error};

use super::service::AuthService;

/// Reads the admission request fields out of a multipart body. Nested
/// objects arrive as JSON strings.
pub fn student_request_form(form: &MultipartForm) -> Result<StudentRequestForm, AppError> {
    let dob = form
        .text("dob")
        .map(|raw| {
            NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                .map_err(|_| AppError::bad_request(anyhow!("dob must be YYYY-MM-DD")))
        })
        .transpose()?;
    let registration_source = form
        .text_any(&["registeredBy", "registrationSource"])
        .map(|raw| raw.parse::<RegistrationSource>())
        .transpose()
        .map_err(|e| AppError::bad_request(anyhow!(e)))?;

    let parsed = StudentRequestForm {
        full_name: form.text("fullName").unwrap_or_default(),
        dob,
        email: form.text("email"),
        phone: form.text("phone"),
        academic_region: form.text("academicRegion"),
        class_name: form.text_any(&["class", "className"]).unwrap_or_default(),
        parent_details: form.json::<ParentDetails>("parentDetails")?,
        address: form.json::<Address>("address")?,
        academic_year: form.text("academicYear"),
        how_did_you_find_us: form.text("howDidYouFindUs"),
        registration_source,
    };
    parsed.validate().map_err(|e| validation_error(&e))?;
    Ok(parsed)
}

/// Register a student and send an email OTP
#[utoipa::path(
    post,
    path = "/api/auth/student/register",
    request_body = StudentRegisterDto,
    responses(
        (status = 201, description = "Student registered, OTP sent", body = StudentRegisterResponse),
        (status = 404, description = "Class not found", body = ErrorBody),
        (status = 409, description = "Email already registered", body = ErrorBody),
        (status = 422, description = "Validation error", body = ErrorBody)
    ),
    tag = "Auth"
)]
#[instrument(skip(state, dto))]
pub async fn register_student(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<StudentRegisterDto>,
) -> Result<(StatusCode, Json<StudentRegisterResponse>), AppError> {
    let response = AuthService::register_student(&state, dto).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Submit an admission request with optional documents
#[utoipa::path(
    post,
    path = "/api/auth/student/request",
    request_body(content_type = "multipart/form-data", content = StudentRequestForm,
        description = "Form fields plus optional `profilePicture` and `governmentProof` files"),
    responses(
        (status = 201, description = "Request submitted", body = MessageResponse),
        (status = 400, description = "Missing email, parent details or bad file", body = ErrorBody),
        (status = 404, description = "Class not found", body = ErrorBody),
        (status = 409, description = "Email already registered", body = ErrorBody)
    ),
    tag = "Auth"
)]
#[instrument(skip(state, form))]
pub async fn student_request(
    State(state): State<AppState>,
    mut form: MultipartForm,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    let fields = student_request_form(&form)?;
    let profile_picture = form.take_file("profilePicture");
    let government_proof = form.take_file("governmentProof");
    AuthService::request_admission(&state, fields, profile_picture, government_proof).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Registration request submitted successfully")),
    ))
}

/// Verify an email address with the OTP
#[utoipa::path(
    post,
    path = "/api/auth/verify-otp",
    request_body = VerifyOtpDto,
    responses(
        (status = 200, description = "Email verified", body = MessageResponse),
        (status = 400, description = "Invalid or expired OTP, or already verified", body = ErrorBody),
        (status = 404, description = "User not found", body = ErrorBody)
    ),
    tag = "Auth"
)]
#[instrument(skip(state, dto))]
pub async fn verify_otp(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<VerifyOtpDto>,
) -> Result<Json<MessageResponse>, AppError> {
    AuthService::verify_otp(&state, dto).await?;
    Ok(Json(MessageResponse::new("Email verified successfully")))
}

#[utoipa::path(
    post,
    path = "/api/auth/student/login",
    request_body = StudentLoginDto,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = ErrorBody),
        (status = 403, description = "Pending approval, unverified or wrong portal", body = ErrorBody)
    ),
    tag = "Auth"
)]
#[instrument(skip(state, dto))]
pub async fn student_login(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<StudentLoginDto>,
) -> Result<Json<AuthResponse>, AppError> {
    Ok(Json(AuthService::login_student(&state, dto).await?))
}

/// Teacher self signup, pending admin approval
#[utoipa::path(
    post,
    path = "/api/auth/teacher/signup",
    request_body = TeacherSignupDto,
    responses(
        (status = 201, description = "Signup received", body = UserProfile),
        (status = 409, description = "Email already registered", body = ErrorBody),
        (status = 422, description = "Validation error", body = ErrorBody)
    ),
    tag = "Auth"
)]
#[instrument(skip(state, dto))]
pub async fn teacher_signup(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<TeacherSignupDto>,
) -> Result<(StatusCode, Json<UserProfile>), AppError> {
    let teacher = AuthService::signup_teacher(&state, dto).await?;
    Ok((StatusCode::CREATED, Json(teacher)))
}

#[utoipa::path(
    post,
    path = "/api/auth/teacher/login",
    request_body = LoginDto,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = ErrorBody),
        (status = 403, description = "Pending or rejected", body = ErrorBody)
    ),
    tag = "Auth"
)]
#[instrument(skip(state, dto))]
pub async fn teacher_login(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<LoginDto>,
) -> Result<Json<AuthResponse>, AppError> {
    Ok(Json(AuthService::login_teacher(&state, dto).await?))
}

/// Register a parent linked to existing students
#[utoipa::path(
    post,
    path = "/api/auth/parent/register",
    request_body = ParentRegisterDto,
    responses(
        (status = 201, description = "Parent registered", body = ParentRegisterResponse),
        (status = 404, description = "Student not found", body = ErrorBody),
        (status = 409, description = "Email already registered", body = ErrorBody)
    ),
    tag = "Auth"
)]
#[instrument(skip(state, dto))]
pub async fn parent_register(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<ParentRegisterDto>,
) -> Result<(StatusCode, Json<ParentRegisterResponse>), AppError> {
    let response = AuthService::register_parent(&state, dto).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Parent login with a linked student's role number
#[utoipa::path(
    post,
    path = "/api/auth/parent/login",
    request_body = ParentLoginDto,
    responses(
        (status = 200, description = "Logged in", body = ParentAuthResponse),
        (status = 401, description = "Invalid credentials", body = ErrorBody)
    ),
    tag = "Auth"
)]
#[instrument(skip(state, dto))]
pub async fn parent_login(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<ParentLoginDto>,
) -> Result<Json<ParentAuthResponse>, AppError> {
    Ok(Json(AuthService::login_parent(&state, dto).await?))
}

#[utoipa::path(
    post,
    path = "/api/auth/admin/register",
    request_body = AdminRegisterDto,
    responses(
        (status = 201, description = "Admin registered, OTP sent", body = EmailMessageResponse),
        (status = 409, description = "Email already registered", body = ErrorBody)
    ),
    tag = "Auth"
)]
#[instrument(skip(state, dto))]
pub async fn admin_register(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<AdminRegisterDto>,
) -> Result<(StatusCode, Json<EmailMessageResponse>), AppError> {
    let response = AuthService::register_admin(&state, dto).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    post,
    path = "/api/auth/admin/login",
    request_body = LoginDto,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = ErrorBody),
        (status = 403, description = "Email not verified", body = ErrorBody)
    ),
    tag = "Auth"
)]
#[instrument(skip(state, dto))]
pub async fn admin_login(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<LoginDto>,
) -> Result<Json<AuthResponse>, AppError> {
    Ok(Json(AuthService::login_admin(&state, dto).await?))
}

/// Request a password reset code
#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    request_body = ForgotPasswordDto,
    responses(
        (status = 200, description = "Code sent if the account exists", body = EmailMessageResponse),
        (status = 429, description = "Too many reset attempts", body = ErrorBody)
    ),
    tag = "Auth"
)]
#[instrument(skip(state, dto))]
pub async fn forgot_password(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<ForgotPasswordDto>,
) -> Result<Json<EmailMessageResponse>, AppError> {
    Ok(Json(AuthService::request_password_reset(&state, dto).await?))
}

/// Send a fresh reset code, counted against the same cap
#[utoipa::path(
    post,
    path = "/api/auth/resend-reset-otp",
    request_body = ForgotPasswordDto,
    responses(
        (status = 200, description = "Code sent if the account exists", body = EmailMessageResponse),
        (status = 429, description = "Too many reset attempts", body = ErrorBody)
    ),
    tag = "Auth"
)]
#[instrument(skip(state, dto))]
pub async fn resend_reset_otp(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<ForgotPasswordDto>,
) -> Result<Json<EmailMessageResponse>, AppError> {
    Ok(Json(AuthService::request_password_reset(&state, dto).await?))
}

#[utoipa::path(
    post,
    path = "/api/auth/verify-reset-otp",
    request_body = VerifyOtpDto,
    responses(
        (status = 200, description = "Code accepted", body = MessageResponse),
        (status = 400, description = "Invalid or expired OTP", body = ErrorBody)
    ),
    tag = "Auth"
)]
#[instrument(skip(state, dto))]
pub async fn verify_reset_otp(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<VerifyOtpDto>,
) -> Result<Json<MessageResponse>, AppError> {
    AuthService::verify_reset_otp(&state, dto).await?;
    Ok(Json(MessageResponse::new("OTP verified. You can now reset your password.")))
}

/// Set a new password with a verified reset code
#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    request_body = ResetPasswordDto,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Invalid, expired or unverified OTP", body = ErrorBody)
    ),
    tag = "Auth"
)]
#[instrument(skip(state, dto))]
pub async fn reset_password(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<ResetPasswordDto>,
) -> Result<Json<MessageResponse>, AppError> {
    AuthService::reset_password(&state, dto).await?;
    Ok(Json(MessageResponse::new("Password reset successfully")))
}

/// Profile of the signed-in user
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = UserProfile),
        (status = 401, description = "Missing or invalid token", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
#[instrument(skip(state))]
pub async fn me(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<UserProfile>, AppError> {
    Ok(Json(AuthService::me(&state.db, auth_user.user_id()?).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_form_parses_json_fields() {
        let form = MultipartForm::from_parts(
            &[
                ("fullName", "Meera Iyer"),
                ("class", "3"),
                ("email", "meera@home.test"),
                ("dob", "2018-02-11"),
                ("registeredBy", "parent"),
                ("parentDetails", r#"{"name":"Lakshmi Iyer","relationship":"Mother"}"#),
            ],
            vec![],
        );
        let parsed = student_request_form(&form).unwrap();
        assert_eq!(parsed.class_name, "3");
        assert_eq!(parsed.registration_source, Some(RegistrationSource::Parent));
        assert_eq!(
            parsed.parent_details.and_then(|p| p.name).as_deref(),
            Some("Lakshmi Iyer")
        );
    }

    #[test]
    fn test_request_form_requires_name_and_class() {
        let form = MultipartForm::from_parts(&[("email", "x@home.test")], vec![]);
        let err = student_request_form(&form).unwrap_err();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_request_form_rejects_bad_json() {
        let form = MultipartForm::from_parts(
            &[("fullName", "A"), ("class", "2"), ("parentDetails", "{not json")],
            vec![],
        );
        assert_eq!(
            student_request_form(&form).unwrap_err().status,
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_request_form_rejects_unknown_source() {
        let form = MultipartForm::from_parts(
            &[("fullName", "A"), ("class", "7"), ("registeredBy", "neighbour")],
            vec![],
        );
        assert_eq!(
            student_request_form(&form).unwrap_err().status,
            StatusCode::BAD_REQUEST
        );
    }
}
