use anyhow::{Context, anyhow};
use sqlx::PgPool;
use tracing::{info, instrument};

use schoolhub_auth::{UserRole, create_access_token};
use schoolhub_core::file_storage::build_key;
use schoolhub_core::{AppError, UploadPolicy, hash_password, verify_password};
use schoolhub_db::is_unique_violation;
use schoolhub_models::auth::{
    AdminRegisterDto, AuthResponse, EmailMessageResponse, ForgotPasswordDto, LoginDto,
    ParentAuthResponse, ParentLoginDto, ParentRegisterDto, ParentRegisterResponse,
    ResetPasswordDto, StudentLoginDto, StudentRegisterDto, StudentRegisterResponse,
    StudentRequestForm, TeacherSignupDto, VerifyOtpDto,
};
use schoolhub_models::value_types::{
    normalize_email, normalize_role_number, requires_parent_details,
};
use schoolhub_models::{ApprovalStatus, RegistrationSource, User, UserId, UserProfile};

use crate::metrics::{track_jwt_issued, track_login, track_registration};
use crate::modules::approvals::role_number;
use crate::modules::classes::ClassService;
use crate::modules::parents::ParentService;
use crate::modules::users::UserService;
use crate::multipart::UploadedFile;
use crate::security_event;
use crate::state::AppState;
use crate::utils::email_templates;
use crate::utils::notifier::{dispatch, dispatch_otp};

use super::otp::{OtpPurpose, OtpService, ensure_reset_allowed};

const RESET_REQUESTED: &str = "If an account exists with that email, a reset code has been sent.";

fn invalid_credentials() -> AppError {
    AppError::unauthorized("Invalid credentials")
}

/// Gate applied to a student account before its password is checked.
pub fn student_login_gate(user: &User) -> Result<(), AppError> {
    if user.role != UserRole::Student {
        return Err(AppError::forbidden(
            "Please use the correct login portal for your role",
        ));
    }
    match user.student_status {
        Some(ApprovalStatus::Approved) => {}
        Some(ApprovalStatus::Rejected) => {
            let reason = user.rejection_reason.as_deref().unwrap_or("No reason given");
            return Err(AppError::forbidden(format!(
                "Your admission request was rejected: {reason}"
            )));
        }
        _ => {
            return Err(AppError::forbidden(
                "Your admission request is pending admin approval",
            ));
        }
    }
    if !user.is_email_verified {
        return Err(AppError::forbidden("Email not verified. Please verify first."));
    }
    Ok(())
}

/// Gate applied to a teacher account before its password is checked.
pub fn teacher_login_gate(user: &User) -> Result<(), AppError> {
    match user.teacher_status {
        Some(ApprovalStatus::Approved) => Ok(()),
        Some(ApprovalStatus::Rejected) => {
            let reason = user.rejection_reason.as_deref().unwrap_or("No reason given");
            Err(AppError::forbidden(format!(
                "Your account has been rejected. Reason: {reason}"
            )))
        }
        _ => Err(AppError::forbidden(
            "Your account is pending admin approval",
        )),
    }
}

fn check_password(user: &User, password: &str) -> Result<(), AppError> {
    let hash = user.password_hash.as_deref().ok_or_else(invalid_credentials)?;
    if verify_password(password, hash)? {
        Ok(())
    } else {
        Err(invalid_credentials())
    }
}

fn issue_token(state: &AppState, user: &User) -> Result<String, AppError> {
    let token = create_access_token(
        user.id.into_inner(),
        &user.email,
        user.role,
        user.role_number.as_deref(),
        &state.jwt_config,
    )?;
    track_jwt_issued();
    Ok(token)
}

fn login_failed(role: UserRole, identifier: &str, error: AppError) -> AppError {
    track_login(role, false);
    security_event!(
        "login_failed",
        role = role.as_str(),
        identifier = %identifier,
        status = error.status.as_u16(),
        "Login rejected"
    );
    error
}

fn insert_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| {
        if is_unique_violation(&e) {
            AppError::conflict(anyhow!("Email already registered"))
        } else {
            AppError::database(anyhow::Error::new(e).context(context))
        }
    }
}

pub struct AuthService;

impl AuthService {
    /// Self registration: the role number is assigned straight away, the
    /// account stays pending and unverified until the OTP and the admin.
    #[instrument(skip(state, dto), fields(email = %dto.email))]
    pub async fn register_student(
        state: &AppState,
        dto: StudentRegisterDto,
    ) -> Result<StudentRegisterResponse, AppError> {
        let email = normalize_email(&dto.email);
        UserService::ensure_email_available(&state.db, &email).await?;
        let class = ClassService::get_class_by_name(&state.db, &dto.class_name).await?;
        let password_hash = hash_password(&dto.password)?;

        let mut tx = state
            .db
            .begin()
            .await
            .context("Failed to begin transaction")
            .map_err(AppError::database)?;

        let role_number = role_number::generate(&mut tx, &dto.academic_region).await?;
        let student_id: UserId = sqlx::query_scalar(
            r#"INSERT INTO users
                   (role, full_name, email, phone, password_hash, dob, academic_region, class_id,
                    role_number, student_status, registration_source)
               VALUES ('student', $1, $2, $3, $4, $5, $6, $7, $8, 'pending', 'student')
               RETURNING id"#,
        )
        .bind(dto.full_name.trim())
        .bind(&email)
        .bind(dto.phone.trim())
        .bind(&password_hash)
        .bind(dto.dob)
        .bind(dto.academic_region.trim())
        .bind(class.id)
        .bind(&role_number)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::conflict(anyhow!("Email or role number already registered"))
            } else {
                AppError::database(anyhow::Error::new(e).context("Failed to register student"))
            }
        })?;

        tx.commit()
            .await
            .context("Failed to commit student registration")
            .map_err(AppError::database)?;

        let otp = OtpService::issue_verification(&state.db, student_id, state.otp_config.ttl_minutes)
            .await?;
        dispatch_otp(
            state.notifier.as_ref(),
            &email,
            &otp.code,
            state.otp_config.ttl_minutes,
            OtpPurpose::Verification,
        )
        .await;

        track_registration(UserRole::Student);
        info!(student.id = %student_id, role_number = %role_number, "Student registered");

        Ok(StudentRegisterResponse {
            message: "Registration successful. Please verify the OTP sent to your email."
                .to_string(),
            role_number,
            email,
        })
    }

    async fn store_document(
        state: &AppState,
        student_id: UserId,
        file: Option<UploadedFile>,
    ) -> Result<Option<String>, AppError> {
        let Some(file) = file else {
            return Ok(None);
        };
        UploadPolicy::images_and_pdf(state.upload_config.document_max_bytes)
            .check(&file.content_type, file.len())
            .map_err(|e| e.into_app_error())?;
        let key = build_key(
            "students",
            &format!("{student_id}-{}", uuid::Uuid::new_v4().simple()),
            &file.file_name,
        );
        let key = state
            .storage
            .save(&key, &file.bytes)
            .await
            .map_err(|e| e.into_app_error())?;
        Ok(Some(key))
    }

    /// Admission request without a password. The role number and password
    /// are assigned on approval.
    #[instrument(skip_all, fields(email = ?form.email))]
    pub async fn request_admission(
        state: &AppState,
        form: StudentRequestForm,
        profile_picture: Option<UploadedFile>,
        government_proof: Option<UploadedFile>,
    ) -> Result<UserId, AppError> {
        let email = form
            .email
            .as_deref()
            .map(normalize_email)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| AppError::bad_request(anyhow!("email is required")))?;
        UserService::ensure_email_available(&state.db, &email).await?;
        let class = ClassService::get_class_by_name(&state.db, &form.class_name).await?;

        if requires_parent_details(&class.class_name) {
            let complete = form
                .parent_details
                .as_ref()
                .is_some_and(|p| p.name.is_some() && p.relationship.is_some());
            if !complete {
                return Err(AppError::bad_request(anyhow!(
                    "parentDetails required for classes 1-5"
                )));
            }
        }

        let student_id = UserId::new();
        let profile_picture = Self::store_document(state, student_id, profile_picture).await?;
        let government_proof = Self::store_document(state, student_id, government_proof).await?;

        let parent = form.parent_details.clone().unwrap_or_default();
        let address = form.address.clone().unwrap_or_default();

        sqlx::query(
            r#"INSERT INTO users
                   (id, role, full_name, email, phone, dob, academic_region, class_id,
                    student_status, registration_source, profile_picture, government_proof,
                    parent_name, parent_relationship, parent_email, parent_phone,
                    address_country, address_state, address_city, address_pincode, address_full,
                    academic_year, how_did_you_find_us)
               VALUES ($1, 'student', $2, $3, $4, $5, $6, $7, 'pending', $8, $9, $10,
                       $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21)"#,
        )
        .bind(student_id)
        .bind(form.full_name.trim())
        .bind(&email)
        .bind(form.phone.as_deref().map(str::trim))
        .bind(form.dob)
        .bind(form.academic_region.as_deref().map(str::trim))
        .bind(class.id)
        .bind(form.registration_source.unwrap_or(RegistrationSource::Student))
        .bind(&profile_picture)
        .bind(&government_proof)
        .bind(&parent.name)
        .bind(&parent.relationship)
        .bind(parent.email.as_deref().map(normalize_email))
        .bind(&parent.phone)
        .bind(&address.country)
        .bind(&address.state)
        .bind(&address.city)
        .bind(&address.pincode)
        .bind(&address.full_address)
        .bind(&form.academic_year)
        .bind(&form.how_did_you_find_us)
        .execute(&state.db)
        .await
        .map_err(insert_error("Failed to store admission request"))?;

        track_registration(UserRole::Student);
        info!(student.id = %student_id, class = %class.class_name, "Admission request submitted");
        Ok(student_id)
    }

    #[instrument(skip(state, dto), fields(email = %dto.email))]
    pub async fn verify_otp(state: &AppState, dto: VerifyOtpDto) -> Result<(), AppError> {
        let user = UserService::find_by_email(&state.db, &dto.email)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("User not found")))?;
        if user.is_email_verified {
            return Err(AppError::bad_request(anyhow!("Email already verified")));
        }
        OtpService::verify_email(&state.db, &user, &dto.otp).await?;
        info!(user.id = %user.id, "Email verified");
        Ok(())
    }

    /// Students sign in with their email or their role number.
    #[instrument(skip(state, dto), fields(identifier = %dto.identifier))]
    pub async fn login_student(
        state: &AppState,
        dto: StudentLoginDto,
    ) -> Result<AuthResponse, AppError> {
        let identifier = dto.identifier.trim();
        let user = match UserService::find_by_email(&state.db, identifier).await? {
            Some(user) => Some(user),
            None => UserService::find_by_role_number(&state.db, identifier).await?,
        };

        let user = user
            .ok_or_else(invalid_credentials)
            .and_then(|user| student_login_gate(&user).map(|_| user))
            .and_then(|user| check_password(&user, &dto.password).map(|_| user))
            .map_err(|e| login_failed(UserRole::Student, identifier, e))?;

        track_login(UserRole::Student, true);
        Ok(AuthResponse {
            token: issue_token(state, &user)?,
            user: UserProfile::from(user),
        })
    }

    /// Teachers start pending; their email is taken as verified.
    #[instrument(skip(state, dto), fields(email = %dto.email))]
    pub async fn signup_teacher(
        state: &AppState,
        dto: TeacherSignupDto,
    ) -> Result<UserProfile, AppError> {
        let email = normalize_email(&dto.email);
        UserService::ensure_email_available(&state.db, &email).await?;
        let password_hash = hash_password(&dto.password)?;

        let specialization: Vec<String> = dto
            .subject_specialization
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let teacher = sqlx::query_as::<_, User>(
            r#"INSERT INTO users
                   (role, full_name, email, phone, password_hash, is_email_verified, gender,
                    country_region, state, city, qualification, subject_specialization,
                    id_proof_url, teacher_status)
               VALUES ('teacher', $1, $2, $3, $4, TRUE, $5, $6, $7, $8, $9, $10, $11, 'pending')
               RETURNING *"#,
        )
        .bind(dto.full_name.trim())
        .bind(&email)
        .bind(dto.phone.trim())
        .bind(&password_hash)
        .bind(&dto.gender)
        .bind(dto.country_region.trim())
        .bind(dto.state.trim())
        .bind(dto.city.trim())
        .bind(dto.qualification.trim())
        .bind(&specialization)
        .bind(&dto.id_proof_url)
        .fetch_one(&state.db)
        .await
        .map_err(insert_error("Failed to create teacher"))?;

        dispatch(
            state.notifier.as_ref(),
            &teacher.email,
            email_templates::teacher_signup_received(&teacher.full_name),
        )
        .await;

        track_registration(UserRole::Teacher);
        info!(teacher.id = %teacher.id, "Teacher signed up");
        Ok(UserProfile::from(teacher))
    }

    #[instrument(skip(state, dto), fields(email = %dto.email))]
    pub async fn login_teacher(state: &AppState, dto: LoginDto) -> Result<AuthResponse, AppError> {
        Self::login_by_email(state, dto, UserRole::Teacher, teacher_login_gate).await
    }

    #[instrument(skip(state, dto), fields(email = %dto.email))]
    pub async fn login_admin(state: &AppState, dto: LoginDto) -> Result<AuthResponse, AppError> {
        Self::login_by_email(state, dto, UserRole::Admin, |user| {
            if user.is_email_verified {
                Ok(())
            } else {
                Err(AppError::forbidden("Please verify your email first"))
            }
        })
        .await
    }

    async fn login_by_email(
        state: &AppState,
        dto: LoginDto,
        role: UserRole,
        gate: impl Fn(&User) -> Result<(), AppError>,
    ) -> Result<AuthResponse, AppError> {
        let user = UserService::find_by_email(&state.db, &dto.email)
            .await?
            .filter(|user| user.role == role)
            .ok_or_else(invalid_credentials)
            .and_then(|user| check_password(&user, &dto.password).map(|_| user))
            .and_then(|user| gate(&user).map(|_| user))
            .map_err(|e| login_failed(role, &dto.email, e))?;

        track_login(role, true);
        Ok(AuthResponse {
            token: issue_token(state, &user)?,
            user: UserProfile::from(user),
        })
    }

    /// Creates a parent linked to existing students. Every role number must
    /// belong to a student.
    #[instrument(skip(state, dto), fields(email = %dto.email))]
    pub async fn register_parent(
        state: &AppState,
        dto: ParentRegisterDto,
    ) -> Result<ParentRegisterResponse, AppError> {
        let email = normalize_email(&dto.email);
        UserService::ensure_email_available(&state.db, &email).await?;

        for link in &dto.linked_students {
            let role_number = normalize_role_number(&link.student_id);
            let is_student = UserService::find_by_role_number(&state.db, &role_number)
                .await?
                .is_some_and(|u| u.role == UserRole::Student);
            if !is_student {
                return Err(AppError::not_found(anyhow!(
                    "Student with ID {role_number} not found"
                )));
            }
        }

        let password_hash = hash_password(&dto.password)?;
        let mut tx = state
            .db
            .begin()
            .await
            .context("Failed to begin transaction")
            .map_err(AppError::database)?;

        let parent_id: UserId = sqlx::query_scalar(
            r#"INSERT INTO users (role, full_name, email, phone, password_hash, is_email_verified)
               VALUES ('parent', $1, $2, $3, $4, TRUE)
               RETURNING id"#,
        )
        .bind(dto.full_name.trim())
        .bind(&email)
        .bind(dto.phone.trim())
        .bind(&password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(insert_error("Failed to create parent"))?;

        ParentService::link_students(&mut tx, parent_id, &dto.linked_students).await?;

        tx.commit()
            .await
            .context("Failed to commit parent registration")
            .map_err(AppError::database)?;

        track_registration(UserRole::Parent);
        info!(parent.id = %parent_id, links = dto.linked_students.len(), "Parent registered");

        Ok(ParentRegisterResponse {
            message: "Parent registered successfully".to_string(),
            email,
            linked_students: ParentService::linked_students(&state.db, parent_id).await?,
        })
    }

    /// Parents sign in with a linked student's role number. When several
    /// parents share the student, the one whose password matches wins.
    #[instrument(skip(state, dto), fields(student_id = %dto.student_id))]
    pub async fn login_parent(
        state: &AppState,
        dto: ParentLoginDto,
    ) -> Result<ParentAuthResponse, AppError> {
        let role_number = normalize_role_number(&dto.student_id);
        let mut matched = None;
        for parent in ParentService::parents_of(&state.db, &role_number).await? {
            if check_password(&parent, &dto.password).is_ok() {
                matched = Some(parent);
                break;
            }
        }

        let parent = matched
            .ok_or_else(invalid_credentials)
            .map_err(|e| login_failed(UserRole::Parent, &role_number, e))?;

        track_login(UserRole::Parent, true);
        Ok(ParentAuthResponse {
            token: issue_token(state, &parent)?,
            linked_students: ParentService::linked_students(&state.db, parent.id).await?,
            user: UserProfile::from(parent),
        })
    }

    /// Admins verify their email with an OTP before they can sign in.
    #[instrument(skip(state, dto), fields(email = %dto.email))]
    pub async fn register_admin(
        state: &AppState,
        dto: AdminRegisterDto,
    ) -> Result<EmailMessageResponse, AppError> {
        let email = normalize_email(&dto.email);
        UserService::ensure_email_available(&state.db, &email).await?;
        let password_hash = hash_password(&dto.password)?;

        let admin_id: UserId = sqlx::query_scalar(
            r#"INSERT INTO users (role, full_name, email, password_hash)
               VALUES ('admin', $1, $2, $3)
               RETURNING id"#,
        )
        .bind(dto.name.trim())
        .bind(&email)
        .bind(&password_hash)
        .fetch_one(&state.db)
        .await
        .map_err(insert_error("Failed to create admin"))?;

        let otp =
            OtpService::issue_verification(&state.db, admin_id, state.otp_config.ttl_minutes).await?;
        dispatch_otp(
            state.notifier.as_ref(),
            &email,
            &otp.code,
            state.otp_config.ttl_minutes,
            OtpPurpose::Verification,
        )
        .await;

        track_registration(UserRole::Admin);
        info!(admin.id = %admin_id, "Admin registered");
        Ok(EmailMessageResponse {
            message: "Admin registered. Please verify the OTP sent to your email.".to_string(),
            email: Some(email),
        })
    }

    /// Sends a reset code when the account exists. The answer is the same
    /// either way, apart from 429 once the attempt cap is reached.
    #[instrument(skip(state, dto), fields(email = %dto.email))]
    pub async fn request_password_reset(
        state: &AppState,
        dto: ForgotPasswordDto,
    ) -> Result<EmailMessageResponse, AppError> {
        let email = normalize_email(&dto.email);
        if let Some(user) = UserService::find_by_email(&state.db, &email).await? {
            let max_attempts = state.otp_config.max_reset_attempts;
            ensure_reset_allowed(user.reset_password_attempts, max_attempts).map_err(|e| {
                security_event!("reset_attempts_exceeded", user.id = %user.id, "Reset cap reached");
                e.into_app_error()
            })?;
            let otp = OtpService::issue_reset(
                &state.db,
                user.id,
                state.otp_config.ttl_minutes,
                max_attempts,
            )
            .await?;
            dispatch_otp(
                state.notifier.as_ref(),
                &user.email,
                &otp.code,
                state.otp_config.ttl_minutes,
                OtpPurpose::PasswordReset,
            )
            .await;
        }

        Ok(EmailMessageResponse {
            message: RESET_REQUESTED.to_string(),
            email: Some(email),
        })
    }

    #[instrument(skip(state, dto), fields(email = %dto.email))]
    pub async fn verify_reset_otp(state: &AppState, dto: VerifyOtpDto) -> Result<(), AppError> {
        let user = UserService::find_by_email(&state.db, &dto.email)
            .await?
            .ok_or_else(|| AppError::bad_request(anyhow!("Invalid OTP")))?;
        OtpService::verify_reset(&state.db, &user, &dto.otp).await
    }

    #[instrument(skip(state, dto), fields(email = %dto.email))]
    pub async fn reset_password(state: &AppState, dto: ResetPasswordDto) -> Result<(), AppError> {
        let user = UserService::find_by_email(&state.db, &dto.email)
            .await?
            .ok_or_else(|| AppError::bad_request(anyhow!("Invalid OTP")))?;
        let password_hash = hash_password(&dto.new_password)?;
        OtpService::complete_reset(&state.db, &user, &dto.otp, &password_hash).await?;

        dispatch(
            state.notifier.as_ref(),
            &user.email,
            email_templates::password_changed(&user.full_name),
        )
        .await;
        info!(user.id = %user.id, "Password reset");
        Ok(())
    }

    pub async fn me(db: &PgPool, user_id: UserId) -> Result<UserProfile, AppError> {
        Ok(UserProfile::from(UserService::get_by_id(db, user_id).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(role: UserRole) -> User {
        User {
            id: UserId::new(),
            role,
            full_name: "Asha Rao".to_string(),
            email: "asha@school.test".to_string(),
            phone: None,
            password_hash: None,
            is_email_verified: true,
            otp_code: None,
            otp_expires_at: None,
            reset_otp_code: None,
            reset_otp_expires_at: None,
            reset_otp_verified: false,
            reset_password_attempts: 0,
            class_id: None,
            role_number: Some("NO001".to_string()),
            academic_region: Some("North".to_string()),
            student_status: None,
            registration_source: None,
            dob: None,
            academic_year: None,
            how_did_you_find_us: None,
            address_country: None,
            address_state: None,
            address_city: None,
            address_pincode: None,
            address_full: None,
            parent_name: None,
            parent_relationship: None,
            parent_email: None,
            parent_phone: None,
            profile_picture: None,
            government_proof: None,
            gender: None,
            country_region: None,
            state: None,
            city: None,
            subject_specialization: Vec::new(),
            qualification: None,
            id_proof_url: None,
            teacher_status: None,
            rejection_reason: None,
            approved_at: None,
            approved_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_pending_student_cannot_login() {
        let mut student = user(UserRole::Student);
        student.student_status = Some(ApprovalStatus::Pending);
        let err = student_login_gate(&student).unwrap_err();
        assert_eq!(err.status.as_u16(), 403);
        assert!(err.public_message().contains("pending"));
    }

    #[test]
    fn test_unverified_student_cannot_login() {
        let mut student = user(UserRole::Student);
        student.student_status = Some(ApprovalStatus::Approved);
        student.is_email_verified = false;
        assert_eq!(student_login_gate(&student).unwrap_err().status.as_u16(), 403);

        student.is_email_verified = true;
        assert!(student_login_gate(&student).is_ok());
    }

    #[test]
    fn test_student_portal_rejects_other_roles() {
        let teacher = user(UserRole::Teacher);
        assert!(
            student_login_gate(&teacher)
                .unwrap_err()
                .public_message()
                .contains("correct login portal")
        );
    }

    #[test]
    fn test_rejected_teacher_sees_reason() {
        let mut teacher = user(UserRole::Teacher);
        teacher.teacher_status = Some(ApprovalStatus::Rejected);
        teacher.rejection_reason = Some("Missing certificate".to_string());
        let err = teacher_login_gate(&teacher).unwrap_err();
        assert_eq!(err.status.as_u16(), 403);
        assert!(err.public_message().contains("Missing certificate"));

        teacher.teacher_status = Some(ApprovalStatus::Pending);
        assert!(teacher_login_gate(&teacher).unwrap_err().public_message().contains("pending"));
    }

    #[test]
    fn test_account_without_password_cannot_login() {
        let student = user(UserRole::Student);
        assert_eq!(check_password(&student, "anything").unwrap_err().status.as_u16(), 401);
    }
}
