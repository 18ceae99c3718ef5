//! Admission and teacher-account decisions.
//!
//! Student approval runs in one transaction: the status transition, the role
//! number and initial password, and the parent account. Emails go out only
//! after commit and never fail the approval.

use anyhow::Context;
use sqlx::{PgConnection, PgPool};
use tracing::{instrument, warn};

use schoolhub_auth::UserRole;
use schoolhub_core::password::{GENERATED_PASSWORD_LENGTH, generate_password, hash_password};
use schoolhub_core::{AppError, PageParams, Paginated};
use schoolhub_db::is_unique_violation;
use schoolhub_models::users::{StudentSummary, TeacherSummary};
use schoolhub_models::value_types::normalize_email;
use schoolhub_models::{User, UserId, UserProfile};

use crate::modules::moderation::{
    Decision, Moderatable, ModerationError, StudentAccount, TeacherAccount, decide,
    record_decision,
};
use crate::modules::parents::service::ParentService;
use crate::state::AppState;
use crate::utils::email_templates;
use crate::utils::notifier::dispatch;

use super::role_number;

/// Parent account touched by a student approval. `password` is the
/// generated credential emailed to the parent.
#[derive(Debug, Clone)]
pub struct ProvisionedParent {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub password: String,
    pub created: bool,
}

#[derive(Debug, Clone)]
pub struct StudentApproval {
    pub student: User,
    pub parent: Option<ProvisionedParent>,
}

const STUDENT_SUMMARY_SELECT: &str = r#"
    SELECT u.id, u.full_name, u.email, u.phone, u.role_number, u.academic_region,
           u.class_id, c.class_name, u.student_status, u.registration_source,
           u.is_email_verified, u.created_at
    FROM users u
    LEFT JOIN classes c ON c.id = u.class_id"#;

const TEACHER_SUMMARY_SELECT: &str = r#"
    SELECT id, full_name, email, phone, gender, qualification, subject_specialization,
           teacher_status, rejection_reason, approved_at, created_at
    FROM users"#;

pub struct ApprovalService;

impl ApprovalService {
    #[instrument(skip(db))]
    pub async fn pending_teachers(db: &PgPool) -> Result<Vec<TeacherSummary>, AppError> {
        sqlx::query_as::<_, TeacherSummary>(&format!(
            "{TEACHER_SUMMARY_SELECT} WHERE role = 'teacher' AND teacher_status = 'pending' ORDER BY created_at"
        ))
        .fetch_all(db)
        .await
        .context("Failed to fetch pending teachers")
        .map_err(AppError::database)
    }

    #[instrument(skip(db))]
    pub async fn list_teachers(
        db: &PgPool,
        params: &PageParams,
    ) -> Result<Paginated<TeacherSummary>, AppError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'teacher'")
            .fetch_one(db)
            .await
            .context("Failed to count teachers")
            .map_err(AppError::database)?;

        let data = sqlx::query_as::<_, TeacherSummary>(&format!(
            "{TEACHER_SUMMARY_SELECT} WHERE role = 'teacher' ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(db)
        .await
        .context("Failed to fetch teachers")
        .map_err(AppError::database)?;

        Ok(Paginated {
            data,
            meta: params.meta(total),
        })
    }

    pub async fn teacher_by_email(db: &PgPool, email: &str) -> Result<UserProfile, AppError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1 AND role = 'teacher'")
            .bind(normalize_email(email))
            .fetch_optional(db)
            .await
            .context("Failed to fetch teacher")
            .map_err(AppError::database)?
            .map(UserProfile::from)
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Teacher not found")))
    }

    /// Approves or rejects a pending teacher; the teacher is emailed either way.
    #[instrument(skip(state))]
    pub async fn decide_teacher(
        state: &AppState,
        email: &str,
        admin: UserId,
        decision: Decision,
    ) -> Result<UserProfile, AppError> {
        let TeacherAccount(teacher) =
            decide::<TeacherAccount>(state, &normalize_email(email), admin, &decision).await?;
        Ok(UserProfile::from(teacher))
    }

    #[instrument(skip(db))]
    pub async fn pending_students(db: &PgPool) -> Result<Vec<StudentSummary>, AppError> {
        sqlx::query_as::<_, StudentSummary>(&format!(
            "{STUDENT_SUMMARY_SELECT} WHERE u.role = 'student' AND u.student_status = 'pending' ORDER BY u.created_at"
        ))
        .fetch_all(db)
        .await
        .context("Failed to fetch pending students")
        .map_err(AppError::database)
    }

    #[instrument(skip(db))]
    pub async fn list_students(
        db: &PgPool,
        params: &PageParams,
    ) -> Result<Paginated<StudentSummary>, AppError> {
        let total = Self::count_students(db).await?;

        let data = sqlx::query_as::<_, StudentSummary>(&format!(
            "{STUDENT_SUMMARY_SELECT} WHERE u.role = 'student' ORDER BY u.created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(db)
        .await
        .context("Failed to fetch students")
        .map_err(AppError::database)?;

        Ok(Paginated {
            data,
            meta: params.meta(total),
        })
    }

    pub async fn count_students(db: &PgPool) -> Result<i64, AppError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'student'")
            .fetch_one(db)
            .await
            .context("Failed to count students")
            .map_err(AppError::database)
    }

    /// Admits a pending student.
    ///
    /// A student without a role number gets one. Either way the password is
    /// reset to the role number. When the admission carries a
    /// parent email, the parent account with that email is linked and given
    /// a fresh password, or created.
    #[instrument(skip(state))]
    pub async fn approve_student(
        state: &AppState,
        student_id: UserId,
        admin: UserId,
    ) -> Result<StudentApproval, AppError> {
        let mut tx = state
            .db
            .begin()
            .await
            .context("Failed to start transaction")
            .map_err(AppError::database)?;

        let StudentAccount(student) = StudentAccount::approve(&mut tx, &student_id, admin)
            .await
            .map_err(ModerationError::into_app_error)?;
        let student = Self::assign_credentials(&mut tx, student).await?;

        let parent = Self::provision_parent(&mut tx, &student).await?;

        tx.commit()
            .await
            .context("Failed to commit student approval")
            .map_err(AppError::database)?;

        let approval = StudentApproval { student, parent };
        let account = StudentAccount(approval.student.clone());
        record_decision(&account, admin);
        Self::notify_approval(state, &approval).await;

        Ok(approval)
    }

    /// Rejects a pending student and informs the student and the parent
    /// contact, if any.
    #[instrument(skip(state, reason))]
    pub async fn reject_student(
        state: &AppState,
        student_id: UserId,
        admin: UserId,
        reason: &str,
    ) -> Result<User, AppError> {
        let decision = Decision::reject(reason).map_err(ModerationError::into_app_error)?;
        let StudentAccount(student) =
            decide::<StudentAccount>(state, &student_id, admin, &decision).await?;

        let reason = student.rejection_reason.as_deref().unwrap_or_default();
        let notifier = state.notifier.as_ref();
        dispatch(
            notifier,
            &student.email,
            email_templates::student_rejected(&student.full_name, reason),
        )
        .await;
        if let Some(parent_email) = student.parent_email.as_deref() {
            let parent_name = student.parent_name.as_deref().unwrap_or("Parent");
            dispatch(
                notifier,
                parent_email,
                email_templates::student_rejected(parent_name, reason),
            )
            .await;
        }

        Ok(student)
    }

    async fn assign_credentials(conn: &mut PgConnection, student: User) -> Result<User, AppError> {
        let role_number = match student.role_number.clone() {
            Some(existing) => existing,
            None => {
                role_number::generate(
                    &mut *conn,
                    student.academic_region.as_deref().unwrap_or_default(),
                )
                .await?
            }
        };
        let password_hash = hash_password(&role_number)?;

        sqlx::query_as::<_, User>(
            r#"UPDATE users SET role_number = $2, password_hash = $3, updated_at = NOW()
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(student.id)
        .bind(&role_number)
        .bind(&password_hash)
        .fetch_one(conn)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::conflict(anyhow::anyhow!(
                    "Role number {role_number} is already assigned, please retry"
                ))
            } else {
                AppError::database(anyhow::Error::new(e).context("Failed to assign role number"))
            }
        })
    }

    async fn provision_parent(
        conn: &mut PgConnection,
        student: &User,
    ) -> Result<Option<ProvisionedParent>, AppError> {
        let (Some(parent_email), Some(role_number)) =
            (student.parent_email.as_deref(), student.role_number.as_deref())
        else {
            return Ok(None);
        };
        let parent_email = normalize_email(parent_email);
        let relationship = student.parent_relationship.as_deref().unwrap_or("Parent");

        let password = generate_password(GENERATED_PASSWORD_LENGTH);
        let password_hash = hash_password(&password)?;

        let existing: Option<(UserId, UserRole, String)> =
            sqlx::query_as("SELECT id, role, full_name FROM users WHERE email = $1")
                .bind(&parent_email)
                .fetch_optional(&mut *conn)
                .await
                .context("Failed to look up parent")
                .map_err(AppError::database)?;

        let (id, name, created) = match existing {
            Some((id, UserRole::Parent, name)) => {
                sqlx::query(
                    r#"UPDATE users SET password_hash = $2, is_email_verified = TRUE, updated_at = NOW()
                       WHERE id = $1"#,
                )
                .bind(id)
                .bind(&password_hash)
                .execute(&mut *conn)
                .await
                .context("Failed to update parent")
                .map_err(AppError::database)?;
                (id, name, false)
            }
            Some((_, role, _)) => {
                warn!(
                    student.id = %student.id,
                    role = %role,
                    "Parent email belongs to another account, skipping parent provisioning"
                );
                return Ok(None);
            }
            None => {
                let name = student
                    .parent_name
                    .clone()
                    .unwrap_or_else(|| "Parent".to_string());
                let id: UserId = sqlx::query_scalar(
                    r#"INSERT INTO users (role, full_name, email, phone, password_hash, is_email_verified)
                       VALUES ('parent', $1, $2, $3, $4, TRUE)
                       RETURNING id"#,
                )
                .bind(&name)
                .bind(&parent_email)
                .bind(student.parent_phone.as_ref().or(student.phone.as_ref()))
                .bind(&password_hash)
                .fetch_one(&mut *conn)
                .await
                .context("Failed to create parent")
                .map_err(AppError::database)?;
                (id, name, true)
            }
        };

        ParentService::link_student(&mut *conn, id, role_number, relationship).await?;

        Ok(Some(ProvisionedParent {
            id,
            name,
            email: parent_email,
            password,
            created,
        }))
    }

    async fn notify_approval(state: &AppState, approval: &StudentApproval) {
        let student = &approval.student;
        let frontend_url = &state.email_config.frontend_url;
        let role_number = student.role_number.as_deref().unwrap_or_default();

        dispatch(
            state.notifier.as_ref(),
            &student.email,
            email_templates::student_approved(&student.full_name, role_number, frontend_url),
        )
        .await;

        if let Some(parent) = &approval.parent {
            dispatch(
                state.notifier.as_ref(),
                &parent.email,
                email_templates::parent_credentials(
                    &parent.name,
                    &student.full_name,
                    role_number,
                    &parent.password,
                    frontend_url,
                ),
            )
            .await;
        }
    }
}
