use anyhow::Context;
use sqlx::PgPool;
use tracing::instrument;

use schoolhub_auth::UserRole;
use schoolhub_core::AppError;
use schoolhub_models::users::UserCounts;
use schoolhub_models::value_types::{normalize_email, normalize_role_number};
use schoolhub_models::{User, UserId};

use crate::audit_event;

pub struct UserService;

impl UserService {
    #[instrument(skip(db))]
    pub async fn find_by_id(db: &PgPool, id: UserId) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(db)
            .await
            .context("Failed to fetch user")
            .map_err(AppError::database)
    }

    pub async fn get_by_id(db: &PgPool, id: UserId) -> Result<User, AppError> {
        Self::find_by_id(db, id)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("User not found")))
    }

    /// Looks up an account by email, case-insensitively.
    #[instrument(skip(db))]
    pub async fn find_by_email(db: &PgPool, email: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(normalize_email(email))
            .fetch_optional(db)
            .await
            .context("Failed to fetch user by email")
            .map_err(AppError::database)
    }

    #[instrument(skip(db))]
    pub async fn find_by_role_number(
        db: &PgPool,
        role_number: &str,
    ) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE role_number = $1")
            .bind(normalize_role_number(role_number))
            .fetch_optional(db)
            .await
            .context("Failed to fetch user by role number")
            .map_err(AppError::database)
    }

    /// Fails with 409 when the email is already registered.
    pub async fn ensure_email_available(db: &PgPool, email: &str) -> Result<(), AppError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(normalize_email(email))
                .fetch_one(db)
                .await
                .context("Failed to check email")
                .map_err(AppError::database)?;

        if exists {
            return Err(AppError::conflict(anyhow::anyhow!("Email already registered")));
        }
        Ok(())
    }

    #[instrument(skip(db))]
    pub async fn counts(db: &PgPool) -> Result<UserCounts, AppError> {
        let row: (i64, i64, i64, i64, i64, i64) = sqlx::query_as(
            r#"SELECT
                   COUNT(*) FILTER (WHERE role = 'admin'),
                   COUNT(*) FILTER (WHERE role = 'teacher'),
                   COUNT(*) FILTER (WHERE role = 'student'),
                   COUNT(*) FILTER (WHERE role = 'parent'),
                   COUNT(*) FILTER (WHERE role = 'student' AND student_status = 'pending'),
                   COUNT(*) FILTER (WHERE role = 'teacher' AND teacher_status = 'pending')
               FROM users"#,
        )
        .fetch_one(db)
        .await
        .context("Failed to count users")
        .map_err(AppError::database)?;

        Ok(UserCounts {
            admins: row.0,
            teachers: row.1,
            students: row.2,
            parents: row.3,
            pending_students: row.4,
            pending_teachers: row.5,
        })
    }

    /// Hard delete. Rows that only reference the user by role number, such
    /// as parent links, are left in place.
    #[instrument(skip(db))]
    pub async fn delete_user(db: &PgPool, id: UserId, deleted_by: UserId) -> Result<(), AppError> {
        let user = Self::get_by_id(db, id).await?;
        if user.role == UserRole::Admin {
            return Err(AppError::forbidden("Admin accounts cannot be deleted"));
        }

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .context("Failed to delete user")
            .map_err(AppError::database)?;

        audit_event!(
            "user.delete",
            "user",
            user.id = %id,
            user.role = %user.role,
            actor.id = %deleted_by
        );
        Ok(())
    }
}
