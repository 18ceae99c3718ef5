use std::collections::HashMap;

use anyhow::Context;
use sqlx::{FromRow, PgConnection, PgPool};
use tracing::instrument;

use schoolhub_core::{AppError, PageParams, Paginated};
use schoolhub_models::auth::LinkStudentDto;
use schoolhub_models::users::{LinkedStudentInfo, ParentWithStudents};
use schoolhub_models::value_types::normalize_role_number;
use schoolhub_models::{User, UserId, UserProfile};

pub struct ParentService;

#[derive(Debug, FromRow)]
struct ParentLinkRow {
    parent_id: UserId,
    #[sqlx(flatten)]
    info: LinkedStudentInfo,
}

const LINKED_STUDENT_COLUMNS: &str = r#"
    ps.student_role_number AS student_id,
    ps.relationship,
    u.full_name AS student_name,
    u.class_id,
    c.class_name,
    u.academic_region AS region"#;

impl ParentService {
    /// True when `parent_id` has a link to the student with `role_number`.
    #[instrument(skip(db))]
    pub async fn is_linked(
        db: &PgPool,
        parent_id: UserId,
        role_number: &str,
    ) -> Result<bool, AppError> {
        sqlx::query_scalar(
            r#"SELECT EXISTS(
                   SELECT 1 FROM parent_students
                   WHERE parent_id = $1 AND student_role_number = $2)"#,
        )
        .bind(parent_id)
        .bind(normalize_role_number(role_number))
        .fetch_one(db)
        .await
        .context("Failed to check parent link")
        .map_err(AppError::database)
    }

    pub async fn child_by_role_number(db: &PgPool, role_number: &str) -> Result<User, AppError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE role_number = $1 AND role = 'student'")
            .bind(normalize_role_number(role_number))
            .fetch_optional(db)
            .await
            .context("Failed to fetch student")
            .map_err(AppError::database)?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Student not found")))
    }

    /// Parents linked to the student, used by parent login.
    pub async fn parents_of(db: &PgPool, role_number: &str) -> Result<Vec<User>, AppError> {
        sqlx::query_as::<_, User>(
            r#"SELECT u.* FROM users u
               JOIN parent_students ps ON ps.parent_id = u.id
               WHERE ps.student_role_number = $1 AND u.role = 'parent'
               ORDER BY u.created_at"#,
        )
        .bind(normalize_role_number(role_number))
        .fetch_all(db)
        .await
        .context("Failed to fetch parents of student")
        .map_err(AppError::database)
    }

    #[instrument(skip(db))]
    pub async fn linked_students(
        db: &PgPool,
        parent_id: UserId,
    ) -> Result<Vec<LinkedStudentInfo>, AppError> {
        sqlx::query_as::<_, LinkedStudentInfo>(&format!(
            r#"SELECT {LINKED_STUDENT_COLUMNS}
               FROM parent_students ps
               LEFT JOIN users u ON u.role_number = ps.student_role_number AND u.role = 'student'
               LEFT JOIN classes c ON c.id = u.class_id
               WHERE ps.parent_id = $1
               ORDER BY ps.created_at"#
        ))
        .bind(parent_id)
        .fetch_all(db)
        .await
        .context("Failed to fetch linked students")
        .map_err(AppError::database)
    }

    /// Adds links, leaving existing ones untouched.
    pub async fn link_students(
        conn: &mut PgConnection,
        parent_id: UserId,
        links: &[LinkStudentDto],
    ) -> Result<(), AppError> {
        for link in links {
            Self::link_student(
                &mut *conn,
                parent_id,
                &link.student_id,
                &link.relationship,
            )
            .await?;
        }
        Ok(())
    }

    pub async fn link_student(
        conn: &mut PgConnection,
        parent_id: UserId,
        role_number: &str,
        relationship: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"INSERT INTO parent_students (parent_id, student_role_number, relationship)
               VALUES ($1, $2, $3)
               ON CONFLICT (parent_id, student_role_number) DO NOTHING"#,
        )
        .bind(parent_id)
        .bind(normalize_role_number(role_number))
        .bind(relationship)
        .execute(conn)
        .await
        .context("Failed to link student to parent")
        .map_err(AppError::database)?;
        Ok(())
    }

    #[instrument(skip(db))]
    pub async fn list_parents(
        db: &PgPool,
        params: &PageParams,
    ) -> Result<Paginated<UserProfile>, AppError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'parent'")
            .fetch_one(db)
            .await
            .context("Failed to count parents")
            .map_err(AppError::database)?;

        let parents = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE role = 'parent' ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(db)
        .await
        .context("Failed to fetch parents")
        .map_err(AppError::database)?;

        Ok(Paginated {
            data: parents.iter().map(UserProfile::from).collect(),
            meta: params.meta(total),
        })
    }

    /// Every parent with its linked students resolved, in two queries.
    #[instrument(skip(db))]
    pub async fn parents_with_students(db: &PgPool) -> Result<Vec<ParentWithStudents>, AppError> {
        let parents = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE role = 'parent' ORDER BY created_at DESC",
        )
        .fetch_all(db)
        .await
        .context("Failed to fetch parents")
        .map_err(AppError::database)?;

        let rows = sqlx::query_as::<_, ParentLinkRow>(&format!(
            r#"SELECT ps.parent_id, {LINKED_STUDENT_COLUMNS}
               FROM parent_students ps
               LEFT JOIN users u ON u.role_number = ps.student_role_number AND u.role = 'student'
               LEFT JOIN classes c ON c.id = u.class_id
               ORDER BY ps.created_at"#
        ))
        .fetch_all(db)
        .await
        .context("Failed to fetch parent links")
        .map_err(AppError::database)?;

        let mut links: HashMap<UserId, Vec<LinkedStudentInfo>> = HashMap::new();
        for row in rows {
            links.entry(row.parent_id).or_default().push(row.info);
        }

        Ok(parents
            .iter()
            .map(|parent| ParentWithStudents {
                parent: UserProfile::from(parent),
                linked_students: links.remove(&parent.id).unwrap_or_default(),
            })
            .collect())
    }
}
