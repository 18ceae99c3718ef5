use anyhow::Context;
use sqlx::PgPool;
use tracing::instrument;

use schoolhub_core::AppError;
use schoolhub_db::is_unique_violation;
use schoolhub_models::academics::{
    Class, ClassWithSubjects, CreateClassDto, CreateSubjectDto, Subject, default_subject_code,
};
use schoolhub_models::{ClassId, SubjectId};

pub struct ClassService;

impl ClassService {
    #[instrument(skip(db))]
    pub async fn list_classes(db: &PgPool) -> Result<Vec<Class>, AppError> {
        sqlx::query_as::<_, Class>(
            "SELECT * FROM classes ORDER BY NULLIF(regexp_replace(class_name, '\\D', '', 'g'), '')::INT NULLS LAST, class_name",
        )
        .fetch_all(db)
        .await
        .context("Failed to fetch classes")
        .map_err(AppError::database)
    }

    pub async fn get_class(db: &PgPool, id: ClassId) -> Result<Class, AppError> {
        sqlx::query_as::<_, Class>("SELECT * FROM classes WHERE id = $1")
            .bind(id)
            .fetch_optional(db)
            .await
            .context("Failed to fetch class")
            .map_err(AppError::database)?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Class not found")))
    }

    #[instrument(skip(db))]
    pub async fn get_class_by_name(db: &PgPool, class_name: &str) -> Result<Class, AppError> {
        sqlx::query_as::<_, Class>("SELECT * FROM classes WHERE class_name = $1")
            .bind(class_name.trim())
            .fetch_optional(db)
            .await
            .context("Failed to fetch class by name")
            .map_err(AppError::database)?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Class not found")))
    }

    pub async fn subjects_of_class(db: &PgPool, class_id: ClassId) -> Result<Vec<Subject>, AppError> {
        sqlx::query_as::<_, Subject>(
            "SELECT * FROM subjects WHERE class_id = $1 ORDER BY subject_name",
        )
        .bind(class_id)
        .fetch_all(db)
        .await
        .context("Failed to fetch subjects")
        .map_err(AppError::database)
    }

    #[instrument(skip(db))]
    pub async fn get_class_with_subjects(
        db: &PgPool,
        id: ClassId,
    ) -> Result<ClassWithSubjects, AppError> {
        let class = Self::get_class(db, id).await?;
        let subjects = Self::subjects_of_class(db, id).await?;
        Ok(ClassWithSubjects { class, subjects })
    }

    pub async fn get_subject(db: &PgPool, id: SubjectId) -> Result<Subject, AppError> {
        sqlx::query_as::<_, Subject>("SELECT * FROM subjects WHERE id = $1")
            .bind(id)
            .fetch_optional(db)
            .await
            .context("Failed to fetch subject")
            .map_err(AppError::database)?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Subject not found")))
    }

    /// Subject of `class_id` whose name matches case-insensitively.
    pub async fn find_subject_in_class(
        db: &PgPool,
        class_id: ClassId,
        subject_name: &str,
    ) -> Result<Subject, AppError> {
        sqlx::query_as::<_, Subject>(
            "SELECT * FROM subjects WHERE class_id = $1 AND LOWER(subject_name) = LOWER($2)",
        )
        .bind(class_id)
        .bind(subject_name.trim())
        .fetch_optional(db)
        .await
        .context("Failed to fetch subject by name")
        .map_err(AppError::database)?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Subject not found in this class")))
    }

    #[instrument(skip(db))]
    pub async fn create_class(db: &PgPool, dto: CreateClassDto) -> Result<Class, AppError> {
        sqlx::query_as::<_, Class>(
            r#"INSERT INTO classes (class_name, class_code, description)
               VALUES ($1, $2, $3)
               RETURNING *"#,
        )
        .bind(dto.class_name.trim())
        .bind(dto.class_code.trim().to_uppercase())
        .bind(&dto.description)
        .fetch_one(db)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::conflict(anyhow::anyhow!("Class already exists"))
            } else {
                AppError::database(anyhow::Error::new(e).context("Failed to create class"))
            }
        })
    }

    #[instrument(skip(db))]
    pub async fn create_subject(db: &PgPool, dto: CreateSubjectDto) -> Result<Subject, AppError> {
        let class = Self::get_class(db, dto.class_id).await?;
        let code = match &dto.subject_code {
            Some(code) => code.trim().to_uppercase(),
            None => default_subject_code(&dto.subject_name, &class.class_name),
        };

        sqlx::query_as::<_, Subject>(
            r#"INSERT INTO subjects (subject_code, subject_name, description, class_id)
               VALUES ($1, $2, $3, $4)
               RETURNING *"#,
        )
        .bind(&code)
        .bind(dto.subject_name.trim())
        .bind(&dto.description)
        .bind(class.id)
        .fetch_one(db)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::conflict(anyhow::anyhow!("Subject code {code} already exists"))
            } else {
                AppError::database(anyhow::Error::new(e).context("Failed to create subject"))
            }
        })
    }
}
