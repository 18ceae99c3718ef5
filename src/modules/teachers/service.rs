use anyhow::{Context, anyhow};
use sqlx::PgPool;
use tracing::{info, instrument};

use schoolhub_auth::UserRole;
use schoolhub_core::AppError;
use schoolhub_models::users::{ClassRoster, RosterStudent};
use schoolhub_models::{User, UserId};

use crate::modules::classes::ClassService;
use crate::modules::users::UserService;

/// Names from `requested` with no case-insensitive match in `known`.
pub fn missing_subjects(requested: &[String], known: &[String]) -> Vec<String> {
    requested
        .iter()
        .filter(|name| !known.iter().any(|k| k.eq_ignore_ascii_case(name.trim())))
        .cloned()
        .collect()
}

pub struct TeacherService;

impl TeacherService {
    pub async fn load(db: &PgPool, id: UserId) -> Result<User, AppError> {
        UserService::find_by_id(db, id)
            .await?
            .filter(|user| user.role == UserRole::Teacher)
            .ok_or_else(|| AppError::not_found(anyhow!("Teacher not found")))
    }

    /// Replaces the specialisation list with the canonical names of the
    /// requested subjects.
    #[instrument(skip(db))]
    pub async fn update_specialization(
        db: &PgPool,
        teacher_id: UserId,
        requested: &[String],
    ) -> Result<User, AppError> {
        let lowered: Vec<String> = requested.iter().map(|s| s.trim().to_lowercase()).collect();
        let known: Vec<String> = sqlx::query_scalar(
            r#"SELECT DISTINCT ON (LOWER(subject_name)) subject_name
               FROM subjects
               WHERE LOWER(subject_name) = ANY($1)
               ORDER BY LOWER(subject_name), subject_name"#,
        )
        .bind(&lowered)
        .fetch_all(db)
        .await
        .context("Failed to look up subjects")
        .map_err(AppError::database)?;

        let missing = missing_subjects(requested, &known);
        if !missing.is_empty() {
            return Err(AppError::bad_request(anyhow!(
                "Invalid subjects: {}",
                missing.join(", ")
            )));
        }

        let teacher = sqlx::query_as::<_, User>(
            r#"UPDATE users SET subject_specialization = $2, updated_at = NOW()
               WHERE id = $1 AND role = 'teacher'
               RETURNING *"#,
        )
        .bind(teacher_id)
        .bind(&known)
        .fetch_optional(db)
        .await
        .context("Failed to update specialisation")
        .map_err(AppError::database)?
        .ok_or_else(|| AppError::not_found(anyhow!("Teacher not found")))?;

        info!(teacher.id = %teacher_id, subjects = known.len(), "Specialisation updated");
        Ok(teacher)
    }

    /// Students of a class, paired with one of its subjects.
    #[instrument(skip(db))]
    pub async fn roster(
        db: &PgPool,
        class_name: &str,
        subject_name: &str,
    ) -> Result<ClassRoster, AppError> {
        let class = ClassService::get_class_by_name(db, &class_name.replace('"', "")).await?;
        let subject = ClassService::find_subject_in_class(db, class.id, subject_name).await?;

        let students = sqlx::query_as::<_, RosterStudent>(
            r#"SELECT id, full_name, email, role_number
               FROM users
               WHERE role = 'student' AND class_id = $1 AND student_status = 'approved'
               ORDER BY role_number NULLS LAST, full_name"#,
        )
        .bind(class.id)
        .fetch_all(db)
        .await
        .context("Failed to fetch class roster")
        .map_err(AppError::database)?;

        Ok(ClassRoster {
            class_name: class.class_name,
            subject_name: subject.subject_name,
            subject_id: subject.id,
            students,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_subjects_ignores_case() {
        let requested = vec!["maths".to_string(), "Science".to_string(), "Latin".to_string()];
        let known = vec!["Maths".to_string(), "Science".to_string()];
        assert_eq!(missing_subjects(&requested, &known), vec!["Latin".to_string()]);
    }

    #[test]
    fn test_missing_subjects_empty_when_all_known() {
        let requested = vec![" English ".to_string()];
        let known = vec!["English".to_string()];
        assert!(missing_subjects(&requested, &known).is_empty());
    }
}
