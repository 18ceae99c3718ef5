use anyhow::{Context, anyhow};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{instrument, warn};

use schoolhub_auth::UserRole;
use schoolhub_core::AppError;
use schoolhub_models::assessments::{
    BulkMarkOutcome, BulkMarksResponse, CreateTestDto, MarkRow, MarkView, SubjectResultsSummary,
    Test, TestCount, TestView, UploadMarksDto, UploadedMark, marks_percentage,
};
use schoolhub_models::value_types::normalize_role_number;
use schoolhub_models::{ClassId, SubjectId, User, UserId};

use crate::metrics::track_tests_completed;
use crate::modules::classes::ClassService;
use crate::modules::users::UserService;

const TEST_VIEW_SELECT: &str = r#"
    SELECT t.id, t.title, t.subject_id, s.subject_name, t.class_id, c.class_name,
           t.total_marks, t.test_date, t.link, t.status, t.created_at
    FROM tests t
    JOIN subjects s ON s.id = t.subject_id
    JOIN classes c ON c.id = t.class_id
"#;

const MARK_SELECT: &str = r#"
    SELECT r.id AS result_id, u.id AS student_id, u.full_name AS student_name, u.role_number,
           t.id AS test_id, t.title AS test_title, t.test_date, s.subject_name, c.class_name,
           r.marks, t.total_marks
    FROM test_results r
    JOIN users u ON u.id = r.student_id
    JOIN tests t ON t.id = r.test_id
    JOIN subjects s ON s.id = t.subject_id
    JOIN classes c ON c.id = t.class_id
"#;

pub struct AssessmentService;

impl AssessmentService {
    #[instrument(skip(db, dto))]
    pub async fn create_test(
        db: &PgPool,
        teacher_id: UserId,
        dto: CreateTestDto,
    ) -> Result<Test, AppError> {
        let subject = ClassService::get_subject(db, dto.subject_id).await?;
        if subject.class_id != dto.class_id {
            return Err(AppError::bad_request(anyhow!(
                "Subject does not belong to this class"
            )));
        }

        sqlx::query_as::<_, Test>(
            r#"INSERT INTO tests (title, subject_id, class_id, total_marks, test_date, link, created_by)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING *"#,
        )
        .bind(dto.title.trim())
        .bind(dto.subject_id)
        .bind(dto.class_id)
        .bind(dto.total_marks)
        .bind(dto.test_date)
        .bind(dto.link.trim())
        .bind(teacher_id)
        .fetch_one(db)
        .await
        .context("Failed to create test")
        .map_err(AppError::database)
    }

    #[instrument(skip(db))]
    pub async fn teacher_tests(db: &PgPool, teacher_id: UserId) -> Result<Vec<TestView>, AppError> {
        sqlx::query_as::<_, TestView>(&format!(
            "{TEST_VIEW_SELECT} WHERE t.created_by = $1 ORDER BY t.test_date DESC"
        ))
        .bind(teacher_id)
        .fetch_all(db)
        .await
        .context("Failed to fetch teacher tests")
        .map_err(AppError::database)
    }

    /// Tests of a class, soonest first.
    #[instrument(skip(db))]
    pub async fn class_tests(db: &PgPool, class_id: ClassId) -> Result<Vec<TestView>, AppError> {
        sqlx::query_as::<_, TestView>(&format!(
            "{TEST_VIEW_SELECT} WHERE t.class_id = $1 ORDER BY t.test_date"
        ))
        .bind(class_id)
        .fetch_all(db)
        .await
        .context("Failed to fetch class tests")
        .map_err(AppError::database)
    }

    #[instrument(skip(db))]
    pub async fn test_counts(db: &PgPool, teacher_id: UserId) -> Result<Vec<TestCount>, AppError> {
        sqlx::query_as::<_, TestCount>(
            r#"SELECT c.id AS class_id, c.class_name, s.id AS subject_id, s.subject_name,
                      COUNT(*) AS count
               FROM tests t
               JOIN subjects s ON s.id = t.subject_id
               JOIN classes c ON c.id = t.class_id
               WHERE t.created_by = $1
               GROUP BY c.id, c.class_name, s.id, s.subject_name
               ORDER BY c.class_name, s.subject_name"#,
        )
        .bind(teacher_id)
        .fetch_all(db)
        .await
        .context("Failed to count tests")
        .map_err(AppError::database)
    }

    /// Flips every pending test whose date has passed to `completed`.
    #[instrument(skip(db))]
    pub async fn complete_due_tests(db: &PgPool, now: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"UPDATE tests SET status = 'completed', updated_at = NOW()
               WHERE status = 'pending' AND test_date <= $1"#,
        )
        .bind(now)
        .execute(db)
        .await
        .context("Failed to complete due tests")
        .map_err(AppError::database)?;

        let count = result.rows_affected();
        track_tests_completed(count);
        Ok(count)
    }

    async fn student_by_roll_number(db: &PgPool, roll_number: &str) -> Result<User, AppError> {
        UserService::find_by_role_number(db, roll_number)
            .await?
            .filter(|u| u.role == UserRole::Student)
            .ok_or_else(|| AppError::not_found(anyhow!("Student not found with this roll number")))
    }

    async fn find_or_create_test(
        db: &PgPool,
        teacher_id: UserId,
        title: &str,
        subject_id: SubjectId,
        class_id: ClassId,
        total_marks: f64,
    ) -> Result<Test, AppError> {
        let existing = sqlx::query_as::<_, Test>(
            r#"SELECT * FROM tests
               WHERE title = $1 AND subject_id = $2 AND class_id = $3 AND created_by = $4
               ORDER BY created_at
               LIMIT 1"#,
        )
        .bind(title)
        .bind(subject_id)
        .bind(class_id)
        .bind(teacher_id)
        .fetch_optional(db)
        .await
        .context("Failed to look up test")
        .map_err(AppError::database)?;

        if let Some(test) = existing {
            return Ok(test);
        }

        sqlx::query_as::<_, Test>(
            r#"INSERT INTO tests (title, subject_id, class_id, total_marks, test_date, created_by)
               VALUES ($1, $2, $3, $4, NOW(), $5)
               RETURNING *"#,
        )
        .bind(title)
        .bind(subject_id)
        .bind(class_id)
        .bind(total_marks)
        .bind(teacher_id)
        .fetch_one(db)
        .await
        .context("Failed to create test")
        .map_err(AppError::database)
    }

    /// Records marks for one student, creating the test on first use.
    /// Uploading again for the same student and test replaces the marks.
    #[instrument(skip(db, dto), fields(roll_number = %dto.roll_number))]
    pub async fn upload_mark(
        db: &PgPool,
        teacher_id: UserId,
        dto: &UploadMarksDto,
    ) -> Result<UploadedMark, AppError> {
        let student = Self::student_by_roll_number(db, &dto.roll_number).await?;
        let class_id = student
            .class_id
            .ok_or_else(|| AppError::bad_request(anyhow!("Student class not found")))?;
        let class = ClassService::get_class(db, class_id).await?;
        let subject = ClassService::find_subject_in_class(db, class_id, &dto.subject_name)
            .await
            .map_err(|_| {
                AppError::bad_request(anyhow!(
                    "Subject \"{}\" not found for class {}",
                    dto.subject_name.trim(),
                    class.class_name
                ))
            })?;

        if dto.obtained_marks > dto.total_marks {
            return Err(AppError::bad_request(anyhow!(
                "Obtained marks ({}) cannot exceed total marks ({})",
                dto.obtained_marks,
                dto.total_marks
            )));
        }

        let test = Self::find_or_create_test(
            db,
            teacher_id,
            dto.test_title.trim(),
            subject.id,
            class_id,
            dto.total_marks,
        )
        .await?;

        if dto.obtained_marks > test.total_marks {
            return Err(AppError::bad_request(anyhow!(
                "Obtained marks ({}) cannot exceed total marks ({})",
                dto.obtained_marks,
                test.total_marks
            )));
        }

        sqlx::query(
            r#"INSERT INTO test_results (student_id, test_id, marks)
               VALUES ($1, $2, $3)
               ON CONFLICT (student_id, test_id)
               DO UPDATE SET marks = EXCLUDED.marks, updated_at = NOW()"#,
        )
        .bind(student.id)
        .bind(test.id)
        .bind(dto.obtained_marks)
        .execute(db)
        .await
        .context("Failed to save marks")
        .map_err(AppError::database)?;

        Ok(UploadedMark {
            roll_number: student.role_number.unwrap_or_else(|| normalize_role_number(&dto.roll_number)),
            student_name: student.full_name,
            test_id: test.id,
            test_title: test.title,
            subject_name: subject.subject_name,
            obtained_marks: dto.obtained_marks,
            total_marks: test.total_marks,
            percentage: marks_percentage(dto.obtained_marks, test.total_marks),
        })
    }

    /// Uploads each entry on its own; one failing entry does not stop the rest.
    #[instrument(skip(db, entries), fields(count = entries.len()))]
    pub async fn upload_many(
        db: &PgPool,
        teacher_id: UserId,
        entries: &[UploadMarksDto],
    ) -> Result<BulkMarksResponse, AppError> {
        let mut results = Vec::with_capacity(entries.len());
        for entry in entries {
            let outcome = match Self::upload_mark(db, teacher_id, entry).await {
                Ok(mark) => BulkMarkOutcome {
                    roll_number: entry.roll_number.clone(),
                    success: true,
                    result: Some(mark),
                    error: None,
                },
                Err(e) if e.status.is_server_error() => return Err(e),
                Err(e) => {
                    warn!(roll_number = %entry.roll_number, error = %e.public_message(), "Skipping marks entry");
                    BulkMarkOutcome {
                        roll_number: entry.roll_number.clone(),
                        success: false,
                        result: None,
                        error: Some(e.public_message()),
                    }
                }
            };
            results.push(outcome);
        }

        let succeeded = results.iter().filter(|r| r.success).count();
        let failed = results.len() - succeeded;
        Ok(BulkMarksResponse {
            message: format!("Uploaded marks for {succeeded} of {} students", results.len()),
            succeeded,
            failed,
            results,
        })
    }

    async fn fetch_marks<'q>(
        db: &PgPool,
        query: sqlx::query::QueryAs<'q, sqlx::Postgres, MarkRow, sqlx::postgres::PgArguments>,
    ) -> Result<Vec<MarkView>, AppError> {
        let rows = query
            .fetch_all(db)
            .await
            .context("Failed to fetch marks")
            .map_err(AppError::database)?;
        Ok(rows.into_iter().map(MarkView::from).collect())
    }

    fn marks_sql(filter: &str) -> String {
        format!("{MARK_SELECT} WHERE {filter} ORDER BY t.test_date DESC, u.full_name")
    }

    /// Every result of one student, looked up by roll number.
    #[instrument(skip(db))]
    pub async fn student_marks(db: &PgPool, roll_number: &str) -> Result<Vec<MarkView>, AppError> {
        let student = Self::student_by_roll_number(db, roll_number).await?;
        let sql = Self::marks_sql("r.student_id = $1");
        Self::fetch_marks(db, sqlx::query_as(&sql).bind(student.id)).await
    }

    /// Results of one student in the subject with this name.
    #[instrument(skip(db))]
    pub async fn student_marks_by_subject(
        db: &PgPool,
        student_id: UserId,
        subject_name: &str,
    ) -> Result<Vec<MarkView>, AppError> {
        let sql = Self::marks_sql("r.student_id = $1 AND LOWER(s.subject_name) = LOWER($2)");
        Self::fetch_marks(
            db,
            sqlx::query_as(&sql).bind(student_id).bind(subject_name.trim()),
        )
        .await
    }

    /// Results of every test in one class and subject.
    #[instrument(skip(db))]
    pub async fn class_marks(
        db: &PgPool,
        class_name: &str,
        subject_name: &str,
    ) -> Result<Vec<MarkView>, AppError> {
        let class_name = class_name.replace('"', "");
        let class = ClassService::get_class_by_name(db, &class_name).await?;
        let subject = ClassService::find_subject_in_class(db, class.id, subject_name).await?;
        let sql = Self::marks_sql("t.subject_id = $1");
        Self::fetch_marks(db, sqlx::query_as(&sql).bind(subject.id)).await
    }

    /// Results of the tests a teacher created.
    #[instrument(skip(db))]
    pub async fn uploaded_by(db: &PgPool, teacher_id: UserId) -> Result<Vec<MarkView>, AppError> {
        let sql = Self::marks_sql("t.created_by = $1");
        Self::fetch_marks(db, sqlx::query_as(&sql).bind(teacher_id)).await
    }

    /// Average, highest and lowest percentage per subject.
    #[instrument(skip(db))]
    pub async fn results_summary(db: &PgPool) -> Result<Vec<SubjectResultsSummary>, AppError> {
        sqlx::query_as::<_, SubjectResultsSummary>(
            r#"SELECT s.id AS subject_id, s.subject_name, c.class_name,
                      COUNT(r.id) AS result_count,
                      ROUND(AVG(r.marks * 100.0 / t.total_marks)::NUMERIC, 2)::FLOAT8 AS average_percentage,
                      ROUND(MAX(r.marks * 100.0 / t.total_marks)::NUMERIC, 2)::FLOAT8 AS highest_percentage,
                      ROUND(MIN(r.marks * 100.0 / t.total_marks)::NUMERIC, 2)::FLOAT8 AS lowest_percentage
               FROM subjects s
               JOIN classes c ON c.id = s.class_id
               JOIN tests t ON t.subject_id = s.id
               JOIN test_results r ON r.test_id = t.id
               GROUP BY s.id, s.subject_name, c.class_name
               ORDER BY c.class_name, s.subject_name"#,
        )
        .fetch_all(db)
        .await
        .context("Failed to summarise results")
        .map_err(AppError::database)
    }
}
