use anyhow::Context;
use chrono::NaiveDate;
use sqlx::{PgConnection, PgPool};
use tracing::{info, instrument};

use schoolhub_core::AppError;
use schoolhub_models::attendance::{
    AttendanceBatchReport, AttendanceQuery, AttendanceRecord, ClassAttendanceRow,
    ClassAttendanceSummary, SubjectAttendanceCounts, SubjectAttendanceSummary,
};
use schoolhub_models::{ClassId, SubjectId, UserId};

use crate::audit_event;
use crate::metrics::track_attendance_rows;

pub struct AttendanceService;

impl AttendanceService {
    /// Creates an `absent` row for every student and every subject of the
    /// student's class that has no row for `date` yet.
    ///
    /// Existing rows are left untouched through the unique
    /// `(student_id, subject_id, date)` index, so running the batch twice on
    /// the same day creates nothing the second time.
    #[instrument(skip(db))]
    pub async fn run_batch(db: &PgPool, date: NaiveDate) -> Result<AttendanceBatchReport, AppError> {
        let (students, attempted, created): (i64, i64, i64) = sqlx::query_as(
            r#"WITH candidates AS (
                   SELECT u.id AS student_id, s.id AS subject_id, u.class_id
                   FROM users u
                   JOIN subjects s ON s.class_id = u.class_id
                   WHERE u.role = 'student'
               ),
               inserted AS (
                   INSERT INTO attendance (student_id, subject_id, class_id, date, status)
                   SELECT student_id, subject_id, class_id, $1, 'absent'
                   FROM candidates
                   ON CONFLICT (student_id, subject_id, date) DO NOTHING
                   RETURNING 1
               )
               SELECT
                   (SELECT COUNT(DISTINCT student_id) FROM candidates),
                   (SELECT COUNT(*) FROM candidates),
                   (SELECT COUNT(*) FROM inserted)"#,
        )
        .bind(date)
        .fetch_one(db)
        .await
        .context("Failed to run attendance batch")
        .map_err(AppError::database)?;

        let report = AttendanceBatchReport {
            date: Some(date),
            students_processed: students.max(0) as u64,
            records_attempted: attempted.max(0) as u64,
            records_created: created.max(0) as u64,
        };

        audit_event!(
            "attendance.batch",
            "attendance",
            date = %date,
            students_processed = report.students_processed,
            records_attempted = report.records_attempted,
            records_created = report.records_created
        );
        track_attendance_rows(report.records_created);
        info!(
            date = %date,
            created = report.records_created,
            skipped = report.records_attempted - report.records_created,
            "Attendance batch finished"
        );

        Ok(report)
    }

    /// Marks the student present for `subject_id` on `date`, creating the row
    /// when the batch has not run yet.
    #[instrument(skip(conn))]
    pub async fn mark_present(
        conn: &mut PgConnection,
        student_id: UserId,
        subject_id: SubjectId,
        class_id: ClassId,
        date: NaiveDate,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"INSERT INTO attendance (student_id, subject_id, class_id, date, status, marked_by)
               VALUES ($1, $2, $3, $4, 'present', $1)
               ON CONFLICT (student_id, subject_id, date)
               DO UPDATE SET status = 'present', marked_by = EXCLUDED.marked_by, updated_at = NOW()"#,
        )
        .bind(student_id)
        .bind(subject_id)
        .bind(class_id)
        .bind(date)
        .execute(conn)
        .await
        .context("Failed to mark attendance")
        .map_err(AppError::database)?;
        Ok(())
    }

    #[instrument(skip(db))]
    pub async fn list_for_student(
        db: &PgPool,
        student_id: UserId,
        query: &AttendanceQuery,
    ) -> Result<Vec<AttendanceRecord>, AppError> {
        sqlx::query_as::<_, AttendanceRecord>(
            r#"SELECT a.id, a.date, a.status, s.id AS subject_id, s.subject_name, s.subject_code
               FROM attendance a
               JOIN subjects s ON s.id = a.subject_id
               WHERE a.student_id = $1
                 AND ($2::TEXT IS NULL OR s.subject_code = UPPER($2))
                 AND ($3::DATE IS NULL OR a.date >= $3)
                 AND ($4::DATE IS NULL OR a.date <= $4)
               ORDER BY a.date DESC, s.subject_name"#,
        )
        .bind(student_id)
        .bind(query.subject_code.as_deref().map(str::trim))
        .bind(query.start_date)
        .bind(query.end_date)
        .fetch_all(db)
        .await
        .context("Failed to fetch attendance")
        .map_err(AppError::database)
    }

    #[instrument(skip(db))]
    pub async fn summary_for_student(
        db: &PgPool,
        student_id: UserId,
    ) -> Result<Vec<SubjectAttendanceSummary>, AppError> {
        let rows = sqlx::query_as::<_, SubjectAttendanceCounts>(
            r#"SELECT s.id AS subject_id, s.subject_name, s.subject_code,
                      COUNT(*) AS total,
                      COUNT(*) FILTER (WHERE a.status = 'present') AS present,
                      COUNT(*) FILTER (WHERE a.status = 'absent') AS absent,
                      COUNT(*) FILTER (WHERE a.status = 'late') AS late
               FROM attendance a
               JOIN subjects s ON s.id = a.subject_id
               WHERE a.student_id = $1
               GROUP BY s.id, s.subject_name, s.subject_code
               ORDER BY s.subject_name"#,
        )
        .bind(student_id)
        .fetch_all(db)
        .await
        .context("Failed to summarise attendance")
        .map_err(AppError::database)?;

        Ok(rows.into_iter().map(SubjectAttendanceSummary::from).collect())
    }

    /// Per class and subject totals for the admin overview, optionally
    /// limited to one class or one day.
    #[instrument(skip(db))]
    pub async fn class_summary(
        db: &PgPool,
        class_id: Option<ClassId>,
        date: Option<NaiveDate>,
    ) -> Result<Vec<ClassAttendanceSummary>, AppError> {
        let rows = sqlx::query_as::<_, ClassAttendanceRow>(
            r#"SELECT c.id AS class_id, c.class_name, s.id AS subject_id, s.subject_name,
                      COUNT(*) AS total,
                      COUNT(*) FILTER (WHERE a.status = 'present') AS present,
                      COUNT(*) FILTER (WHERE a.status = 'absent') AS absent,
                      COUNT(*) FILTER (WHERE a.status = 'late') AS late
               FROM attendance a
               JOIN subjects s ON s.id = a.subject_id
               JOIN classes c ON c.id = s.class_id
               WHERE ($1::UUID IS NULL OR c.id = $1)
                 AND ($2::DATE IS NULL OR a.date = $2)
               GROUP BY c.id, c.class_name, s.id, s.subject_name
               ORDER BY c.class_name, s.subject_name"#,
        )
        .bind(class_id)
        .bind(date)
        .fetch_all(db)
        .await
        .context("Failed to summarise class attendance")
        .map_err(AppError::database)?;

        Ok(rows.into_iter().map(ClassAttendanceSummary::from).collect())
    }
}
