use anyhow::anyhow;
use sqlx::PgPool;
use tracing::instrument;

use schoolhub_auth::UserRole;
use schoolhub_config::SchedulerConfig;
use schoolhub_core::AppError;
use schoolhub_models::academics::{ClassWithSubjects, Subject};
use schoolhub_models::assessments::{MarkView, TestView};
use schoolhub_models::assignments::UpcomingDeadlines;
use schoolhub_models::attendance::{AttendanceQuery, AttendanceRecord, SubjectAttendanceSummary};
use schoolhub_models::{User, UserId};

use crate::modules::assessments::AssessmentService;
use crate::modules::assignments::AssignmentService;
use crate::modules::assignments::service::class_of;
use crate::modules::attendance::AttendanceService;
use crate::modules::classes::ClassService;
use crate::modules::users::UserService;
use crate::scheduler::school_today;

/// Read views over one student. The student's own routes and the parent
/// child routes both go through here.
pub struct StudentService;

impl StudentService {
    /// Loads the account behind a student token.
    pub async fn load(db: &PgPool, id: UserId) -> Result<User, AppError> {
        UserService::find_by_id(db, id)
            .await?
            .filter(|user| user.role == UserRole::Student)
            .ok_or_else(|| AppError::not_found(anyhow!("Student not found")))
    }

    #[instrument(skip(db, student), fields(student.id = %student.id))]
    pub async fn class(db: &PgPool, student: &User) -> Result<ClassWithSubjects, AppError> {
        ClassService::get_class_with_subjects(db, class_of(student)?).await
    }

    #[instrument(skip(db, student), fields(student.id = %student.id))]
    pub async fn subjects(db: &PgPool, student: &User) -> Result<Vec<Subject>, AppError> {
        ClassService::subjects_of_class(db, class_of(student)?).await
    }

    #[instrument(skip(db, student), fields(student.id = %student.id))]
    pub async fn tests(db: &PgPool, student: &User) -> Result<Vec<TestView>, AppError> {
        AssessmentService::class_tests(db, class_of(student)?).await
    }

    pub async fn attendance(
        db: &PgPool,
        student: &User,
        query: &AttendanceQuery,
    ) -> Result<Vec<AttendanceRecord>, AppError> {
        if let (Some(start), Some(end)) = (query.start_date, query.end_date) {
            if start > end {
                return Err(AppError::bad_request(anyhow!(
                    "startDate must not be after endDate"
                )));
            }
        }
        AttendanceService::list_for_student(db, student.id, query).await
    }

    pub async fn attendance_summary(
        db: &PgPool,
        student: &User,
    ) -> Result<Vec<SubjectAttendanceSummary>, AppError> {
        AttendanceService::summary_for_student(db, student.id).await
    }

    /// Results in one subject; 404 when the subject is not taught in the
    /// student's class.
    #[instrument(skip(db, student), fields(student.id = %student.id))]
    pub async fn marks(
        db: &PgPool,
        student: &User,
        subject_name: &str,
    ) -> Result<Vec<MarkView>, AppError> {
        let subject = ClassService::find_subject_in_class(db, class_of(student)?, subject_name).await?;
        AssessmentService::student_marks_by_subject(db, student.id, &subject.subject_name).await
    }

    pub async fn deadlines(
        db: &PgPool,
        student: &User,
        config: &SchedulerConfig,
    ) -> Result<UpcomingDeadlines, AppError> {
        AssignmentService::upcoming_deadlines(db, class_of(student)?, school_today(config), config)
            .await
    }
}
