use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use schoolhub_core::errors::ErrorBody;
use schoolhub_models::auth::{EmailMessageResponse, MessageResponse};
use schoolhub_models::users::{Address, LinkedStudentInfo, ParentDetails};
use schoolhub_models::{ApprovalStatus, RegistrationSource, UserProfile, UserRole};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::auth::controller::register_student,
        crate::modules::auth::controller::student_request,
        crate::modules::auth::controller::verify_otp,
        crate::modules::auth::controller::student_login,
        crate::modules::auth::controller::teacher_signup,
        crate::modules::auth::controller::teacher_login,
        crate::modules::auth::controller::parent_register,
        crate::modules::auth::controller::parent_login,
        crate::modules::auth::controller::admin_register,
        crate::modules::auth::controller::admin_login,
        crate::modules::auth::controller::forgot_password,
        crate::modules::auth::controller::resend_reset_otp,
        crate::modules::auth::controller::verify_reset_otp,
        crate::modules::auth::controller::reset_password,
        crate::modules::auth::controller::me,
        crate::modules::approvals::controller::pending_teachers,
        crate::modules::approvals::controller::list_teachers,
        crate::modules::approvals::controller::get_teacher,
        crate::modules::approvals::controller::approve_teacher,
        crate::modules::approvals::controller::reject_teacher,
        crate::modules::approvals::controller::pending_students,
        crate::modules::approvals::controller::list_students,
        crate::modules::approvals::controller::count_students,
        crate::modules::approvals::controller::approve_student,
        crate::modules::approvals::controller::reject_student,
        crate::modules::approvals::controller::list_parents,
        crate::modules::approvals::controller::parents_with_students,
        crate::modules::moderation::controller::list_pending,
        crate::modules::moderation::controller::approve,
        crate::modules::moderation::controller::reject,
        crate::modules::users::controller::get_user_counts,
        crate::modules::users::controller::delete_user,
        crate::modules::classes::controller::list_classes,
        crate::modules::classes::controller::get_class,
        crate::modules::classes::controller::create_class,
        crate::modules::classes::controller::create_subject,
        crate::modules::attendance::controller::class_summary,
        crate::modules::attendance::controller::run_batch,
        crate::modules::assessments::controller::create_test,
        crate::modules::assessments::controller::my_tests,
        crate::modules::assessments::controller::test_counts,
        crate::modules::assessments::controller::upload_marks,
        crate::modules::assessments::controller::upload_many_marks,
        crate::modules::assessments::controller::student_marks,
        crate::modules::assessments::controller::class_marks,
        crate::modules::assessments::controller::my_uploaded_marks,
        crate::modules::assessments::controller::results_summary,
        crate::modules::assignments::controller::create_assignment,
        crate::modules::assignments::controller::my_assignments,
        crate::modules::assignments::controller::teacher_download,
        crate::modules::assignments::controller::submissions,
        crate::modules::assignments::controller::grade_submission,
        crate::modules::assignments::controller::download_submission,
        crate::modules::assignments::controller::class_assignments,
        crate::modules::assignments::controller::pending_assignments,
        crate::modules::assignments::controller::submitted_assignments,
        crate::modules::assignments::controller::student_download,
        crate::modules::assignments::controller::submit_assignment,
        crate::modules::notes::controller::upload_note,
        crate::modules::notes::controller::my_notes,
        crate::modules::notes::controller::note_counts,
        crate::modules::notes::controller::approved_notes,
        crate::modules::notes::controller::download_note,
        crate::modules::notes::controller::student_notes,
        crate::modules::notes::controller::student_subject_notes,
        crate::modules::scheduled_subjects::controller::request_subject,
        crate::modules::scheduled_subjects::controller::my_subjects,
        crate::modules::scheduled_subjects::controller::list_scheduled_subjects,
        crate::modules::scheduled_subjects::controller::teacher_subjects,
        crate::modules::announcements::controller::create_announcement,
        crate::modules::announcements::controller::list_announcements,
        crate::modules::announcements::controller::delete_announcement,
        crate::modules::announcements::controller::my_feed,
        crate::modules::announcements::controller::create_teacher_announcement,
        crate::modules::announcements::controller::my_teacher_announcements,
        crate::modules::announcements::controller::update_teacher_announcement,
        crate::modules::announcements::controller::delete_teacher_announcement,
        crate::modules::announcements::controller::student_feed,
        crate::modules::announcements::controller::parent_feed,
        crate::modules::students::controller::profile,
        crate::modules::students::controller::my_class,
        crate::modules::students::controller::my_subjects,
        crate::modules::students::controller::my_tests,
        crate::modules::students::controller::my_attendance,
        crate::modules::students::controller::my_attendance_summary,
        crate::modules::students::controller::my_marks,
        crate::modules::students::controller::my_deadlines,
        crate::modules::parents::controller::profile,
        crate::modules::parents::controller::children,
        crate::modules::parents::controller::child_profile,
        crate::modules::parents::controller::child_class,
        crate::modules::parents::controller::child_subjects,
        crate::modules::parents::controller::child_attendance,
        crate::modules::parents::controller::child_attendance_summary,
        crate::modules::parents::controller::child_tests,
        crate::modules::parents::controller::child_marks,
        crate::modules::parents::controller::child_notes,
        crate::modules::parents::controller::child_pending_assignments,
        crate::modules::parents::controller::child_submitted_assignments,
        crate::modules::parents::controller::child_deadlines,
        crate::modules::teachers::controller::profile,
        crate::modules::teachers::controller::update_subjects,
        crate::modules::teachers::controller::class_students,
    ),
    components(
        schemas(
            ErrorBody,
            MessageResponse,
            EmailMessageResponse,
            UserProfile,
            UserRole,
            ApprovalStatus,
            RegistrationSource,
            ParentDetails,
            Address,
            LinkedStudentInfo,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registration, login, OTP and password reset"),
        (name = "Admin", description = "Approvals, moderation, users and school-wide reports"),
        (name = "Review", description = "Generic approve/reject for notes, scheduled subjects and announcements"),
        (name = "Classes", description = "Classes and their subjects"),
        (name = "Teacher", description = "Notes, assignments, tests, marks and announcements"),
        (name = "Student", description = "A student's own class, work and results"),
        (name = "Parent", description = "Read-only views of linked students"),
        (name = "Notes", description = "Approved notes and downloads"),
        (name = "Announcements", description = "Announcement feeds")
    ),
    info(
        title = "SchoolHub API",
        version = "0.1.0",
        description = "School management REST API: admissions, approvals, attendance, assessments and announcements.",
        license(
            name = "MIT"
        )
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_role_scoped_paths() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/auth/student/login",
            "/api/admin/review/{entity}/{id}/approve",
            "/api/student/assignments/{id}/submit",
            "/api/parent/child/{role_number}/attendance",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn test_bearer_scheme_registered() {
        let doc = ApiDoc::openapi();
        let components = doc.components.unwrap();
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
