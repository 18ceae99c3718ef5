use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{
    admin_login, admin_register, forgot_password, me, parent_login, parent_register,
    register_student, resend_reset_otp, reset_password, student_login, student_request,
    teacher_login, teacher_signup, verify_otp, verify_reset_otp,
};

pub fn init_auth_router() -> Router<AppState> {
    Router::new()
        .route("/student/register", post(register_student))
        .route("/student/request", post(student_request))
        .route("/verify-otp", post(verify_otp))
        .route("/student/login", post(student_login))
        .route("/teacher/signup", post(teacher_signup))
        .route("/teacher/login", post(teacher_login))
        .route("/parent/register", post(parent_register))
        .route("/parent/login", post(parent_login))
        .route("/admin/register", post(admin_register))
        .route("/admin/login", post(admin_login))
        .route("/forgot-password", post(forgot_password))
        .route("/resend-reset-otp", post(resend_reset_otp))
        .route("/verify-reset-otp", post(verify_reset_otp))
        .route("/reset-password", post(reset_password))
        .route("/me", get(me))
}
