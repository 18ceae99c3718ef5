//! Role-based authorization layers.
//!
//! Routers apply these with `route_layer(middleware::from_fn_with_state(state, require_x))`
//! so every route of a role-scoped router rejects other roles with 403 before
//! the handler runs.

use axum::{
    extract::{FromRequestParts, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use schoolhub_auth::UserRole;
use schoolhub_core::AppError;

use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Runs `next` only for tokens whose role is in `allowed_roles`.
pub async fn require_roles(
    State(state): State<AppState>,
    req: Request,
    next: Next,
    allowed_roles: &[UserRole],
) -> Result<Response, AppError> {
    let (mut parts, body) = req.into_parts();

    let auth_user = AuthUser::from_request_parts(&mut parts, &state).await?;
    check_any_role(&auth_user, allowed_roles)?;

    Ok(next.run(Request::from_parts(parts, body)).await)
}

pub async fn require_admin(State(state): State<AppState>, req: Request, next: Next) -> Response {
    require_roles(State(state), req, next, &[UserRole::Admin])
        .await
        .unwrap_or_else(IntoResponse::into_response)
}

pub async fn require_teacher(State(state): State<AppState>, req: Request, next: Next) -> Response {
    require_roles(State(state), req, next, &[UserRole::Teacher])
        .await
        .unwrap_or_else(IntoResponse::into_response)
}

pub async fn require_student(State(state): State<AppState>, req: Request, next: Next) -> Response {
    require_roles(State(state), req, next, &[UserRole::Student])
        .await
        .unwrap_or_else(IntoResponse::into_response)
}

pub async fn require_parent(State(state): State<AppState>, req: Request, next: Next) -> Response {
    require_roles(State(state), req, next, &[UserRole::Parent])
        .await
        .unwrap_or_else(IntoResponse::into_response)
}

pub fn check_any_role(auth_user: &AuthUser, allowed_roles: &[UserRole]) -> Result<(), AppError> {
    let role = auth_user.role();
    if allowed_roles.contains(&role) {
        return Ok(());
    }

    let allowed = allowed_roles
        .iter()
        .map(UserRole::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    Err(AppError::forbidden(format!(
        "Access denied. Required role: {allowed}, but user has role: {role}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use schoolhub_auth::Claims;

    fn user(role: UserRole) -> AuthUser {
        AuthUser(Claims {
            sub: uuid::Uuid::new_v4().to_string(),
            role,
            email: "x@school.test".to_string(),
            role_number: None,
            exp: 9_999_999_999,
            iat: 0,
        })
    }

    #[test]
    fn test_check_any_role() {
        assert!(check_any_role(&user(UserRole::Admin), &[UserRole::Admin]).is_ok());
        assert!(
            check_any_role(&user(UserRole::Parent), &[UserRole::Teacher, UserRole::Parent]).is_ok()
        );
    }

    #[test]
    fn test_check_any_role_forbidden_message() {
        let err = check_any_role(&user(UserRole::Student), &[UserRole::Admin]).unwrap_err();
        assert_eq!(err.status.as_u16(), 403);
        assert_eq!(
            err.public_message(),
            "Access denied. Required role: admin, but user has role: student"
        );
    }
}
