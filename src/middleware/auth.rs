use std::collections::HashMap;

use axum::{
    extract::{FromRequestParts, Path},
    http::{header, request::Parts},
};

use schoolhub_auth::{Claims, UserRole, verify_token};
use schoolhub_core::AppError;
use schoolhub_models::{User, UserId, value_types::normalize_role_number};

use crate::modules::parents::service::ParentService;
use crate::security_event;
use crate::state::AppState;

/// Extractor that validates the bearer token and provides its claims.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    pub fn user_id(&self) -> Result<UserId, AppError> {
        self.0
            .user_id()
            .map(UserId::from)
            .ok_or_else(|| AppError::unauthorized("Invalid user ID in token"))
    }

    pub fn role(&self) -> UserRole {
        self.0.role
    }

    pub fn email(&self) -> &str {
        &self.0.email
    }

    pub fn role_number(&self) -> Option<&str> {
        self.0.role_number.as_deref()
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::unauthorized("Invalid authorization header format"))?;

        let claims = verify_token(token.trim(), &state.jwt_config)?;

        Ok(AuthUser(claims))
    }
}

/// Declares an extractor that only lets tokens of one role through.
#[macro_export]
macro_rules! require_role {
    ($name:ident, $role:expr, $label:literal) => {
        #[derive(Debug, Clone)]
        pub struct $name(pub $crate::middleware::auth::AuthUser);

        impl $name {
            pub fn user_id(&self) -> Result<schoolhub_models::UserId, schoolhub_core::AppError> {
                self.0.user_id()
            }
        }

        impl axum::extract::FromRequestParts<$crate::state::AppState> for $name {
            type Rejection = schoolhub_core::AppError;

            async fn from_request_parts(
                parts: &mut axum::http::request::Parts,
                state: &$crate::state::AppState,
            ) -> Result<Self, Self::Rejection> {
                let auth_user =
                    $crate::middleware::auth::AuthUser::from_request_parts(parts, state).await?;

                if auth_user.role() != $role {
                    return Err(schoolhub_core::AppError::forbidden(concat!(
                        "Access denied. ",
                        $label,
                        " only."
                    )));
                }

                Ok($name(auth_user))
            }
        }
    };
}

require_role!(AdminUser, schoolhub_auth::UserRole::Admin, "Admins");
require_role!(TeacherUser, schoolhub_auth::UserRole::Teacher, "Teachers");
require_role!(StudentUser, schoolhub_auth::UserRole::Student, "Students");
require_role!(ParentUser, schoolhub_auth::UserRole::Parent, "Parents");

/// A student the calling parent is linked to, resolved from the
/// `role_number` path segment.
#[derive(Debug, Clone)]
pub struct LinkedChild {
    pub parent_id: UserId,
    pub student: User,
}

impl FromRequestParts<AppState> for LinkedChild {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let ParentUser(parent) = ParentUser::from_request_parts(parts, state).await?;
        let parent_id = parent.user_id()?;

        let Path(params) = Path::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::bad_request(anyhow::anyhow!("Student ID is required")))?;
        let role_number = params
            .get("role_number")
            .map(|r| normalize_role_number(r))
            .ok_or_else(|| AppError::bad_request(anyhow::anyhow!("Student ID is required")))?;

        if !ParentService::is_linked(&state.db, parent_id, &role_number).await? {
            security_event!(
                "parent_child_denied",
                parent.id = %parent_id,
                student.role_number = %role_number,
                "Parent requested a student they are not linked to"
            );
            return Err(AppError::forbidden(
                "You are not linked to this student",
            ));
        }

        let student = ParentService::child_by_role_number(&state.db, &role_number).await?;

        Ok(LinkedChild { parent_id, student })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn claims(role: UserRole, sub: String) -> Claims {
        Claims {
            sub,
            role,
            email: "someone@school.test".to_string(),
            role_number: None,
            exp: 9_999_999_999,
            iat: 1_700_000_000,
        }
    }

    #[test]
    fn test_user_id() {
        let id = Uuid::new_v4();
        let user = AuthUser(claims(UserRole::Teacher, id.to_string()));
        assert_eq!(user.user_id().unwrap(), UserId::from(id));
        assert_eq!(user.role(), UserRole::Teacher);
        assert_eq!(user.email(), "someone@school.test");
    }

    #[test]
    fn test_invalid_subject_is_unauthorized() {
        let user = AuthUser(claims(UserRole::Admin, "garbage".to_string()));
        let err = user.user_id().unwrap_err();
        assert_eq!(err.status.as_u16(), 401);
    }
}
