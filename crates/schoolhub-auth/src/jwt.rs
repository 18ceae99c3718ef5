//! HS256 access tokens.

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use schoolhub_config::JwtConfig;
use schoolhub_core::AppError;

use crate::claims::Claims;
use crate::roles::UserRole;

pub fn create_access_token(
    user_id: Uuid,
    email: &str,
    role: UserRole,
    role_number: Option<&str>,
    jwt_config: &JwtConfig,
) -> Result<String, AppError> {
    let now = Utc::now().timestamp() as usize;
    let exp = now + jwt_config.access_token_expiry.max(1) as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        role,
        email: email.to_string(),
        role_number: role_number.map(str::to_string),
        exp,
        iat: now,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_config.secret.as_bytes()),
    )
    .map_err(|e| AppError::internal_error(format!("Failed to create token: {}", e)))
}

/// Checks signature and expiry.
pub fn verify_token(token: &str, jwt_config: &JwtConfig) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_config.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::unauthorized("Invalid or expired token"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret-key-at-least-32-characters-long".to_string(),
            access_token_expiry: 3600,
        }
    }

    #[test]
    fn test_round_trip_student_token() {
        let config = test_config();
        let user_id = Uuid::new_v4();

        let token =
            create_access_token(user_id, "kid@school.test", UserRole::Student, Some("NO001"), &config)
                .unwrap();
        let claims = verify_token(&token, &config).unwrap();

        assert_eq!(claims.user_id(), Some(user_id));
        assert_eq!(claims.role, UserRole::Student);
        assert_eq!(claims.role_number.as_deref(), Some("NO001"));
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_verify_garbage() {
        assert!(verify_token("invalid-token", &test_config()).is_err());
    }

    #[test]
    fn test_verify_wrong_secret() {
        let token = create_access_token(
            Uuid::new_v4(),
            "t@school.test",
            UserRole::Teacher,
            None,
            &test_config(),
        )
        .unwrap();

        let other = JwtConfig {
            secret: "different-secret-key-at-least-32-characters".to_string(),
            access_token_expiry: 3600,
        };
        let err = verify_token(&token, &other).unwrap_err();
        assert_eq!(err.status.as_u16(), 401);
    }
}
