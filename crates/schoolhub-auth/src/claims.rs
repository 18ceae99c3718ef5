//! JWT payload for access tokens.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::roles::UserRole;

/// Claims embedded in every access token.
///
/// Students also carry their role number so that student-facing handlers
/// can resolve the caller without another lookup.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub role: UserRole,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_number: Option<String>,
    pub exp: usize,
    pub iat: usize,
}

impl Claims {
    /// Parses the subject back into a user id.
    pub fn user_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }

    pub fn is(&self, role: UserRole) -> bool {
        self.role == role
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_deserialize_without_role_number() {
        let id = Uuid::new_v4();
        let json = format!(
            r#"{{"sub":"{id}","role":"teacher","email":"t@school.test","exp":9999999999,"iat":9999999900}}"#
        );
        let claims: Claims = serde_json::from_str(&json).unwrap();
        assert_eq!(claims.role, UserRole::Teacher);
        assert_eq!(claims.user_id(), Some(id));
        assert!(claims.role_number.is_none());
    }

    #[test]
    fn test_claims_skip_empty_role_number() {
        let claims = Claims {
            sub: "not-a-uuid".to_string(),
            role: UserRole::Admin,
            email: "a@school.test".to_string(),
            role_number: None,
            exp: 1,
            iat: 0,
        };
        let serialized = serde_json::to_string(&claims).unwrap();
        assert!(!serialized.contains("role_number"));
        assert!(claims.user_id().is_none());
        assert!(claims.is(UserRole::Admin));
    }
}
