//! Account rows and their public projections.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use schoolhub_auth::UserRole;

use crate::ids::{ClassId, SubjectId, UserId};
use crate::status::{ApprovalStatus, RegistrationSource};
use crate::value_types::validate_relationship;

/// A row of the `users` table.
///
/// Carries credentials and one-time codes, so it is never serialised
/// directly; responses go through [`UserProfile`].
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: UserId,
    pub role: UserRole,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password_hash: Option<String>,
    pub is_email_verified: bool,

    pub otp_code: Option<String>,
    pub otp_expires_at: Option<DateTime<Utc>>,
    pub reset_otp_code: Option<String>,
    pub reset_otp_expires_at: Option<DateTime<Utc>>,
    pub reset_otp_verified: bool,
    pub reset_password_attempts: i32,

    pub class_id: Option<ClassId>,
    pub role_number: Option<String>,
    pub academic_region: Option<String>,
    pub student_status: Option<ApprovalStatus>,
    pub registration_source: Option<RegistrationSource>,
    pub dob: Option<NaiveDate>,
    pub academic_year: Option<String>,
    pub how_did_you_find_us: Option<String>,
    pub address_country: Option<String>,
    pub address_state: Option<String>,
    pub address_city: Option<String>,
    pub address_pincode: Option<String>,
    pub address_full: Option<String>,
    pub parent_name: Option<String>,
    pub parent_relationship: Option<String>,
    pub parent_email: Option<String>,
    pub parent_phone: Option<String>,
    pub profile_picture: Option<String>,
    pub government_proof: Option<String>,

    pub gender: Option<String>,
    pub country_region: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub subject_specialization: Vec<String>,
    pub qualification: Option<String>,
    pub id_proof_url: Option<String>,
    pub teacher_status: Option<ApprovalStatus>,

    pub rejection_reason: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_by: Option<UserId>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn parent_details(&self) -> Option<ParentDetails> {
        if self.parent_name.is_none() && self.parent_email.is_none() {
            return None;
        }
        Some(ParentDetails {
            name: self.parent_name.clone(),
            relationship: self.parent_relationship.clone(),
            email: self.parent_email.clone(),
            phone: self.parent_phone.clone(),
        })
    }

    pub fn address(&self) -> Option<Address> {
        let address = Address {
            country: self.address_country.clone(),
            state: self.address_state.clone(),
            city: self.address_city.clone(),
            pincode: self.address_pincode.clone(),
            full_address: self.address_full.clone(),
        };
        (!address.is_empty()).then_some(address)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ParentDetails {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(custom(function = "validate_relationship"))]
    pub relationship: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub country: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub pincode: Option<String>,
    pub full_address: Option<String>,
}

impl Address {
    pub fn is_empty(&self) -> bool {
        self.country.is_none()
            && self.state.is_none()
            && self.city.is_none()
            && self.pincode.is_none()
            && self.full_address.is_none()
    }
}

/// Public view of an account. Role-specific fields are omitted when unset.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub role: UserRole,
    pub full_name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub is_email_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_id: Option<ClassId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub academic_region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_status: Option<ApprovalStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_source: Option<RegistrationSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dob: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub academic_year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_details: Option<ParentDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub government_proof: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subject_specialization: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qualification: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_proof_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teacher_status: Option<ApprovalStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            role: user.role,
            full_name: user.full_name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            is_email_verified: user.is_email_verified,
            class_id: user.class_id,
            role_number: user.role_number.clone(),
            academic_region: user.academic_region.clone(),
            student_status: user.student_status,
            registration_source: user.registration_source,
            dob: user.dob,
            academic_year: user.academic_year.clone(),
            address: user.address(),
            parent_details: user.parent_details(),
            profile_picture: user.profile_picture.clone(),
            government_proof: user.government_proof.clone(),
            gender: user.gender.clone(),
            country_region: user.country_region.clone(),
            state: user.state.clone(),
            city: user.city.clone(),
            subject_specialization: user.subject_specialization.clone(),
            qualification: user.qualification.clone(),
            id_proof_url: user.id_proof_url.clone(),
            teacher_status: user.teacher_status,
            rejection_reason: user.rejection_reason.clone(),
            approved_at: user.approved_at,
            created_at: user.created_at,
        }
    }
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self::from(&user)
    }
}

/// A student row joined with its class name, used by admin listings.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummary {
    pub id: UserId,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role_number: Option<String>,
    pub academic_region: Option<String>,
    pub class_id: Option<ClassId>,
    pub class_name: Option<String>,
    pub student_status: Option<ApprovalStatus>,
    pub registration_source: Option<RegistrationSource>,
    pub is_email_verified: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeacherSummary {
    pub id: UserId,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub qualification: Option<String>,
    pub subject_specialization: Vec<String>,
    pub teacher_status: Option<ApprovalStatus>,
    pub rejection_reason: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A parent's link to one student, resolved to the student's details.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LinkedStudentInfo {
    pub student_id: String,
    pub relationship: String,
    pub student_name: Option<String>,
    pub class_id: Option<ClassId>,
    pub class_name: Option<String>,
    pub region: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParentWithStudents {
    #[serde(flatten)]
    pub parent: UserProfile,
    pub linked_students: Vec<LinkedStudentInfo>,
}

/// Number of accounts per role.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserCounts {
    pub admins: i64,
    pub teachers: i64,
    pub students: i64,
    pub parents: i64,
    pub pending_students: i64,
    pub pending_teachers: i64,
}

/// Result of admitting a student.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentApprovalResponse {
    pub message: String,
    pub student: UserProfile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_email: Option<String>,
    pub parent_account_created: bool,
}

#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct CountResponse {
    pub count: i64,
}

/// An empty or blank reason is refused by the moderation layer with 400.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RejectDto {
    #[serde(default)]
    #[validate(length(max = 1000, message = "Rejection reason is too long"))]
    pub reason: String,
}

/// Subject names a teacher specialises in. Every name must match an
/// existing subject.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSpecializationDto {
    #[validate(length(min = 1, message = "At least one subject is required"))]
    pub subject_specialization: Vec<String>,
}

/// A student as listed to a teacher.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RosterStudent {
    pub id: UserId,
    pub full_name: String,
    pub email: String,
    pub role_number: Option<String>,
}

/// Students of one class, for marking a subject.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClassRoster {
    pub class_name: String,
    pub subject_name: String,
    pub subject_id: SubjectId,
    pub students: Vec<RosterStudent>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user(role: UserRole) -> User {
        let now = Utc::now();
        User {
            id: UserId::new(),
            role,
            full_name: "Asha Rao".to_string(),
            email: "asha@school.test".to_string(),
            phone: Some("+919876543210".to_string()),
            password_hash: Some("$2b$12$hash".to_string()),
            is_email_verified: true,
            otp_code: Some("123456".to_string()),
            otp_expires_at: Some(now),
            reset_otp_code: None,
            reset_otp_expires_at: None,
            reset_otp_verified: false,
            reset_password_attempts: 0,
            class_id: None,
            role_number: None,
            academic_region: None,
            student_status: None,
            registration_source: None,
            dob: None,
            academic_year: None,
            how_did_you_find_us: None,
            address_country: None,
            address_state: None,
            address_city: None,
            address_pincode: None,
            address_full: None,
            parent_name: None,
            parent_relationship: None,
            parent_email: None,
            parent_phone: None,
            profile_picture: None,
            government_proof: None,
            gender: None,
            country_region: None,
            state: None,
            city: None,
            subject_specialization: Vec::new(),
            qualification: None,
            id_proof_url: None,
            teacher_status: None,
            rejection_reason: None,
            approved_at: None,
            approved_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_profile_hides_credentials() {
        let user = sample_user(UserRole::Student);
        let json = serde_json::to_value(UserProfile::from(&user)).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("otpCode").is_none());
        assert_eq!(json["fullName"], "Asha Rao");
        assert_eq!(json["role"], "student");
    }

    #[test]
    fn test_profile_omits_unset_role_fields() {
        let user = sample_user(UserRole::Teacher);
        let json = serde_json::to_value(UserProfile::from(&user)).unwrap();
        assert!(json.get("roleNumber").is_none());
        assert!(json.get("subjectSpecialization").is_none());
        assert!(json.get("address").is_none());
    }

    #[test]
    fn test_parent_details_present_when_named() {
        let mut user = sample_user(UserRole::Student);
        assert!(user.parent_details().is_none());
        user.parent_name = Some("Ravi Rao".to_string());
        user.parent_email = Some("ravi@home.test".to_string());
        let details = user.parent_details().unwrap();
        assert_eq!(details.email.as_deref(), Some("ravi@home.test"));
    }

    #[test]
    fn test_reject_dto_reason_bounds() {
        let dto: RejectDto = serde_json::from_str("{}").unwrap();
        assert!(dto.reason.is_empty());
        let dto = RejectDto {
            reason: "x".repeat(1001),
        };
        assert!(dto.validate().is_err());
        let dto = RejectDto {
            reason: "Incomplete documents".to_string(),
        };
        assert!(dto.validate().is_ok());
    }
}
