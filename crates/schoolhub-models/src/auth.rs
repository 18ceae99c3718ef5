//! Registration, login and password reset payloads.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::status::RegistrationSource;
use crate::users::{Address, LinkedStudentInfo, ParentDetails, UserProfile};
use crate::value_types::{validate_gender, validate_phone, validate_relationship};

pub use schoolhub_auth::Claims;

#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StudentRegisterDto {
    #[validate(length(min = 1, max = 255, message = "Full name is required"))]
    pub full_name: String,
    pub dob: NaiveDate,
    #[validate(email(message = "Invalid email"))]
    pub email: String,
    #[validate(custom(function = "validate_phone"))]
    pub phone: String,
    #[validate(length(min = 2, max = 100, message = "Academic region is required"))]
    pub academic_region: String,
    /// Class name, "1" to "10"
    #[serde(alias = "class")]
    #[validate(length(min = 1, max = 10))]
    pub class_name: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub confirm_password: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentRegisterResponse {
    pub message: String,
    pub role_number: String,
    pub email: String,
}

/// Admission request fields, collected from a multipart form.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StudentRequestForm {
    #[validate(length(min = 1, max = 255, message = "fullName is required"))]
    pub full_name: String,
    pub dob: Option<NaiveDate>,
    #[validate(email(message = "Invalid email"))]
    pub email: Option<String>,
    #[validate(custom(function = "validate_phone"))]
    pub phone: Option<String>,
    #[validate(length(min = 2, max = 100))]
    pub academic_region: Option<String>,
    #[validate(length(min = 1, max = 10, message = "class is required"))]
    pub class_name: String,
    #[validate(nested)]
    pub parent_details: Option<ParentDetails>,
    pub address: Option<Address>,
    #[validate(length(max = 20))]
    pub academic_year: Option<String>,
    #[validate(length(max = 255))]
    pub how_did_you_find_us: Option<String>,
    pub registration_source: Option<RegistrationSource>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpDto {
    #[validate(email(message = "Invalid email"))]
    pub email: String,
    #[validate(length(equal = 6, message = "OTP must be 6 digits"))]
    pub otp: String,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StudentLoginDto {
    /// Email address or role number
    #[serde(alias = "emailOrRoleNumber")]
    #[validate(length(min = 1, message = "Email/Role Number is required"))]
    pub identifier: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginDto {
    #[validate(email(message = "Invalid email"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TeacherSignupDto {
    #[validate(length(min = 1, max = 255))]
    pub full_name: String,
    #[validate(email(message = "Invalid email"))]
    pub email: String,
    #[validate(custom(function = "validate_phone"))]
    pub phone: String,
    #[validate(custom(function = "validate_gender"))]
    pub gender: String,
    #[validate(length(min = 1, max = 100))]
    pub country_region: String,
    #[validate(length(min = 1, max = 100))]
    pub state: String,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[validate(length(min = 1, max = 255))]
    pub qualification: String,
    #[serde(default)]
    pub subject_specialization: Vec<String>,
    pub id_proof_url: Option<String>,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub confirm_password: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LinkStudentDto {
    /// Role number of the student
    #[validate(length(min = 1, max = 20))]
    pub student_id: String,
    #[validate(custom(function = "validate_relationship"))]
    pub relationship: String,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ParentRegisterDto {
    #[validate(length(min = 1, max = 255))]
    pub full_name: String,
    #[validate(email(message = "Invalid email"))]
    pub email: String,
    #[validate(custom(function = "validate_phone"))]
    pub phone: String,
    #[validate(length(min = 1, message = "At least one student must be linked"), nested)]
    pub linked_students: Vec<LinkStudentDto>,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub confirm_password: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParentRegisterResponse {
    pub message: String,
    pub email: String,
    pub linked_students: Vec<LinkedStudentInfo>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ParentLoginDto {
    /// Role number of a linked student
    #[validate(length(min = 1, message = "Student ID is required"))]
    pub student_id: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AdminRegisterDto {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub confirm_password: String,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordDto {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordDto {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(equal = 6, message = "OTP must be 6 digits"))]
    pub otp: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub new_password: String,
    #[validate(must_match(other = "new_password", message = "Passwords do not match"))]
    pub confirm_password: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParentAuthResponse {
    pub token: String,
    pub user: UserProfile,
    pub linked_students: Vec<LinkedStudentInfo>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Message plus the email it concerns, returned by the OTP flows.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmailMessageResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register_dto() -> StudentRegisterDto {
        StudentRegisterDto {
            full_name: "Asha Rao".to_string(),
            dob: NaiveDate::from_ymd_opt(2012, 5, 1).unwrap(),
            email: "asha@school.test".to_string(),
            phone: "+919876543210".to_string(),
            academic_region: "North".to_string(),
            class_name: "6".to_string(),
            password: "secret1".to_string(),
            confirm_password: "secret1".to_string(),
        }
    }

    #[test]
    fn test_register_valid() {
        assert!(register_dto().validate().is_ok());
    }

    #[test]
    fn test_register_password_mismatch() {
        let mut dto = register_dto();
        dto.confirm_password = "secret2".to_string();
        let errors = dto.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("confirm_password"));
    }

    #[test]
    fn test_register_short_password_and_bad_phone() {
        let mut dto = register_dto();
        dto.password = "abc".to_string();
        dto.confirm_password = "abc".to_string();
        dto.phone = "9876543210".to_string();
        let errors = dto.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("password"));
        assert!(fields.contains_key("phone"));
    }

    #[test]
    fn test_register_accepts_class_alias() {
        let json = r#"{"fullName":"A","dob":"2012-05-01","email":"a@b.test","phone":"+919876543210",
            "academicRegion":"North","class":"6","password":"secret1","confirmPassword":"secret1"}"#;
        let dto: StudentRegisterDto = serde_json::from_str(json).unwrap();
        assert_eq!(dto.class_name, "6");
    }

    #[test]
    fn test_parent_register_requires_link() {
        let dto = ParentRegisterDto {
            full_name: "Ravi Rao".to_string(),
            email: "ravi@home.test".to_string(),
            phone: "+919876543210".to_string(),
            linked_students: vec![],
            password: "secret1".to_string(),
            confirm_password: "secret1".to_string(),
        };
        let errors = dto.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("linked_students"));
    }

    #[test]
    fn test_parent_register_validates_relationship() {
        let dto = ParentRegisterDto {
            full_name: "Ravi Rao".to_string(),
            email: "ravi@home.test".to_string(),
            phone: "+919876543210".to_string(),
            linked_students: vec![LinkStudentDto {
                student_id: "NO001".to_string(),
                relationship: "Uncle".to_string(),
            }],
            password: "secret1".to_string(),
            confirm_password: "secret1".to_string(),
        };
        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_student_login_alias() {
        let dto: StudentLoginDto =
            serde_json::from_str(r#"{"emailOrRoleNumber":"no001","password":"x"}"#).unwrap();
        assert_eq!(dto.identifier, "no001");
    }
}
