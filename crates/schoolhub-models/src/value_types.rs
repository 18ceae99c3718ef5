//! Normalisation and field validators for user-supplied values.

use std::borrow::Cow;

use validator::ValidationError;

pub const RELATIONSHIPS: [&str; 4] = ["Father", "Mother", "Guardian", "Other"];
pub const GENDERS: [&str; 3] = ["Male", "Female", "Other"];
pub const CLASS_NAMES: [&str; 10] = ["1", "2", "3", "4", "5", "6", "7", "8", "9", "10"];

/// Emails are stored trimmed and lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Role numbers are matched case-insensitively and stored uppercased.
pub fn normalize_role_number(role_number: &str) -> String {
    role_number.trim().to_uppercase()
}

fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

/// `+`, a 1-3 digit country code, then 7-14 digits.
pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    let digits = match phone.strip_prefix('+') {
        Some(rest) => rest,
        None => {
            return Err(error(
                "phone",
                "Phone number must include country code (e.g., +91XXXXXXXXXX)",
            ));
        }
    };
    if digits.chars().all(|c| c.is_ascii_digit()) && (8..=17).contains(&digits.len()) {
        Ok(())
    } else {
        Err(error(
            "phone",
            "Phone number must include country code (e.g., +91XXXXXXXXXX)",
        ))
    }
}

pub fn validate_relationship(relationship: &str) -> Result<(), ValidationError> {
    if RELATIONSHIPS.contains(&relationship) {
        Ok(())
    } else {
        Err(error(
            "relationship",
            "Relationship must be one of Father, Mother, Guardian, Other",
        ))
    }
}

pub fn validate_gender(gender: &str) -> Result<(), ValidationError> {
    if GENDERS.contains(&gender) {
        Ok(())
    } else {
        Err(error("gender", "Invalid gender value"))
    }
}

pub fn validate_class_name(class_name: &str) -> Result<(), ValidationError> {
    if CLASS_NAMES.contains(&class_name.trim()) {
        Ok(())
    } else {
        Err(error("class_name", "Class name must be between 1 and 10"))
    }
}

/// Numeric grade of a class name such as `"3"` or `"Grade 3"`.
pub fn class_number(class_name: &str) -> Option<u32> {
    let digits: String = class_name
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Classes 1 to 5 need a parent contact on admission.
pub fn requires_parent_details(class_name: &str) -> bool {
    matches!(class_number(class_name), Some(1..=5))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_accepts_country_code() {
        assert!(validate_phone("+919876543210").is_ok());
        assert!(validate_phone("+12025550123").is_ok());
        assert!(validate_phone("+1234567").is_err()); // 7 digits total after +
        assert!(validate_phone("+12345678").is_ok());
    }

    #[test]
    fn test_phone_rejects_bad_input() {
        assert!(validate_phone("9876543210").is_err());
        assert!(validate_phone("+91 98765 43210").is_err());
        assert!(validate_phone("+123456789012345678").is_err());
        assert!(validate_phone("+").is_err());
    }

    #[test]
    fn test_normalizers() {
        assert_eq!(normalize_email("  Kid@School.TEST "), "kid@school.test");
        assert_eq!(normalize_role_number(" no001 "), "NO001");
    }

    #[test]
    fn test_relationship_and_gender() {
        assert!(validate_relationship("Mother").is_ok());
        assert!(validate_relationship("mother").is_err());
        assert!(validate_gender("Other").is_ok());
        assert!(validate_gender("unknown").is_err());
    }

    #[test]
    fn test_class_number() {
        assert_eq!(class_number("3"), Some(3));
        assert_eq!(class_number("Grade 10"), Some(10));
        assert_eq!(class_number("Nursery"), None);
        assert!(requires_parent_details("5"));
        assert!(!requires_parent_details("6"));
        assert!(validate_class_name("10").is_ok());
        assert!(validate_class_name("11").is_err());
    }
}
