//! Classes and subjects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::ids::{ClassId, SubjectId};
use crate::value_types::validate_class_name;

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Class {
    pub id: ClassId,
    pub class_name: String,
    pub class_code: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: SubjectId,
    pub subject_code: String,
    pub subject_name: String,
    pub description: Option<String>,
    pub class_id: ClassId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClassWithSubjects {
    #[serde(flatten)]
    pub class: Class,
    pub subjects: Vec<Subject>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateClassDto {
    #[validate(custom(function = "validate_class_name"))]
    pub class_name: String,
    #[validate(length(min = 1, max = 20))]
    pub class_code: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubjectDto {
    /// Stored uppercased; derived from the name when omitted
    #[validate(length(min = 1, max = 50))]
    pub subject_code: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub subject_name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub class_id: ClassId,
}

/// Subject code derived from the first word of the subject name, e.g.
/// `CLASS6_MATHEMATICS`.
pub fn default_subject_code(subject_name: &str, class_name: &str) -> String {
    let first_word: String = subject_name
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    format!("CLASS{}_{}", class_name.trim(), first_word.to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_subject_code() {
        assert_eq!(default_subject_code("Mathematics", "6"), "CLASS6_MATHEMATICS");
        assert_eq!(
            default_subject_code("Science (Physics, Chemistry, Biology)", "9"),
            "CLASS9_SCIENCE"
        );
        assert_eq!(default_subject_code("Art & Craft", "1"), "CLASS1_ART");
    }

    #[test]
    fn test_create_class_rejects_unknown_name() {
        let dto = CreateClassDto {
            class_name: "11".to_string(),
            class_code: "C11".to_string(),
            description: None,
        };
        assert!(dto.validate().is_err());
    }
}
