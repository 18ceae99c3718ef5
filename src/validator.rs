use anyhow::anyhow;
use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
    http::StatusCode,
};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use schoolhub_core::AppError;

/// Flattens validation errors into one message, descending into nested
/// structs and lists (`linkedStudents[1].relationship`).
pub fn format_errors(errors: &ValidationErrors) -> String {
    let mut messages = Vec::new();
    collect_messages(errors, "", &mut messages);
    messages.sort();
    messages.join(", ")
}

fn collect_messages(errors: &ValidationErrors, prefix: &str, out: &mut Vec<String>) {
    for (field, kind) in errors.errors() {
        let path = if field == "__all__" {
            prefix.to_string()
        } else if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };

        match kind {
            ValidationErrorsKind::Field(errs) => {
                for error in errs {
                    out.push(match &error.message {
                        Some(msg) => msg.to_string(),
                        None if path.is_empty() => "Request is invalid".to_string(),
                        None => format!("{path} is invalid"),
                    });
                }
            }
            ValidationErrorsKind::Struct(nested) => collect_messages(nested, &path, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect_messages(nested, &format!("{path}[{index}]"), out);
                }
            }
        }
    }
}

/// 422 with the flattened validation messages.
pub fn validation_error(errors: &ValidationErrors) -> AppError {
    AppError::unprocessable(anyhow!("{}", format_errors(errors)))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| {
                let error_msg = rejection.body_text();

                if error_msg.contains("missing field") {
                    let field = error_msg
                        .split("missing field `")
                        .nth(1)
                        .and_then(|s| s.split('`').next())
                        .unwrap_or("unknown");
                    return AppError::new(
                        StatusCode::BAD_REQUEST,
                        anyhow!("{} is required", field),
                    );
                }

                if error_msg.contains("unknown variant") {
                    return AppError::new(
                        StatusCode::BAD_REQUEST,
                        anyhow!("Invalid value in request"),
                    );
                }

                if error_msg.contains("invalid type") || error_msg.contains("input contains invalid") {
                    return AppError::new(
                        StatusCode::BAD_REQUEST,
                        anyhow!("Invalid field type in request"),
                    );
                }

                if matches!(rejection, JsonRejection::MissingJsonContentType(_)) {
                    return AppError::new(
                        StatusCode::BAD_REQUEST,
                        anyhow!("Missing 'Content-Type: application/json' header"),
                    );
                }

                AppError::new(StatusCode::BAD_REQUEST, anyhow!("Invalid request body"))
            })?;

        value.validate().map_err(|errors| validation_error(&errors))?;

        Ok(ValidatedJson(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    struct Child {
        #[validate(length(min = 1, message = "Relationship is required"))]
        relationship: String,
    }

    #[derive(Debug, Deserialize, Validate)]
    struct Parent {
        #[validate(email(message = "Invalid email"))]
        email: String,
        #[validate(nested)]
        children: Vec<Child>,
        #[validate(length(min = 3))]
        name: String,
    }

    #[test]
    fn test_format_includes_nested_list_errors() {
        let dto = Parent {
            email: "nope".to_string(),
            children: vec![
                Child {
                    relationship: "Mother".to_string(),
                },
                Child {
                    relationship: String::new(),
                },
            ],
            name: "Ok name".to_string(),
        };
        let errors = dto.validate().unwrap_err();
        let message = format_errors(&errors);
        assert!(message.contains("Invalid email"));
        assert!(message.contains("Relationship is required"));
    }

    #[test]
    fn test_format_falls_back_to_field_name() {
        let dto = Parent {
            email: "a@b.co".to_string(),
            children: vec![],
            name: "x".to_string(),
        };
        let errors = dto.validate().unwrap_err();
        assert_eq!(format_errors(&errors), "name is invalid");
    }

    #[test]
    fn test_validation_error_is_422() {
        let dto = Parent {
            email: "bad".to_string(),
            children: vec![],
            name: "Fine".to_string(),
        };
        let err = validation_error(&dto.validate().unwrap_err());
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
