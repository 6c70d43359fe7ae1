//! Error response body.
//!
//! Every failure leaves the API as `{"message": ...}`, optionally with
//! field-level `errors` (validation) or a user-facing `response` (AI proxy).

use serde::{Deserialize, Serialize};
use validator::{ValidationError, ValidationErrors};

/// JSON error body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,

    /// Friendly text for chat clients that render `response` verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            errors: None,
            response: None,
        }
    }

    pub fn with_errors(mut self, errors: Vec<FieldError>) -> Self {
        self.errors = Some(errors);
        self
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.response = Some(response.into());
        self
    }

    pub fn validation(errors: Vec<FieldError>) -> Self {
        Self::new("Validation error").with_errors(errors)
    }

    pub fn internal_error() -> Self {
        Self::new("Internal server error")
    }
}

/// One failed field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Flatten `validator` output into a stable, field-sorted list.
    pub fn from_validation(errors: &ValidationErrors) -> Vec<Self> {
        let mut out: Vec<Self> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                let field = field.to_string();
                errs.iter()
                    .map(move |err| Self::new(field.clone(), describe(&field, err)))
            })
            .collect();
        out.sort_by(|a, b| a.field.cmp(&b.field));
        out
    }
}

fn describe(field: &str, err: &ValidationError) -> String {
    if let Some(message) = &err.message {
        return message.to_string();
    }

    match err.code.as_ref() {
        "required" => format!("{field} is required"),
        "email" => "Invalid email address".to_string(),
        "url" => format!("{field} must be a valid URL"),
        "length" => match (err.params.get("min"), err.params.get("max")) {
            (Some(min), Some(max)) => {
                format!("{field} must be between {min} and {max} characters")
            }
            (Some(min), None) => format!("{field} must be at least {min} characters"),
            (None, Some(max)) => format!("{field} must be at most {max} characters"),
            (None, None) => format!("{field} has an invalid length"),
        },
        code => format!("{field} is invalid ({code})"),
    }
}
