//! Error handling - maps every failure to a `{message, ...}` JSON body.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use validator::ValidationErrors;

use quill_core::error::{DomainError, RepoError};
use quill_core::ports::{AuthError, ChatError, StorageError};
use quill_shared::{ErrorResponse, FieldError};

/// Application-level error type returned by handlers and extractors.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation error: {0:?}")]
    Validation(Vec<FieldError>),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// A third-party provider failed; `response` is user-facing text.
    #[error("Upstream error ({status}): {message}")]
    Upstream {
        status: StatusCode,
        message: String,
        response: Option<String>,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Upstream { status, .. } => *status,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::Validation(errors) => ErrorResponse::validation(errors.clone()),
            AppError::BadRequest(msg)
            | AppError::Unauthorized(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::PayloadTooLarge(msg) => ErrorResponse::new(msg.clone()),
            AppError::Upstream {
                message, response, ..
            } => {
                let body = ErrorResponse::new(message.clone());
                match response {
                    Some(text) => body.with_response(text.clone()),
                    None => body,
                }
            }
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                ErrorResponse::internal_error()
            }
        };

        HttpResponse::build(self.status_code()).json(body)
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation(FieldError::from_validation(&errors))
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound { entity_type, .. } => {
                AppError::NotFound(format!("{entity_type} not found"))
            }
            DomainError::Validation(msg) => AppError::BadRequest(msg),
            DomainError::Duplicate(msg) => AppError::Conflict(msg),
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => AppError::not_found("Resource not found"),
            RepoError::Constraint(detail) => {
                tracing::debug!(detail = %detail, "Unique constraint violation");
                AppError::Conflict("Email or username already exists".to_string())
            }
            RepoError::Connection(msg) => {
                tracing::error!("Database connection error: {}", msg);
                AppError::Internal("Database error".to_string())
            }
            RepoError::Query(msg) => {
                tracing::error!("Database query error: {}", msg);
                AppError::Internal("Database error".to_string())
            }
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => AppError::unauthorized("Invalid email or password"),
            AuthError::MissingAuth => AppError::unauthorized("Unauthorized"),
            AuthError::UserNotFound => AppError::unauthorized("User not found"),
            AuthError::TokenExpired | AuthError::InvalidToken(_) => {
                AppError::unauthorized("Invalid token")
            }
            AuthError::HashingError(msg) => AppError::Internal(msg),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        tracing::error!(error = %err, "Image upload failed");
        AppError::Upstream {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "Failed to upload image".to_string(),
            response: None,
        }
    }
}

impl From<ChatError> for AppError {
    fn from(err: ChatError) -> Self {
        let (status, message, response) = match &err {
            ChatError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "Rate limit exceeded. Please wait before trying again.",
                "⚠️ Brain overload! I need a 30-second break. Please wait and try again.",
            ),
            ChatError::ModelNotFound(_) => (
                StatusCode::NOT_FOUND,
                "AI Model not found. The model may be deprecated.",
                "⚠️ System Error: AI Model unavailable. The developer needs to update the model version.",
            ),
            ChatError::AuthenticationFailed => (
                StatusCode::FORBIDDEN,
                "API key authentication failed.",
                "⚠️ Authentication Error: Please check the API key configuration.",
            ),
            ChatError::Provider(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error processing AI request",
                "Sorry, something went wrong on my end. Please try again in a moment.",
            ),
        };

        if status.is_server_error() {
            tracing::error!(error = %err, "AI chat failed");
        } else {
            tracing::warn!(error = %err, "AI provider refused request");
        }

        AppError::Upstream {
            status,
            message: message.to_string(),
            response: Some(response.to_string()),
        }
    }
}

/// Result type alias for handlers.
pub type AppResult<T> = Result<T, AppError>;
