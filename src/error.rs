use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

/// Field name -> list of human-readable messages, rendered under `errors`
/// in a 422 response. BTreeMap keeps the output order stable.
#[derive(Debug, Default, Serialize)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn add(&mut self, field: &str, message: &str) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn messages(&self, field: &str) -> &[String] {
        self.0.get(field).map(|v| v.as_slice()).unwrap_or(&[])
    }
}

/// Everything a public operation can fail with. Each variant maps to one
/// status code; no error escapes to a framework default handler.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Validation failed")]
    Validation(ValidationErrors),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Please verify your email before login")]
    UnverifiedEmail,
    #[error("Email already verified")]
    AlreadyVerified,
    #[error("User not authenticated")]
    Unauthenticated,
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation(errors)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<ValidationErrors>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InvalidCredentials
            | ApiError::UnverifiedEmail
            | ApiError::AlreadyVerified => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let (message, errors) = match self {
            ApiError::Validation(errors) => ("Validation failed".to_string(), Some(errors)),
            ApiError::Internal(e) => {
                // Log the underlying cause, answer with an opaque message.
                error!(error = %e, "internal error");
                ("An unexpected error occurred".to_string(), None)
            }
            other => (other.to_string(), None),
        };

        let body = ErrorBody {
            success: false,
            message,
            errors,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_error_kinds() {
        let cases = [
            (
                ApiError::Validation(ValidationErrors::default()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (ApiError::InvalidCredentials, StatusCode::BAD_REQUEST),
            (ApiError::UnverifiedEmail, StatusCode::BAD_REQUEST),
            (ApiError::AlreadyVerified, StatusCode::BAD_REQUEST),
            (ApiError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (
                ApiError::NotFound("User not found".into()),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::Internal(anyhow::anyhow!("boom")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn validation_errors_collect_per_field() {
        let mut errors = ValidationErrors::default();
        errors.add("email", "Email is required");
        errors.add("email", "Email must be a valid email address");
        errors.add("password", "Password is required");

        assert_eq!(errors.messages("email").len(), 2);
        assert_eq!(errors.messages("password"), ["Password is required"]);
        assert!(errors.messages("first_name").is_empty());

        let json = serde_json::to_string(&errors).unwrap();
        assert!(json.contains("Email is required"));
    }

    #[test]
    fn internal_error_body_is_opaque() {
        let err = ApiError::Internal(anyhow::anyhow!("connection refused (db=users)"));
        let body = ErrorBody {
            success: false,
            message: "An unexpected error occurred".to_string(),
            errors: None,
        };
        // The rendered message never contains the underlying cause.
        let json = serde_json::to_string(&body).unwrap();
        assert!(!json.contains("connection refused"));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
