// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

/// Whether 500 responses carry the underlying error text (development only).
static VERBOSE_ERRORS: AtomicBool = AtomicBool::new(false);

/// Toggle inclusion of internal error details in responses.
pub fn set_verbose_errors(enabled: bool) {
    VERBOSE_ERRORS.store(enabled, Ordering::Relaxed);
}

/// Message returned for every failed login, regardless of cause.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid email or password";

/// A single field-level validation failure.
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
}

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("{message}")]
    RateLimited { message: String, retry_after_secs: u64 },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Mail delivery error: {0}")]
    Mail(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| {
                    let message = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value for {}", field));
                    FieldError::new(field.to_string(), message)
                })
            })
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        AppError::Validation(fields)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<FieldError>>,
}

impl AppError {
    /// HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials | AppError::Unauthorized | AppError::InvalidToken => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Database(_) | AppError::Mail(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let verbose = VERBOSE_ERRORS.load(Ordering::Relaxed);

        let (error, message, errors) = match &self {
            AppError::Validation(fields) => (
                "validation_error",
                "Validation failed".to_string(),
                Some(fields.clone()),
            ),
            AppError::BadRequest(msg) => ("bad_request", msg.clone(), None),
            AppError::InvalidCredentials => (
                "invalid_credentials",
                INVALID_CREDENTIALS_MESSAGE.to_string(),
                None,
            ),
            AppError::Unauthorized => ("unauthorized", self.to_string(), None),
            AppError::InvalidToken => ("invalid_token", self.to_string(), None),
            AppError::Forbidden(msg) => ("forbidden", msg.clone(), None),
            AppError::NotFound(msg) => ("not_found", msg.clone(), None),
            AppError::Conflict(msg) => ("conflict", msg.clone(), None),
            AppError::RateLimited { message, .. } => ("rate_limited", message.clone(), None),
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                ("database_error", internal_message(verbose, msg), None)
            }
            AppError::Mail(msg) => {
                tracing::error!(error = %msg, "Mail error");
                ("mail_error", internal_message(verbose, msg), None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = ?err, "Internal server error");
                ("internal_error", internal_message(verbose, &err.to_string()), None)
            }
        };

        let body = ErrorResponse {
            success: false,
            error,
            message,
            errors,
        };

        let mut response = (status, Json(body)).into_response();
        if let AppError::RateLimited {
            retry_after_secs, ..
        } = self
        {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

fn internal_message(verbose: bool, detail: &str) -> String {
    if verbose {
        detail.to_string()
    } else {
        "An unexpected error occurred".to_string()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Signup {
        #[validate(length(min = 3, message = "too short"))]
        name: String,
        #[validate(email(message = "bad email"))]
        email: String,
    }

    #[test]
    fn test_validation_errors_become_field_list() {
        let signup = Signup {
            name: "ab".to_string(),
            email: "nope".to_string(),
        };
        let err: AppError = signup.validate().unwrap_err().into();

        match err {
            AppError::Validation(fields) => {
                assert_eq!(
                    fields,
                    vec![
                        FieldError::new("email", "bad email"),
                        FieldError::new("name", "too short"),
                    ]
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::InvalidCredentials.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::Conflict("x".into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::RateLimited {
                message: "slow down".into(),
                retry_after_secs: 5
            }
            .status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            AppError::Database("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_rate_limited_sets_retry_after() {
        let response = AppError::RateLimited {
            message: "slow down".into(),
            retry_after_secs: 42,
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "42");
    }
}
