// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::BTreeMap;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Request body failed validation; messages are keyed by field name.
    #[error("Validation failed")]
    Validation(BTreeMap<String, String>),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Account disabled")]
    AccountDisabled,

    /// Login rejected because the email address has not been verified.
    /// Carries its own error code so clients can offer a resend action.
    #[error("Email not verified")]
    NotVerified,

    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Upstream service error: {0}")]
    Upstream(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<BTreeMap<String, String>>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details, fields) = match self {
            AppError::Validation(fields) => (
                StatusCode::BAD_REQUEST,
                "validation_failed",
                None,
                Some(fields),
            ),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "invalid_credentials",
                Some("Invalid email or password".to_string()),
                None,
            ),
            AppError::AccountDisabled => {
                (StatusCode::UNAUTHORIZED, "account_disabled", None, None)
            }
            AppError::NotVerified => (StatusCode::UNAUTHORIZED, "not_verified", None, None),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None, None),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", None, None),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", Some(msg), None),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg), None)
            }
            AppError::Upstream(msg) => {
                tracing::error!(error = %msg, "Upstream service error");
                (StatusCode::BAD_GATEWAY, "upstream_error", None, None)
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database_error",
                    None,
                    None,
                )
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    None,
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
            fields,
        };

        (status, Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields = BTreeMap::new();
        for (field, errs) in errors.field_errors() {
            let message = errs
                .first()
                .and_then(|e| e.message.clone())
                .map(|m| m.to_string())
                .unwrap_or_else(|| "Invalid value".to_string());
            // Wire field names are camelCase (confirmPassword etc.).
            fields.insert(camel_case(&field.to_string()), message);
        }
        AppError::Validation(fields)
    }
}

/// Convert a snake_case struct field name to its camelCase wire name.
fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper_next = false;
    for ch in field.chars() {
        if ch == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
