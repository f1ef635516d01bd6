//! Shared API types
//!
//! Errors raised outside the query envelope use the `{error, code, message}`
//! body. Query compilation and execution failures never surface here; they
//! are reported inside the query response.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use validator::ValidationError;

use crate::core::constants::MAX_SELECT_FIELDS;

/// Validator function for the `fields` list
pub fn validate_fields(fields: &[String]) -> Result<(), ValidationError> {
    if fields.len() > MAX_SELECT_FIELDS {
        return Err(ValidationError::new("fields_too_many").with_message(
            format!("fields cannot contain more than {} entries", MAX_SELECT_FIELDS).into(),
        ));
    }
    Ok(())
}

/// Standard API error response
#[derive(Debug)]
pub enum ApiError {
    ServiceUnavailable { message: String },
}

impl ApiError {
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable {
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, code, message) = match self {
            Self::ServiceUnavailable { message } => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                "SERVICE_UNAVAILABLE".to_string(),
                message,
            ),
        };
        (
            status,
            Json(serde_json::json!({
                "error": error_type,
                "code": code,
                "message": message
            })),
        )
            .into_response()
    }
}
