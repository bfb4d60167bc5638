//! Error response formatting.
//!
//! Standardized JSON error bodies with consistent structure, HTTP status
//! codes and request ids for support correlation.

use axum::{http::StatusCode, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Standardized error response returned to clients for all error cases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error code
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Request ID for debugging and support
    pub request_id: Option<String>,

    /// ISO 8601 timestamp of the error
    pub timestamp: String,

    /// Whether the client should retry the request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

impl ErrorResponse {
    pub fn new(code: &str, message: impl Into<String>, request_id: Option<String>) -> Self {
        Self {
            error: code.to_string(),
            message: message.into(),
            request_id,
            timestamp: Utc::now().to_rfc3339(),
            retryable: None,
        }
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = Some(retryable);
        self
    }
}

/// Helper to extract the propagated request ID from request headers.
pub fn get_request_id_from_headers(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

/// Build a standardized JSON error response for handlers.
pub fn json_error_response(
    status: StatusCode,
    message: impl Into<String>,
    request_id: Option<String>,
) -> (StatusCode, Json<ErrorResponse>) {
    let code = match status.as_u16() {
        400..=499 => "VALIDATION_ERROR",
        502..=504 => "PROVIDER_ERROR",
        _ => "INTERNAL_ERROR",
    };
    (status, Json(ErrorResponse::new(code, message, request_id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_class_maps_to_error_code() {
        let (status, body) = json_error_response(StatusCode::BAD_REQUEST, "bad phone", None);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "VALIDATION_ERROR");
        assert_eq!(body.message, "bad phone");

        let (_, body) = json_error_response(StatusCode::BAD_GATEWAY, "upstream", None);
        assert_eq!(body.error, "PROVIDER_ERROR");

        let (_, body) = json_error_response(StatusCode::INTERNAL_SERVER_ERROR, "boom", None);
        assert_eq!(body.error, "INTERNAL_ERROR");
    }

    #[test]
    fn request_id_is_read_from_headers() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert("x-request-id", "req_123".parse().expect("header value"));
        assert_eq!(
            get_request_id_from_headers(&headers),
            Some("req_123".to_string())
        );
    }
}
