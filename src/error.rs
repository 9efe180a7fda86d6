// Error handling module for the pricing service
// Provides the JSON error body shared by every module's error type

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Consistent error response structure
///
/// Every module's error type renders into this body so clients see one
/// format: a machine-readable `error_code`, a human-readable `message`,
/// optional `details` and the time the error occurred.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error code (e.g. "VALIDATION_ERROR", "NOT_FOUND")
    pub error_code: String,

    pub message: String,

    /// Omitted from JSON when None
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,

    /// RFC 3339 timestamp
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_code: &str, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.to_string(),
            message: message.into(),
            details: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn into_response_with(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_details_omitted_when_none() {
        let json = serde_json::to_value(ErrorResponse::new("CONFLICT", "nope")).unwrap();
        assert!(json.get("details").is_none());
        assert!(json.get("timestamp").is_some());
    }

    #[test]
    fn test_details_included_when_set() {
        let body = ErrorResponse::new("VALIDATION_ERROR", "bad")
            .with_details(serde_json::json!({ "field": "quantity" }));
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["details"]["field"], "quantity");
        assert_eq!(json["error_code"], "VALIDATION_ERROR");
    }

    #[test]
    fn test_response_status() {
        let response = ErrorResponse::new("NOT_FOUND", "missing").into_response_with(StatusCode::NOT_FOUND);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
