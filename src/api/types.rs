// Wire types of the person API that are not the person itself

use serde::{Deserialize, Serialize};

/// Error response body
///
/// Every failing route answers with this shape:
/// `{"error": {"message": "...", "type": "not_found_error", "code": "person_not_found"}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

impl ErrorResponse {
    /// Answer with `status` instead of the status implied by the error type
    pub fn with_status(mut self, status: u16) -> Self {
        self.error.status = Some(status);
        self
    }
}

/// Error detail structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Human readable message
    pub message: String,

    /// Error category, drives the HTTP status
    #[serde(rename = "type")]
    pub error_type: String,

    /// Machine readable code (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// Status to answer with when it cannot be derived from `error_type`
    #[serde(skip)]
    pub status: Option<u16>,
}

/// Body of `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: i64,
}

/// Helper function to build an error response
pub fn create_error_response(message: String, error_type: &str, code: Option<&str>) -> ErrorResponse {
    ErrorResponse {
        error: ErrorDetail {
            message,
            error_type: error_type.to_string(),
            code: code.map(str::to_string),
            status: None,
        },
    }
}

/// Helper function to get current Unix timestamp
pub fn current_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}
