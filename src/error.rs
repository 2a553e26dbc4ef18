// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::auth::AuthError;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),

    // 401 / 400 / 403 / 503 depending on the failure class
    Auth(AuthError),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 405 Method Not Allowed
    MethodNotAllowed(String),

    // 413 Payload Too Large
    PayloadTooLarge(String),

    // 415 Unsupported Media Type
    UnsupportedMediaType(String),

    // 422 Unprocessable Entity
    UnprocessableEntity(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::Auth(err) => err.status_code(),
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::MethodNotAllowed(_) => 405,
            ApiError::PayloadTooLarge(_) => 413,
            ApiError::UnsupportedMediaType(_) => 415,
            ApiError::UnprocessableEntity(_) => 422,
            ApiError::InternalServerError(_) => 500,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> String {
        match self {
            ApiError::Auth(err) => err.to_string(),
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::MethodNotAllowed(msg)
            | ApiError::PayloadTooLarge(msg)
            | ApiError::UnsupportedMediaType(msg)
            | ApiError::UnprocessableEntity(msg)
            | ApiError::InternalServerError(msg)
            | ApiError::ServiceUnavailable(msg) => msg.clone(),
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "success": false,
            "error": self.status_code(),
            "message": self.message(),
        });

        if let ApiError::Auth(err) = self {
            body["code"] = json!(err.code());
        }

        body
    }

    /// Default error for a bare status code, used for routing-level failures
    pub fn from_status(status: StatusCode) -> Self {
        match status.as_u16() {
            400 => ApiError::bad_request(),
            401 => ApiError::Unauthorized("unauthenticated".to_string()),
            403 => ApiError::Forbidden("you do not have permission to access this resource".to_string()),
            404 => ApiError::not_found(),
            405 => ApiError::MethodNotAllowed("Method Not Allowed".to_string()),
            413 => ApiError::PayloadTooLarge("Request body is too large".to_string()),
            415 => ApiError::UnsupportedMediaType("Expected a JSON request body".to_string()),
            422 => ApiError::unprocessable(),
            503 => ApiError::ServiceUnavailable("Service temporarily unavailable".to_string()),
            s if s < 500 => ApiError::bad_request(),
            _ => ApiError::InternalServerError("Internal server error".to_string()),
        }
    }
}

// Static constructor methods with the stock client messages
impl ApiError {
    pub fn bad_request() -> Self {
        ApiError::BadRequest("The server could not understand the request due to invalid syntax.".to_string())
    }

    pub fn not_found() -> Self {
        ApiError::NotFound("Resource not found".to_string())
    }

    pub fn unprocessable() -> Self {
        ApiError::UnprocessableEntity("unprocessable".to_string())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Auth(err)
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}
