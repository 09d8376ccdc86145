// HTTP API Error Types
use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::auth::JwtError;
use crate::database::DatabaseError;
use crate::rbac::RbacError;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError { 
        message: String, 
        field_errors: Option<HashMap<String, String>> 
    },
    InvalidJson(String),
    
    // 401 Unauthorized  
    Unauthorized(String),
    
    // 403 Forbidden
    Forbidden(String),
    
    // 404 Not Found
    NotFound(String),
    
    // 409 Conflict
    Conflict(String),
    
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
            ApiError::ValidationError { .. } => 400,
            ApiError::InvalidJson(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::InternalServerError(_) => 500,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }
    
    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::ValidationError { message, .. } => message,
            ApiError::InvalidJson(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::Conflict(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }
    
    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        match self {
            ApiError::ValidationError { message, field_errors } => {
                let mut response = json!({
                    "error": true,
                    "message": message,
                    "code": "VALIDATION_ERROR"
                });
                
                if let Some(field_errors) = field_errors {
                    response["field_errors"] = json!(field_errors);
                }
                
                response
            }
            _ => {
                json!({
                    "error": true,
                    "message": self.message(),
                    "code": self.error_code()
                })
            }
        }
    }
    
    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::InvalidJson(_) => "INVALID_JSON",
            ApiError::Unauthorized(_) => "UNAUTHORIZED", 
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }
    
    pub fn validation_error(
        message: impl Into<String>, 
        field_errors: Option<HashMap<String, String>>
    ) -> Self {
        ApiError::ValidationError { 
            message: message.into(), 
            field_errors 
        }
    }
    
    pub fn invalid_json(message: impl Into<String>) -> Self {
        ApiError::InvalidJson(message.into())
    }
    
    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }
    
    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }
    
    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }
    
    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }
    
    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }
    
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

// Convert other error types to ApiError
impl From<RbacError> for ApiError {
    fn from(err: RbacError) -> Self {
        match err {
            RbacError::NotFound { .. } => ApiError::not_found(err.to_string()),
            RbacError::Duplicate(msg) => ApiError::conflict(msg),
            RbacError::Cycle(msg) | RbacError::HasChildren(msg) | RbacError::Invalid(msg) => {
                ApiError::validation_error(msg, None)
            }
            RbacError::Storage(db_err) => db_err.into(),
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        if err.is_connection() {
            tracing::error!("Database connection error: {}", err);
            return ApiError::service_unavailable("Database temporarily unavailable");
        }

        match err {
            DatabaseError::Migration(msg) => {
                tracing::error!("Migration error: {}", msg);
                ApiError::service_unavailable("Service is being updated, please try again later")
            }
            other => {
                // Don't expose internal SQL errors to clients
                tracing::error!("Database error: {}", other);
                ApiError::internal_server_error("Database error occurred")
            }
        }
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::TokenGeneration(msg) => {
                tracing::error!("Token generation failed: {}", msg);
                ApiError::internal_server_error("Failed to issue token")
            }
            other => ApiError::unauthorized(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::invalid_json(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rbac_errors_map_to_http_statuses() {
        assert_eq!(ApiError::from(RbacError::menu_not_found("M1")).status_code(), 404);
        assert_eq!(ApiError::from(RbacError::Duplicate("dup".into())).status_code(), 409);

        let cycle = ApiError::from(RbacError::Cycle("loop".into()));
        assert_eq!(cycle.status_code(), 400);
        assert_eq!(cycle.error_code(), "VALIDATION_ERROR");
        assert_eq!(ApiError::from(RbacError::HasChildren("kids".into())).status_code(), 400);
        assert_eq!(ApiError::from(RbacError::invalid("bad")).status_code(), 400);
    }

    #[test]
    fn storage_errors_hide_details() {
        let err = ApiError::from(RbacError::Storage(DatabaseError::Migration("boom".into())));
        assert_eq!(err.status_code(), 503);
        assert!(!err.message().contains("boom"));

        let err = ApiError::from(DatabaseError::ConfigMissing("DATABASE_URL"));
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn token_errors_are_unauthorized() {
        let err = ApiError::from(JwtError::InvalidToken("expired".into()));
        assert_eq!(err.status_code(), 401);
        assert_eq!(err.to_json()["code"], "UNAUTHORIZED");
    }
}
