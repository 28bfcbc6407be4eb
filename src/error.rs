use axum::{
    extract::rejection::{BytesRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Body of the catch-all route miss response
pub const NOT_FOUND_MESSAGE: &str = "404 Not Found";

/// Error response type
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// Response type for readiness check endpoint
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Response type for unhealthy status
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct UnhealthyResponse {
    pub status: String,
    pub error: String,
}

/// Custom error type for API endpoints
///
/// Every failure a handler can hit ends up here and is rendered as a JSON
/// response; nothing reaches the transport as a panic or a bare status.
#[derive(Debug)]
pub enum ApiError {
    /// No handler for this method and path
    RouteNotFound,
    /// Request body is not valid JSON
    JsonError(serde_json::Error),
    /// Request body is valid JSON but not an object
    BodyNotObject,
    /// A required field is absent, or not a non-empty string
    MissingField(&'static str),
    /// A field is present but its value is not acceptable
    InvalidField(String),
    /// An extractor refused the request before the handler ran
    Rejected { status: StatusCode, message: String },
    /// Backing store failed; details are logged, never returned
    StoreError(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::RouteNotFound => {
                return (StatusCode::NOT_FOUND, Json(NOT_FOUND_MESSAGE)).into_response();
            }
            ApiError::JsonError(err) => (
                StatusCode::BAD_REQUEST,
                format!("JSON parse error: {}", err),
            ),
            ApiError::BodyNotObject => (
                StatusCode::BAD_REQUEST,
                "Request body must be a JSON object".to_string(),
            ),
            ApiError::MissingField(field) => (
                StatusCode::BAD_REQUEST,
                format!("Missing required field: {}", field),
            ),
            ApiError::InvalidField(msg) => (
                StatusCode::BAD_REQUEST,
                format!("Invalid field: {}", msg),
            ),
            ApiError::Rejected { status, message } => (status, message),
            ApiError::StoreError(err) => {
                tracing::error!("Store operation failed: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_message,
        });

        (status, body).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::StoreError(err)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::JsonError(err)
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<BytesRejection> for ApiError {
    fn from(rejection: BytesRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}
