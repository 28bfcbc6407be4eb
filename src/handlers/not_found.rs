use crate::error::ApiError;

/// Catch-all for any method and path without a handler
pub async fn not_found_handler() -> ApiError {
    ApiError::RouteNotFound
}
