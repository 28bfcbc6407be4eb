use crate::error::{ApiError, ErrorResponse};
use crate::models::ProductQuery;
use crate::routes;
use crate::state::AppState;
use crate::store::PRODUCT_ID;
use axum::{
    extract::{Query, State, rejection::QueryRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    Json,
};

/// GET /product?productId=... handler - Retrieve one product
///
/// A missing product is not an error: the response is 200 with an empty body.
#[utoipa::path(
    get,
    path = routes::PRODUCT,
    params(ProductQuery),
    responses(
        (status = 200, description = "The product, or an empty body if it does not exist", body = serde_json::Value),
        (status = 400, description = "productId query parameter missing or repeated", body = ErrorResponse),
        (status = 500, description = "Store error", body = ErrorResponse)
    ),
    tag = "products"
)]
pub async fn get_handler(
    State(state): State<AppState>,
    query: Result<Query<ProductQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let product_id = query
        .product_id
        .filter(|id| !id.is_empty())
        .ok_or(ApiError::MissingField(PRODUCT_ID))?;

    match state.store.get(&product_id).await? {
        Some(item) => {
            tracing::info!("Successfully retrieved product: {}", product_id);
            Ok((StatusCode::OK, Json(item)).into_response())
        }
        None => {
            tracing::info!("Product not found: {}", product_id);
            Ok((StatusCode::OK, [(header::CONTENT_TYPE, "application/json")]).into_response())
        }
    }
}
