use crate::error::{ApiError, ErrorResponse};
use crate::models::{MutationResponse, OPERATION_DELETE, SUCCESS, parse_object, require_product_id};
use crate::routes;
use crate::state::AppState;
use axum::{body::Bytes, extract::{State, rejection::BytesRejection}, http::StatusCode, Json};

/// DELETE /product handler - Remove a product
///
/// Body: `{"productId": ...}`. Deleting a product that does not exist
/// succeeds with a `null` Item.
#[utoipa::path(
    delete,
    path = routes::PRODUCT,
    request_body = serde_json::Value,
    responses(
        (status = 200, description = "Product deleted", body = MutationResponse),
        (status = 400, description = "Invalid JSON or missing productId", body = ErrorResponse),
        (status = 413, description = "Body larger than the request limit", body = ErrorResponse),
        (status = 500, description = "Store error", body = ErrorResponse)
    ),
    tag = "products"
)]
pub async fn delete_handler(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<(StatusCode, Json<MutationResponse>), ApiError> {
    let product_id = require_product_id(&parse_object(&body?)?)?;

    let old = state.store.delete(&product_id).await?;

    tracing::info!(
        "Successfully deleted product: {} (existed: {})",
        product_id,
        old.is_some()
    );
    Ok((
        StatusCode::OK,
        Json(MutationResponse {
            operation: OPERATION_DELETE.to_string(),
            message: SUCCESS.to_string(),
            item: old,
        }),
    ))
}
