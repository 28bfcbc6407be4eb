use crate::error::{ApiError, ErrorResponse};
use crate::models::{OPERATION_SAVE, SUCCESS, SaveResponse, parse_object, require_product_id};
use crate::routes;
use crate::state::AppState;
use axum::{body::Bytes, extract::{State, rejection::BytesRejection}, http::StatusCode, Json};

/// POST /product handler - Create or replace a product
///
/// The body is the full item. Any existing item with the same `productId`
/// is overwritten.
#[utoipa::path(
    post,
    path = routes::PRODUCT,
    request_body = serde_json::Value,
    responses(
        (status = 200, description = "Product stored successfully", body = SaveResponse),
        (status = 400, description = "Invalid JSON or missing productId", body = ErrorResponse),
        (status = 413, description = "Body larger than the request limit", body = ErrorResponse),
        (status = 500, description = "Store error", body = ErrorResponse)
    ),
    tag = "products"
)]
pub async fn create_handler(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<(StatusCode, Json<SaveResponse>), ApiError> {
    let item = parse_object(&body?)?;
    let product_id = require_product_id(&item)?;

    state.store.put(item.clone()).await?;

    tracing::info!("Successfully stored product: {}", product_id);
    Ok((
        StatusCode::OK,
        Json(SaveResponse {
            operation: OPERATION_SAVE.to_string(),
            message: SUCCESS.to_string(),
            item,
        }),
    ))
}
