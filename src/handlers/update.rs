use crate::error::{ApiError, ErrorResponse};
use crate::models::{MutationResponse, OPERATION_UPDATE, SUCCESS, UpdateRequest, parse_object};
use crate::routes;
use crate::state::AppState;
use axum::{body::Bytes, extract::{State, rejection::BytesRejection}, http::StatusCode, Json};

/// PATCH /product handler - Set a single field on a product
///
/// Body: `{"productId": ..., "updateKey": ..., "updateValue": ...}`. The item
/// is created if it does not exist yet.
#[utoipa::path(
    patch,
    path = routes::PRODUCT,
    request_body = serde_json::Value,
    responses(
        (status = 200, description = "Field updated", body = MutationResponse),
        (status = 400, description = "Invalid JSON or missing field", body = ErrorResponse),
        (status = 413, description = "Body larger than the request limit", body = ErrorResponse),
        (status = 500, description = "Store error", body = ErrorResponse)
    ),
    tag = "products"
)]
pub async fn update_handler(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<(StatusCode, Json<MutationResponse>), ApiError> {
    let request = UpdateRequest::from_body(parse_object(&body?)?)?;

    let updated = state
        .store
        .update_field(&request.product_id, &request.update_key, request.update_value)
        .await?;

    tracing::info!(
        "Successfully updated field '{}' of product: {}",
        request.update_key,
        request.product_id
    );
    Ok((
        StatusCode::OK,
        Json(MutationResponse {
            operation: OPERATION_UPDATE.to_string(),
            message: SUCCESS.to_string(),
            item: Some(updated),
        }),
    ))
}
