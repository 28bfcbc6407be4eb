use crate::error::{ApiError, ErrorResponse};
use crate::models::ProductsResponse;
use crate::routes;
use crate::state::AppState;
use crate::store::scan_all;
use axum::{extract::State, http::StatusCode, Json};

/// GET /products handler - List every product
///
/// Follows the store's continuation tokens page by page until the whole table
/// has been read. Items come back in the store's scan order. The page size and
/// the page ceiling come from configuration.
#[utoipa::path(
    get,
    path = routes::PRODUCTS,
    responses(
        (status = 200, description = "All products", body = ProductsResponse),
        (status = 500, description = "Store error", body = ErrorResponse)
    ),
    tag = "products"
)]
pub async fn list_handler(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<ProductsResponse>), ApiError> {
    let products = scan_all(
        state.store.as_ref(),
        state.config.scan_page_size,
        state.config.scan_max_pages,
    )
    .await?;

    tracing::info!("Listed {} products", products.len());

    Ok((StatusCode::OK, Json(ProductsResponse { products })))
}
