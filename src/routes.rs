use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api_doc::ApiDoc;
use crate::handlers::{
    create_handler, delete_handler, get_handler, health_handler, list_handler, not_found_handler,
    ready_handler, update_handler,
};
use crate::state::AppState;

// Route path constants - single source of truth for all API paths

pub const HEALTH: &str = "/health";
pub const READY: &str = "/health/ready";
pub const PRODUCT: &str = "/product";
pub const PRODUCTS: &str = "/products";
pub const SWAGGER_UI: &str = "/swagger-ui";
pub const OPENAPI_JSON: &str = "/api-docs/openapi.json";

/// Build the application router.
///
/// Routing is an exact match on method and path. Anything unmatched,
/// including a known path with an unsupported method, answers 404.
/// HEAD is routed explicitly since axum would otherwise serve it from GET.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            HEALTH,
            get(health_handler)
                .head(not_found_handler)
                .fallback(not_found_handler),
        )
        .route(
            READY,
            get(ready_handler)
                .head(not_found_handler)
                .fallback(not_found_handler),
        )
        .route(
            PRODUCT,
            get(get_handler)
                .head(not_found_handler)
                .post(create_handler)
                .patch(update_handler)
                .delete(delete_handler)
                .fallback(not_found_handler),
        )
        .route(
            PRODUCTS,
            get(list_handler)
                .head(not_found_handler)
                .fallback(not_found_handler),
        )
        .merge(SwaggerUi::new(SWAGGER_UI).url(OPENAPI_JSON, ApiDoc::openapi()))
        .fallback(not_found_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
