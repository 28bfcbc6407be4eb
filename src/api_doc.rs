use utoipa::OpenApi;

use crate::error::{ErrorResponse, HealthResponse, UnhealthyResponse};
use crate::handlers;
use crate::models::{MutationResponse, ProductsResponse, SaveResponse};

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "product-inventory API",
        version = "1.0.0",
        description = "Single-item CRUD over a product table keyed by productId"
    ),
    paths(
        handlers::health::health_handler,
        handlers::health::ready_handler,
        handlers::get::get_handler,
        handlers::list::list_handler,
        handlers::create::create_handler,
        handlers::update::update_handler,
        handlers::delete::delete_handler
    ),
    components(
        schemas(
            SaveResponse,
            MutationResponse,
            ProductsResponse,
            ErrorResponse,
            HealthResponse,
            UnhealthyResponse
        )
    ),
    tags(
        (name = "health", description = "Liveness and readiness checks"),
        (name = "products", description = "Product CRUD operations")
    )
)]
pub struct ApiDoc;
