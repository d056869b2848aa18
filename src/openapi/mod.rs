use axum::Json;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Storefront Checkout API",
        version = "1.0.0",
        description = r#"
# Storefront Checkout API

Simulated checkout for a single-product storefront. A checkout validates the
order, prices it and returns an order summary together with the marketplace
URL the buyer is sent to. Nothing is persisted and no payment is taken.

## Error Handling

Every failure is reported as a JSON object with a single field:

```json
{ "error": "Missing required fields" }
```

- `400` for missing or invalid fields
- `500` for anything the caller cannot fix (`Checkout failed. Please try again.`)

Each response carries an `X-Request-Id` header for log correlation.
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development")
    ),
    tags(
        (name = "checkout", description = "Order checkout"),
        (name = "product", description = "Showcased product"),
        (name = "health", description = "Health check endpoints")
    ),
    paths(
        crate::handlers::checkout::checkout,
        crate::handlers::products::get_product,
        crate::handlers::health::health_check,
        crate::handlers::health::api_status,
    ),
    components(
        schemas(
            crate::models::CheckoutRequest,
            crate::models::CheckoutResponse,
            crate::models::OrderSummary,
            crate::models::Product,
            crate::models::ProductView,
            crate::models::Specification,
            crate::handlers::health::HealthResponse,
            crate::handlers::health::StatusResponse,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

/// Serves the generated document at `/api-docs/openapi.json`.
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDocV1::openapi())
}
