use axum::{extract::State, Json};

use crate::{models::ProductView, AppState};

/// The showcased product with its derived discount.
#[utoipa::path(
    get,
    path = "/api/product",
    summary = "Showcased product",
    responses(
        (status = 200, description = "Product details", body = ProductView),
    ),
    tag = "product"
)]
pub async fn get_product(State(state): State<AppState>) -> Json<ProductView> {
    Json(ProductView::from(state.product.as_ref()))
}
