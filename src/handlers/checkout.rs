use axum::{body::Bytes, extract::State, response::Response};
use std::time::Instant;
use tracing::{info, warn};

use crate::{
    errors::{ApiError, ErrorResponse},
    handlers::common::success_response,
    metrics::{self, CheckoutOutcome},
    models::{CheckoutRequest, CheckoutResponse},
    AppState,
};

/// Simulated checkout.
///
/// The body is read as raw bytes so that malformed JSON surfaces as the
/// generic 500 failure instead of an extractor rejection.
#[utoipa::path(
    post,
    path = "/api/checkout",
    summary = "Simulated checkout",
    description = "Validate an order request, price it and return an order summary plus marketplace redirect",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Order summary created", body = CheckoutResponse),
        (status = 400, description = "Missing or invalid fields", body = ErrorResponse),
        (status = 500, description = "Unexpected failure", body = ErrorResponse),
    ),
    tag = "checkout"
)]
pub async fn checkout(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let started = Instant::now();

    match state.checkout.checkout_raw(&body) {
        Ok(response) => {
            metrics::record_checkout(CheckoutOutcome::Success, started.elapsed());
            info!(
                order_id = %response.order_data.order_id,
                quantity = response.order_data.quantity,
                total = %response.order_data.total,
                "Checkout completed"
            );
            Ok(success_response(response))
        }
        Err(err) if err.is_validation() => {
            metrics::record_checkout(CheckoutOutcome::ValidationFailure, started.elapsed());
            warn!(error = %err, "Checkout rejected");
            Err(err.into())
        }
        Err(err) => {
            metrics::record_checkout(CheckoutOutcome::InternalError, started.elapsed());
            crate::tracing::log_error(&err, err.kind(), Some("checkout"));
            Err(err.into())
        }
    }
}
