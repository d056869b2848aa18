use chrono::{SecondsFormat, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::sync::Arc;
use tracing::{debug, instrument};
use url::Url;

use crate::{
    config::CheckoutConfig,
    errors::ServiceError,
    models::{CheckoutPayload, CheckoutRequest, CheckoutResponse, OrderSummary},
    services::order_ids::OrderIdGenerator,
};

/// Validates checkout requests and fabricates the order summary and redirect.
///
/// Nothing is persisted and no external call is made; the redirect URL is a
/// navigation hint for the caller.
#[derive(Clone, Debug)]
pub struct CheckoutService {
    marketplace_url: Url,
    marketplace_name: String,
    order_ids: Arc<OrderIdGenerator>,
}

impl CheckoutService {
    pub fn new(
        marketplace_url: Url,
        marketplace_name: impl Into<String>,
        order_ids: Arc<OrderIdGenerator>,
    ) -> Self {
        Self {
            marketplace_url,
            marketplace_name: marketplace_name.into(),
            order_ids,
        }
    }

    pub fn from_config(config: &CheckoutConfig) -> Result<Self, ServiceError> {
        let marketplace_url = config.marketplace_url().map_err(|e| {
            ServiceError::InternalError(format!(
                "invalid marketplace url {}: {}",
                config.marketplace_item_url, e
            ))
        })?;
        Ok(Self::new(
            marketplace_url,
            config.marketplace_name.clone(),
            Arc::new(OrderIdGenerator::new(config.order_id_prefix.clone())),
        ))
    }

    /// Handles a raw request body the way `POST /api/checkout` receives it.
    #[instrument(skip(self, body), fields(body_len = body.len()))]
    pub fn checkout_raw(&self, body: &[u8]) -> Result<CheckoutResponse, ServiceError> {
        let request = CheckoutPayload::from_slice(body)?.into_request()?;
        self.checkout(&request)
    }

    /// Validates `request`, prices it and builds the success payload.
    #[instrument(skip(self), fields(product = %request.product_name, quantity = request.quantity))]
    pub fn checkout(&self, request: &CheckoutRequest) -> Result<CheckoutResponse, ServiceError> {
        request.validate()?;

        let total = order_total(request.price, request.quantity)?;
        let order_data = OrderSummary {
            order_id: self.order_ids.next_id(),
            product_name: request.product_name.clone(),
            quantity: request.quantity,
            unit_price: request.price,
            total: format_amount(total),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        debug!(order_id = %order_data.order_id, total = %order_data.total, "Order summary built");

        Ok(CheckoutResponse {
            success: true,
            redirect_url: self.redirect_url(request.quantity),
            message: format!(
                "Order created successfully. Redirecting to {}...",
                self.marketplace_name
            ),
            order_data,
        })
    }

    /// Marketplace item URL with the quantity appended as a query parameter.
    pub fn redirect_url(&self, quantity: u32) -> String {
        let mut url = self.marketplace_url.clone();
        url.query_pairs_mut()
            .append_pair("quantity", &quantity.to_string());
        url.to_string()
    }
}

/// `price * quantity` rounded half away from zero to cents.
///
/// Prices beyond what a `Decimal` can hold are rejected as invalid input.
pub fn order_total(price: f64, quantity: u32) -> Result<Decimal, ServiceError> {
    let unit = Decimal::from_f64(price).ok_or(ServiceError::InvalidQuantityOrPrice)?;
    unit.checked_mul(Decimal::from(quantity))
        .map(|total| total.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
        .ok_or(ServiceError::InvalidQuantityOrPrice)
}

/// Renders an amount with exactly two fraction digits.
pub fn format_amount(amount: Decimal) -> String {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_MARKETPLACE_ITEM_URL;
    use assert_matches::assert_matches;
    use chrono::DateTime;
    use rust_decimal_macros::dec;

    fn service() -> CheckoutService {
        CheckoutService::from_config(&CheckoutConfig::default()).unwrap()
    }

    #[test]
    fn widget_scenario() {
        let response = service()
            .checkout(&CheckoutRequest::new("Widget", 10.0, 3))
            .unwrap();

        assert!(response.success);
        assert_eq!(response.order_data.total, "30.00");
        assert_eq!(response.order_data.unit_price, 10.0);
        assert_eq!(response.order_data.quantity, 3);
        assert!(response.order_data.order_id.starts_with("ORD-"));
        assert_eq!(
            response.redirect_url,
            format!("{}?quantity=3", DEFAULT_MARKETPLACE_ITEM_URL)
        );
        assert_eq!(
            response.message,
            "Order created successfully. Redirecting to eBay..."
        );
    }

    #[test]
    fn timestamp_is_iso_utc_with_millis() {
        let response = service()
            .checkout(&CheckoutRequest::new("Widget", 1.0, 1))
            .unwrap();
        let ts = &response.order_data.timestamp;
        assert!(ts.ends_with('Z'));
        assert_eq!(ts.len(), "2024-06-10T08:00:00.000Z".len());
        DateTime::parse_from_rfc3339(ts).unwrap();
    }

    #[test]
    fn repeated_requests_get_distinct_ids_and_equal_totals() {
        let service = service();
        let request = CheckoutRequest::new("Widget", 19.99, 2);
        let first = service.checkout(&request).unwrap();
        let second = service.checkout(&request).unwrap();
        assert_ne!(first.order_data.order_id, second.order_data.order_id);
        assert_eq!(first.order_data.total, second.order_data.total);
        assert_eq!(first.order_data.total, "39.98");
    }

    #[test]
    fn redirect_url_preserves_existing_query() {
        let service = CheckoutService::new(
            Url::parse("https://market.example.com/itm/42?ref=storefront").unwrap(),
            "Example Market",
            Arc::new(OrderIdGenerator::new("ORD-")),
        );
        assert_eq!(
            service.redirect_url(5),
            "https://market.example.com/itm/42?ref=storefront&quantity=5"
        );
    }

    #[test]
    fn raw_body_errors_map_to_service_errors() {
        let service = service();
        assert_matches!(
            service.checkout_raw(br#"{"price": 10, "quantity": 1}"#),
            Err(ServiceError::MissingFields)
        );
        assert_matches!(
            service.checkout_raw(br#"{"productName": "Widget", "price": 10, "quantity": 0}"#),
            Err(ServiceError::InvalidQuantityOrPrice)
        );
        assert_matches!(
            service.checkout_raw(b"not json"),
            Err(ServiceError::MalformedPayload(_))
        );
    }

    #[test]
    fn totals_round_to_cents() {
        assert_eq!(order_total(0.125, 1).unwrap(), dec!(0.13));
        assert_eq!(order_total(899.99, 3).unwrap(), dec!(2699.97));
        assert_eq!(order_total(0.0, 7).unwrap(), dec!(0));
        assert_eq!(order_total(0.1, 3).unwrap(), dec!(0.3));
    }

    #[test]
    fn inexact_binary_prices_round_on_their_decimal_reading() {
        // 1.005 and 2.675 sit just below the midpoint in binary
        assert_eq!(format_amount(order_total(1.005, 1).unwrap()), "1.01");
        assert_eq!(format_amount(order_total(2.675, 1).unwrap()), "2.68");
        assert_eq!(format_amount(order_total(0.145, 1).unwrap()), "0.15");
    }

    #[test]
    fn oversized_prices_are_invalid() {
        assert_matches!(
            order_total(1e30, 1),
            Err(ServiceError::InvalidQuantityOrPrice)
        );
    }

    #[test]
    fn amounts_always_show_two_digits() {
        assert_eq!(format_amount(dec!(30)), "30.00");
        assert_eq!(format_amount(dec!(0.5)), "0.50");
        assert_eq!(format_amount(dec!(12.345)), "12.35");
    }
}
