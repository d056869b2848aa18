use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::errors::ServiceError;

/// Order intent submitted by the storefront.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    /// Name of the product being purchased
    #[schema(example = "Widget")]
    pub product_name: String,
    /// Unit price, non-negative
    #[schema(example = 10.0)]
    pub price: f64,
    /// Number of units, at least 1
    #[schema(example = 3)]
    pub quantity: u32,
}

impl CheckoutRequest {
    pub fn new(product_name: impl Into<String>, price: f64, quantity: u32) -> Self {
        Self {
            product_name: product_name.into(),
            price,
            quantity,
        }
    }

    /// Applies the same rules as the HTTP payload: presence first, then ranges.
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.product_name.is_empty() {
            return Err(ServiceError::MissingFields);
        }
        if self.quantity < 1 || !self.price.is_finite() || self.price < 0.0 {
            return Err(ServiceError::InvalidQuantityOrPrice);
        }
        Ok(())
    }
}

/// Loosely typed inbound body.
///
/// Fields are kept as raw JSON so that an absent field, a `null` and a value
/// of the wrong type can all be reported as missing instead of failing
/// deserialization outright.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutPayload {
    #[serde(default)]
    pub product_name: Option<Value>,
    #[serde(default)]
    pub price: Option<Value>,
    #[serde(default)]
    pub quantity: Option<Value>,
}

impl CheckoutPayload {
    /// Parses a request body.
    ///
    /// Invalid JSON and a literal `null` are malformed. Any other non-object
    /// JSON value carries no fields and therefore fails as missing fields.
    pub fn from_slice(body: &[u8]) -> Result<Self, ServiceError> {
        match serde_json::from_slice::<Value>(body)? {
            Value::Null => Err(ServiceError::MalformedPayload(
                "request body is null".to_string(),
            )),
            value @ Value::Object(_) => Ok(serde_json::from_value(value)?),
            _ => Ok(Self::default()),
        }
    }

    pub fn into_request(self) -> Result<CheckoutRequest, ServiceError> {
        let product_name = match self.product_name {
            Some(Value::String(name)) if !name.is_empty() => name,
            _ => return Err(ServiceError::MissingFields),
        };
        let price = number(self.price).ok_or(ServiceError::MissingFields)?;
        let quantity = number(self.quantity).ok_or(ServiceError::MissingFields)?;

        if quantity < 1.0 || quantity.fract() != 0.0 || quantity > f64::from(u32::MAX) {
            return Err(ServiceError::InvalidQuantityOrPrice);
        }
        if !price.is_finite() || price < 0.0 {
            return Err(ServiceError::InvalidQuantityOrPrice);
        }

        Ok(CheckoutRequest {
            product_name,
            price,
            quantity: quantity as u32,
        })
    }
}

fn number(value: Option<Value>) -> Option<f64> {
    match value {
        Some(Value::Number(n)) => n.as_f64(),
        _ => None,
    }
}

/// Receipt-like record produced for a successful checkout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    #[schema(example = "ORD-1718000000000")]
    pub order_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: f64,
    /// `unit_price * quantity` with exactly two fraction digits
    #[schema(example = "30.00")]
    pub total: String,
    /// ISO-8601 UTC creation time
    #[schema(example = "2024-06-10T08:00:00.000Z")]
    pub timestamp: String,
}

/// Body of a successful `POST /api/checkout`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub success: bool,
    pub order_data: OrderSummary,
    /// Marketplace page the shopper should be sent to
    pub redirect_url: String,
    pub message: String,
}

/// Outcome of a checkout call as seen by a client.
#[derive(Clone, Debug, PartialEq)]
pub enum CheckoutResult {
    Success {
        order_summary: OrderSummary,
        redirect_url: String,
        message: String,
    },
    Failure {
        error_message: String,
        status_code: u16,
    },
}

impl From<CheckoutResponse> for CheckoutResult {
    fn from(response: CheckoutResponse) -> Self {
        CheckoutResult::Success {
            order_summary: response.order_data,
            redirect_url: response.redirect_url,
            message: response.message,
        }
    }
}

impl From<ServiceError> for CheckoutResult {
    fn from(err: ServiceError) -> Self {
        CheckoutResult::Failure {
            error_message: err.response_message(),
            status_code: err.status_code().as_u16(),
        }
    }
}
