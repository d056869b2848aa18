use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{instrument, warn};
use url::Url;

use crate::{
    models::{CheckoutRequest, CheckoutResponse, CheckoutResult},
    services::CheckoutService,
};

/// Fallback message when a failed response carries no `error` field.
pub const GENERIC_FAILURE_MESSAGE: &str = "Checkout failed";

/// The call itself failed; no checkout outcome is available.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Network error: {0}")]
    Transport(String),

    #[error("Unexpected response: {0}")]
    Decode(String),
}

/// Something that can carry a checkout request to the handler.
#[async_trait]
pub trait CheckoutGateway: Send + Sync {
    async fn submit(&self, request: &CheckoutRequest) -> Result<CheckoutResult, GatewayError>;
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Posts checkout requests to a running storefront server.
#[derive(Clone, Debug)]
pub struct HttpCheckoutGateway {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpCheckoutGateway {
    /// `base_url` is the server root, e.g. `http://localhost:3000`.
    pub fn new(base_url: &Url) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Self::with_client(client, base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: &Url) -> Result<Self, GatewayError> {
        let endpoint = base_url
            .join("/api/checkout")
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl CheckoutGateway for HttpCheckoutGateway {
    #[instrument(skip(self, request), fields(endpoint = %self.endpoint))]
    async fn submit(&self, request: &CheckoutRequest) -> Result<CheckoutResult, GatewayError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        if status.is_success() {
            let parsed: CheckoutResponse = serde_json::from_slice(&body)
                .map_err(|e| GatewayError::Decode(e.to_string()))?;
            return Ok(parsed.into());
        }

        let error_message = serde_json::from_slice::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.error)
            .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string());
        warn!(status = status.as_u16(), error = %error_message, "Checkout rejected by server");

        Ok(CheckoutResult::Failure {
            error_message,
            status_code: status.as_u16(),
        })
    }
}

/// Runs checkouts against an in-process [`CheckoutService`].
#[derive(Clone, Debug)]
pub struct LocalCheckoutGateway {
    service: CheckoutService,
}

impl LocalCheckoutGateway {
    pub fn new(service: CheckoutService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl CheckoutGateway for LocalCheckoutGateway {
    async fn submit(&self, request: &CheckoutRequest) -> Result<CheckoutResult, GatewayError> {
        Ok(match self.service.checkout(request) {
            Ok(response) => response.into(),
            Err(err) => err.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CheckoutConfig;
    use assert_matches::assert_matches;

    fn local() -> LocalCheckoutGateway {
        LocalCheckoutGateway::new(CheckoutService::from_config(&CheckoutConfig::default()).unwrap())
    }

    #[tokio::test]
    async fn local_gateway_returns_success() {
        let result = local()
            .submit(&CheckoutRequest::new("Widget", 10.0, 3))
            .await
            .unwrap();
        assert_matches!(result, CheckoutResult::Success { order_summary, .. } => {
            assert_eq!(order_summary.total, "30.00");
        });
    }

    #[tokio::test]
    async fn local_gateway_maps_validation_failures() {
        let result = local()
            .submit(&CheckoutRequest::new("Widget", 10.0, 0))
            .await
            .unwrap();
        assert_eq!(
            result,
            CheckoutResult::Failure {
                error_message: "Invalid quantity or price".to_string(),
                status_code: 400,
            }
        );
    }

    #[test]
    fn endpoint_is_rooted_at_api_checkout() {
        let base = Url::parse("http://localhost:3000/shop/").unwrap();
        let gateway = HttpCheckoutGateway::new(&base).unwrap();
        assert_eq!(gateway.endpoint().as_str(), "http://localhost:3000/api/checkout");
    }
}
