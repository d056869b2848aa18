use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::{CheckoutController, CheckoutGateway, CheckoutState, ControllerError, DialogHost};
use crate::{
    config::CheckoutConfig,
    errors::ServiceError,
    models::{CheckoutRequest, Product},
    services::{format_amount, order_total},
};

/// Tracks whether the dialog is open so the redirect can close it.
struct PageDialogHost {
    inner: Arc<dyn DialogHost>,
    open: Arc<AtomicBool>,
}

impl DialogHost for PageDialogHost {
    fn open_external(&self, url: &str) {
        self.inner.open_external(url);
    }

    fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
        self.inner.close();
    }
}

/// An open checkout dialog for a fixed order.
pub struct CheckoutDialog {
    controller: CheckoutController,
    request: CheckoutRequest,
}

impl CheckoutDialog {
    pub fn request(&self) -> &CheckoutRequest {
        &self.request
    }

    pub fn controller(&self) -> &CheckoutController {
        &self.controller
    }

    pub fn state(&self) -> CheckoutState {
        self.controller.state()
    }

    /// Total shown before confirmation, formatted like the server's.
    pub fn preview_total(&self) -> Result<String, ServiceError> {
        order_total(self.request.price, self.request.quantity).map(format_amount)
    }

    pub async fn confirm(&self) -> Result<CheckoutState, ControllerError> {
        self.controller.confirm(self.request.clone()).await
    }

    pub async fn retry(&self) -> Result<CheckoutState, ControllerError> {
        self.controller.retry().await
    }

    pub fn dismiss(&self) {
        self.controller.dismiss();
    }
}

/// Client-side state of the product page.
pub struct ProductPage {
    product: Product,
    quantity: u32,
    gateway: Arc<dyn CheckoutGateway>,
    host: Arc<dyn DialogHost>,
    redirect_delay: Duration,
    dialog: Option<CheckoutDialog>,
    dialog_open: Arc<AtomicBool>,
}

impl ProductPage {
    pub fn new(
        product: Product,
        gateway: Arc<dyn CheckoutGateway>,
        host: Arc<dyn DialogHost>,
    ) -> Self {
        Self::from_config(product, &CheckoutConfig::default(), gateway, host)
    }

    /// Page whose dialogs wait `config.redirect_delay()` before navigating.
    pub fn from_config(
        product: Product,
        config: &CheckoutConfig,
        gateway: Arc<dyn CheckoutGateway>,
        host: Arc<dyn DialogHost>,
    ) -> Self {
        Self {
            product,
            quantity: 1,
            gateway,
            host,
            redirect_delay: config.redirect_delay(),
            dialog: None,
            dialog_open: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_redirect_delay(mut self, delay: Duration) -> Self {
        self.redirect_delay = delay;
        self
    }

    pub fn product(&self) -> &Product {
        &self.product
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn increment(&mut self) {
        self.quantity = self.quantity.saturating_add(1);
    }

    /// Never goes below one.
    pub fn decrement(&mut self) {
        self.quantity = self.quantity.saturating_sub(1).max(1);
    }

    pub fn preview_total(&self) -> Result<String, ServiceError> {
        order_total(self.product.price, self.quantity).map(format_amount)
    }

    /// Opens a dialog for the current quantity, replacing any previous one.
    pub fn open_checkout(&mut self) -> &CheckoutDialog {
        let host = Arc::new(PageDialogHost {
            inner: Arc::clone(&self.host),
            open: Arc::clone(&self.dialog_open),
        });
        let controller =
            CheckoutController::new(Arc::clone(&self.gateway), host, self.redirect_delay);
        let request = CheckoutRequest::new(self.product.name.clone(), self.product.price, self.quantity);

        self.dialog_open.store(true, Ordering::SeqCst);
        self.dialog.insert(CheckoutDialog {
            controller,
            request,
        })
    }

    pub fn is_checkout_open(&self) -> bool {
        self.dialog_open.load(Ordering::SeqCst)
    }

    pub fn checkout_dialog(&self) -> Option<&CheckoutDialog> {
        self.dialog.as_ref().filter(|_| self.is_checkout_open())
    }

    pub fn close_checkout(&mut self) {
        if let Some(dialog) = self.dialog.take() {
            dialog.dismiss();
        }
        self.dialog_open.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_REDIRECT_DELAY_MS;
    use crate::controller::{LocalCheckoutGateway, TracingDialogHost};
    use crate::services::CheckoutService;

    fn page() -> ProductPage {
        let service = CheckoutService::from_config(&CheckoutConfig::default()).unwrap();
        ProductPage::new(
            Product::showcase(),
            Arc::new(LocalCheckoutGateway::new(service)),
            Arc::new(TracingDialogHost),
        )
    }

    #[test]
    fn quantity_clamps_at_one() {
        let mut page = page();
        assert_eq!(page.quantity(), 1);
        page.decrement();
        assert_eq!(page.quantity(), 1);
        page.increment();
        page.increment();
        assert_eq!(page.quantity(), 3);
        page.decrement();
        assert_eq!(page.quantity(), 2);
    }

    #[test]
    fn preview_total_tracks_quantity() {
        let mut page = page();
        assert_eq!(page.preview_total().unwrap(), "899.99");
        page.increment();
        page.increment();
        assert_eq!(page.preview_total().unwrap(), "2699.97");
    }

    #[tokio::test(start_paused = true)]
    async fn redirect_closes_the_dialog() {
        let mut page = page();
        page.increment();

        let dialog = page.open_checkout();
        assert_eq!(dialog.request().quantity, 2);
        assert_eq!(dialog.preview_total().unwrap(), "1799.98");
        let state = dialog.confirm().await.unwrap();
        assert!(matches!(state, CheckoutState::Success { ref order, .. } if order.total == "1799.98"));
        assert!(page.is_checkout_open());

        tokio::time::sleep(Duration::from_millis(DEFAULT_REDIRECT_DELAY_MS + 1)).await;
        assert!(!page.is_checkout_open());
        assert!(page.checkout_dialog().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn configured_redirect_delay_is_used() {
        let config = CheckoutConfig {
            redirect_delay_ms: 500,
            ..CheckoutConfig::default()
        };
        let service = CheckoutService::from_config(&config).unwrap();
        let mut page = ProductPage::from_config(
            Product::showcase(),
            &config,
            Arc::new(LocalCheckoutGateway::new(service)),
            Arc::new(TracingDialogHost),
        );

        page.open_checkout().confirm().await.unwrap();
        tokio::time::sleep(Duration::from_millis(499)).await;
        assert!(page.is_checkout_open());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(!page.is_checkout_open());
    }

    #[tokio::test(start_paused = true)]
    async fn closing_dismisses_the_controller() {
        let mut page = page();
        page.open_checkout().confirm().await.unwrap();

        let mut states = page
            .checkout_dialog()
            .map(|d| d.controller().subscribe())
            .unwrap();
        page.close_checkout();

        assert!(!page.is_checkout_open());
        assert!(states.borrow_and_update().is_idle());
    }
}
