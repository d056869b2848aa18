use tracing::info;

/// The surface that owns a checkout dialog.
///
/// Called from the controller's redirect task; implementations must not call
/// back into the controller.
pub trait DialogHost: Send + Sync {
    /// Open `url` outside the storefront, typically in a new tab.
    fn open_external(&self, url: &str);

    /// Close the checkout dialog.
    fn close(&self);
}

/// Host for headless use: records navigation in the log only.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingDialogHost;

impl DialogHost for TracingDialogHost {
    fn open_external(&self, url: &str) {
        info!(url, "Opening marketplace");
    }

    fn close(&self) {
        info!("Checkout dialog closed");
    }
}
