/*!
 * # Checkout Controller
 *
 * Client-side state machine behind the checkout confirmation dialog:
 *
 * ```text
 * idle --confirm--> loading --Success--> success --(redirect delay)--> idle
 *                          \--Failure--> error --retry--> loading
 * any --dismiss--> idle
 * ```
 *
 * The post-success navigation runs as a spawned task owned by the
 * controller. Dismissing or dropping the controller aborts it, and every
 * transition bumps an epoch so that a timer or gateway call that outlived its
 * dialog cannot act on a newer one.
 */

pub mod dialog;
pub mod gateway;
pub mod storefront;

pub use dialog::{DialogHost, TracingDialogHost};
pub use gateway::{CheckoutGateway, GatewayError, HttpCheckoutGateway, LocalCheckoutGateway};
pub use storefront::{CheckoutDialog, ProductPage};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, info, instrument, warn};

use crate::{
    controller::gateway::GENERIC_FAILURE_MESSAGE,
    models::{CheckoutRequest, CheckoutResult, OrderSummary},
    tracing::ErrorKind,
};

/// Dialog state as rendered by the storefront.
#[derive(Clone, Debug, PartialEq)]
pub enum CheckoutState {
    Idle,
    Loading,
    Success {
        order: OrderSummary,
        redirect_url: String,
        message: String,
    },
    /// Message shown verbatim next to the retry button
    Error(String),
}

impl CheckoutState {
    pub fn is_idle(&self) -> bool {
        matches!(self, CheckoutState::Idle)
    }

    fn accepts_submission(&self) -> bool {
        matches!(self, CheckoutState::Idle | CheckoutState::Error(_))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControllerError {
    #[error("A checkout is already in progress")]
    Busy,

    #[error("Nothing to retry")]
    NothingToRetry,
}

/// Handle on the scheduled redirect; aborts the task when dropped.
struct PendingRedirect {
    handle: Option<JoinHandle<()>>,
}

impl PendingRedirect {
    /// Releases the handle without aborting, for use from inside the task.
    fn disarm(mut self) {
        self.handle.take();
    }
}

impl Drop for PendingRedirect {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[derive(Default)]
struct Inner {
    last_request: Option<CheckoutRequest>,
    pending: Option<PendingRedirect>,
}

struct Shared {
    gateway: Arc<dyn CheckoutGateway>,
    host: Arc<dyn DialogHost>,
    redirect_delay: Duration,
    state: watch::Sender<CheckoutState>,
    epoch: AtomicU64,
    // never held across an await
    inner: Mutex<Inner>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    fn advance_epoch(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Drives one checkout dialog.
pub struct CheckoutController {
    shared: Arc<Shared>,
}

impl CheckoutController {
    pub fn new(
        gateway: Arc<dyn CheckoutGateway>,
        host: Arc<dyn DialogHost>,
        redirect_delay: Duration,
    ) -> Self {
        let (state, _) = watch::channel(CheckoutState::Idle);
        Self {
            shared: Arc::new(Shared {
                gateway,
                host,
                redirect_delay,
                state,
                epoch: AtomicU64::new(0),
                inner: Mutex::new(Inner::default()),
            }),
        }
    }

    pub fn state(&self) -> CheckoutState {
        self.shared.state.borrow().clone()
    }

    /// Receiver that observes every state transition.
    pub fn subscribe(&self) -> watch::Receiver<CheckoutState> {
        self.shared.state.subscribe()
    }

    pub fn has_pending_redirect(&self) -> bool {
        self.shared.lock().pending.is_some()
    }

    /// Submits `request` and waits for the outcome.
    ///
    /// Returns [`ControllerError::Busy`] while a call is in flight or a
    /// success is on display. The returned state is the one reached once the
    /// gateway answered, which is `Idle` if the dialog was dismissed meanwhile.
    ///
    /// The gateway call runs on its own task, so dropping this future does
    /// not leave the controller stuck in `Loading`.
    pub async fn confirm(&self, request: CheckoutRequest) -> Result<CheckoutState, ControllerError> {
        let epoch = {
            let mut inner = self.shared.lock();
            if !self.shared.state.borrow().accepts_submission() {
                return Err(ControllerError::Busy);
            }
            inner.last_request = Some(request.clone());
            let epoch = self.shared.advance_epoch();
            self.shared.state.send_replace(CheckoutState::Loading);
            epoch
        };

        self.submit(epoch, request).await;
        Ok(self.state())
    }

    /// Re-submits the last request. Only valid from the error state.
    pub async fn retry(&self) -> Result<CheckoutState, ControllerError> {
        let (epoch, request) = {
            let inner = self.shared.lock();
            if !matches!(*self.shared.state.borrow(), CheckoutState::Error(_)) {
                return Err(ControllerError::NothingToRetry);
            }
            let request = inner
                .last_request
                .clone()
                .ok_or(ControllerError::NothingToRetry)?;
            let epoch = self.shared.advance_epoch();
            self.shared.state.send_replace(CheckoutState::Loading);
            (epoch, request)
        };

        self.submit(epoch, request).await;
        Ok(self.state())
    }

    /// Returns to idle from any state, cancelling a scheduled redirect and
    /// discarding the outcome of any call still in flight.
    pub fn dismiss(&self) {
        let mut inner = self.shared.lock();
        self.shared.advance_epoch();
        inner.last_request = None;
        inner.pending.take();
        self.shared.state.send_replace(CheckoutState::Idle);
        debug!("Checkout dismissed");
    }

    async fn submit(&self, epoch: u64, request: CheckoutRequest) {
        let task = tokio::spawn(run(Arc::clone(&self.shared), epoch, request));
        if let Err(err) = task.await {
            crate::tracing::log_error(&err, ErrorKind::Internal, Some("checkout task"));
            let _inner = self.shared.lock();
            if self.shared.current_epoch() == epoch {
                self.shared
                    .state
                    .send_replace(CheckoutState::Error(GENERIC_FAILURE_MESSAGE.to_string()));
            }
        }
    }
}

#[instrument(skip(shared, request), fields(product = %request.product_name, quantity = request.quantity))]
async fn run(shared: Arc<Shared>, epoch: u64, request: CheckoutRequest) {
    let outcome = shared.gateway.submit(&request).await;

    let mut inner = shared.lock();
    if shared.current_epoch() != epoch {
        debug!("Discarding checkout outcome for a dismissed dialog");
        return;
    }

    match outcome {
        Ok(CheckoutResult::Success {
            order_summary,
            redirect_url,
            message,
        }) => {
            info!(order_id = %order_summary.order_id, "Checkout succeeded");
            let handle = schedule_redirect(&shared, epoch, redirect_url.clone());
            inner.pending = Some(PendingRedirect {
                handle: Some(handle),
            });
            shared.state.send_replace(CheckoutState::Success {
                order: order_summary,
                redirect_url,
                message,
            });
        }
        Ok(CheckoutResult::Failure {
            error_message,
            status_code,
        }) => {
            warn!(status_code, error = %error_message, "Checkout failed");
            shared
                .state
                .send_replace(CheckoutState::Error(error_message));
        }
        Err(err) => {
            crate::tracing::log_error(&err, ErrorKind::External, Some("checkout gateway"));
            shared.state.send_replace(CheckoutState::Error(err.to_string()));
        }
    }
}

fn schedule_redirect(shared: &Arc<Shared>, epoch: u64, url: String) -> JoinHandle<()> {
    let shared = Arc::clone(shared);
    tokio::spawn(async move {
        tokio::time::sleep(shared.redirect_delay).await;

        let mut inner = shared.lock();
        if shared.current_epoch() != epoch {
            return;
        }
        if let Some(pending) = inner.pending.take() {
            pending.disarm();
        }
        shared.host.open_external(&url);
        shared.host.close();
        inner.last_request = None;
        shared.advance_epoch();
        shared.state.send_replace(CheckoutState::Idle);
        debug!(url = %url, "Redirected to marketplace");
    })
}

impl Drop for CheckoutController {
    fn drop(&mut self) {
        self.shared.advance_epoch();
        self.shared.lock().pending.take();
    }
}
