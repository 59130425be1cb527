//! Activation scope and identity-change trigger

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::SubscriptionDataLoader;
use crate::location::NavigationContext;
use crate::view::SubscriptionView;

/// One activation of the loader for a single customer id.
///
/// Owns the cancellation token shared by the immediate load and the
/// scheduled checkout re-fetch. Cancelling (or dropping) the activation turns
/// every pending load into a no-op.
pub struct Activation {
    customer_id: Option<String>,
    cancel: CancellationToken,
    view: SubscriptionView,
    tasks: Vec<JoinHandle<()>>,
    retry_scheduled: bool,
}

impl Activation {
    pub(super) fn new(
        customer_id: Option<String>,
        cancel: CancellationToken,
        view: SubscriptionView,
        tasks: Vec<JoinHandle<()>>,
        retry_scheduled: bool,
    ) -> Self {
        Self {
            customer_id,
            cancel,
            view,
            tasks,
            retry_scheduled,
        }
    }

    pub fn customer_id(&self) -> Option<&str> {
        self.customer_id.as_deref()
    }

    /// Whether a checkout re-fetch was scheduled
    pub fn retry_scheduled(&self) -> bool {
        self.retry_scheduled
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Supersede this activation.
    ///
    /// Taken under the view lock so an in-progress merge either completes
    /// before the cancel or never happens.
    pub fn cancel(&self) {
        let _state = self.view.lock();
        self.cancel.cancel();
    }

    /// Wait for the immediate load and any scheduled re-fetch to finish
    pub async fn settled(&mut self) {
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                tracing::error!("Subscription load task failed: {e}");
            }
        }
    }
}

impl Drop for Activation {
    fn drop(&mut self) {
        if !self.cancel.is_cancelled() {
            self.cancel();
        }
    }
}

/// Re-activates the loader whenever the customer id changes
pub struct SubscriptionController<L: NavigationContext> {
    loader: SubscriptionDataLoader,
    location: L,
    current: Option<Activation>,
}

impl<L: NavigationContext> SubscriptionController<L> {
    pub fn new(loader: SubscriptionDataLoader, location: L) -> Self {
        Self {
            loader,
            location,
            current: None,
        }
    }

    /// Point the view at `customer_id`.
    ///
    /// The same id as the current activation is a no-op; anything else
    /// cancels the current activation and starts a new one.
    pub fn set_customer(&mut self, customer_id: Option<&str>) {
        let customer_id = customer_id.filter(|id| !id.is_empty());
        if let Some(current) = &self.current {
            if current.customer_id() == customer_id {
                return;
            }
        }

        if let Some(previous) = self.current.take() {
            tracing::info!(
                from = previous.customer_id().unwrap_or("-"),
                to = customer_id.unwrap_or("-"),
                "Customer changed, cancelling previous load"
            );
            previous.cancel();
        }

        self.current = Some(self.loader.activate(customer_id, &mut self.location));
    }

    /// Cancel the current activation, if any
    pub fn teardown(&mut self) {
        if let Some(current) = self.current.take() {
            current.cancel();
        }
    }

    pub fn activation(&self) -> Option<&Activation> {
        self.current.as_ref()
    }

    pub fn activation_mut(&mut self) -> Option<&mut Activation> {
        self.current.as_mut()
    }

    pub fn location(&self) -> &L {
        &self.location
    }

    pub fn view(&self) -> &SubscriptionView {
        self.loader.view()
    }
}
