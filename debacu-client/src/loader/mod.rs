//! Subscription data loader
//!
//! Fans out three reads (customer, receipts, plan catalog), waits for all of
//! them, and merges the results into the [`SubscriptionView`]. Every write is
//! gated by the activation's cancellation token, checked while holding the
//! view lock, so a superseded load never touches state.

mod activation;

pub use activation::{Activation, SubscriptionController};

use std::sync::Arc;
use std::time::Duration;

use shared::models::customer::CUSTOMER_COLUMNS;
use shared::models::invoice::{MAX_RECENT_INVOICES, RECEIPT_COLUMNS, recent_invoices};
use shared::models::plan::PLAN_COLUMNS;
use shared::{BankData, CustomerRow, PlanCatalog, PlanRow, Query, ReceiptRow, SortDirection};
use tokio_util::sync::CancellationToken;

use crate::location::NavigationContext;
use crate::source::{DataSource, fetch_one, fetch_rows};
use crate::view::{SubscriptionView, ViewState};
use crate::{ClientConfig, ClientError, ClientResult};

/// Message shown when a failed load carries no message of its own
pub const DEFAULT_LOAD_ERROR: &str = "Error cargando datos de plan.";

/// Results of one fan-out, applied to the view in a single step
#[derive(Debug)]
struct Fetched {
    customer: Option<CustomerRow>,
    receipts: Vec<ReceiptRow>,
    plans: Vec<PlanRow>,
}

impl Fetched {
    fn apply(&self, state: &mut ViewState, catalog: &PlanCatalog) {
        if let Some(row) = &self.customer {
            state.profile.merge_from(row);
            state.bank = BankData::from_row(row);
        }
        state.invoices = recent_invoices(&self.receipts);
        state.plans = catalog.available_plans(&self.plans);
    }
}

/// Clears the loading flag when a load ends, however it ends, unless the
/// activation was cancelled in the meantime.
struct LoadingRelease<'a> {
    view: &'a SubscriptionView,
    cancel: &'a CancellationToken,
}

impl Drop for LoadingRelease<'_> {
    fn drop(&mut self) {
        let mut state = self.view.lock();
        if !self.cancel.is_cancelled() {
            state.loading = false;
        }
    }
}

/// Loads customer, billing and plan data into a subscription view
#[derive(Clone)]
pub struct SubscriptionDataLoader {
    source: Arc<dyn DataSource>,
    view: SubscriptionView,
    catalog: Arc<PlanCatalog>,
    app_id: String,
    retry_delay: Duration,
    checkout_marker: String,
}

impl SubscriptionDataLoader {
    pub fn new(source: Arc<dyn DataSource>, view: SubscriptionView, config: &ClientConfig) -> Self {
        Self {
            source,
            view,
            catalog: Arc::new(PlanCatalog::default()),
            app_id: config.app_id.clone(),
            retry_delay: config.checkout_retry_delay,
            checkout_marker: config.checkout_marker.clone(),
        }
    }

    /// Replace the plan sequence and fallback metadata
    pub fn with_catalog(mut self, catalog: PlanCatalog) -> Self {
        self.catalog = Arc::new(catalog);
        self
    }

    pub fn view(&self) -> &SubscriptionView {
        &self.view
    }

    pub fn catalog(&self) -> &PlanCatalog {
        &self.catalog
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    fn customer_query(customer_id: &str) -> Query {
        Query::table("customers")
            .select(CUSTOMER_COLUMNS)
            .eq("id", customer_id)
            .maybe_single()
    }

    fn receipts_query(customer_id: &str) -> Query {
        Query::table("receipts")
            .select(RECEIPT_COLUMNS)
            .eq("customer_id", customer_id)
            .order_by("date", SortDirection::Desc)
            .limit(MAX_RECENT_INVOICES as u32)
    }

    fn plans_query(&self) -> Query {
        Query::table("plans")
            .select(PLAN_COLUMNS)
            .eq("app_id", self.app_id.as_str())
            .in_list("code", self.catalog.codes())
    }

    /// Issue the three reads together and wait for all of them
    async fn fetch_all(&self, customer_id: &str) -> ClientResult<Fetched> {
        let source = self.source.as_ref();
        let customer_query = Self::customer_query(customer_id);
        let receipts_query = Self::receipts_query(customer_id);
        let plans_query = self.plans_query();

        let (customer, receipts, plans) = tokio::join!(
            fetch_one::<CustomerRow>(source, &customer_query),
            fetch_rows::<ReceiptRow>(source, &receipts_query),
            fetch_rows::<PlanRow>(source, &plans_query),
        );

        Ok(Fetched {
            customer: customer?,
            receipts: receipts?,
            plans: plans?,
        })
    }

    /// Run one load cycle for `customer_id`.
    ///
    /// Effects land in the view: on success the merged data, on failure only
    /// the error message. Nothing is written once `cancel` has fired.
    pub async fn load(&self, customer_id: &str, cancel: &CancellationToken) {
        {
            let mut state = self.view.lock();
            if cancel.is_cancelled() {
                return;
            }
            state.loading = true;
            state.error = None;
        }
        let _release = LoadingRelease {
            view: &self.view,
            cancel,
        };

        tracing::debug!(customer_id, "Loading subscription data");
        let result = self.fetch_all(customer_id).await;

        let mut state = self.view.lock();
        if cancel.is_cancelled() {
            tracing::debug!(customer_id, "Load superseded, discarding results");
            return;
        }

        match result {
            Ok(fetched) => {
                fetched.apply(&mut state, &self.catalog);
                tracing::debug!(
                    customer_id,
                    invoices = state.invoices.len(),
                    plans = state.plans.len(),
                    "Subscription data merged"
                );
            }
            Err(e) => {
                tracing::error!(customer_id, "Error loading plan data: {e}");
                state.error = Some(error_message(&e));
            }
        }
    }

    /// Start an activation for `customer_id`.
    ///
    /// An absent or empty id clears the loading flag and fetches nothing.
    /// When `location` carries the checkout marker, the marker is stripped
    /// and a second load is scheduled after the retry delay. Must be called
    /// from within a tokio runtime.
    pub fn activate(
        &self,
        customer_id: Option<&str>,
        location: &mut dyn NavigationContext,
    ) -> Activation {
        let cancel = CancellationToken::new();

        let Some(customer_id) = customer_id.filter(|id| !id.is_empty()) else {
            self.view.set_loading(false);
            return Activation::new(None, cancel, self.view.clone(), Vec::new(), false);
        };

        let from_checkout = location.has_param(&self.checkout_marker);
        if from_checkout {
            location.remove_param(&self.checkout_marker);
            tracing::info!(
                customer_id,
                delay_ms = self.retry_delay.as_millis() as u64,
                "Returned from checkout, scheduling re-fetch"
            );
        }

        let mut tasks = Vec::with_capacity(2);

        let loader = self.clone();
        let id = customer_id.to_string();
        let token = cancel.clone();
        tasks.push(tokio::spawn(async move {
            loader.load(&id, &token).await;
        }));

        if from_checkout {
            let loader = self.clone();
            let id = customer_id.to_string();
            let token = cancel.clone();
            let delay = self.retry_delay;
            tasks.push(tokio::spawn(async move {
                tokio::select! {
                    _ = token.cancelled() => {
                        tracing::debug!(customer_id = %id, "Checkout re-fetch dropped");
                    }
                    _ = tokio::time::sleep(delay) => {
                        loader.load(&id, &token).await;
                    }
                }
            }));
        }

        Activation::new(
            Some(customer_id.to_string()),
            cancel,
            self.view.clone(),
            tasks,
            from_checkout,
        )
    }
}

fn error_message(err: &ClientError) -> String {
    let message = err.to_string();
    if message.trim().is_empty() {
        DEFAULT_LOAD_ERROR.to_string()
    } else {
        message
    }
}
