//! Current subscription status
//!
//! Resolves which subscription row represents the customer right now and
//! derives the paywall summary shown alongside the plan cards.

use std::sync::Arc;

use shared::models::subscription::{SUBSCRIPTION_HISTORY_LIMIT, resolve_current_subscription};
use shared::{PlanRow, Query, SortDirection, SubscriptionRow, SubscriptionUiState};

use crate::source::{DataSource, fetch_one, fetch_rows};
use crate::{ClientConfig, ClientResult};

pub struct SubscriptionStatusLoader {
    source: Arc<dyn DataSource>,
    app_id: String,
}

impl SubscriptionStatusLoader {
    pub fn new(source: Arc<dyn DataSource>, config: &ClientConfig) -> Self {
        Self {
            source,
            app_id: config.app_id.clone(),
        }
    }

    /// Newest subscriptions of `customer_id` for this app
    pub async fn subscriptions(&self, customer_id: &str) -> ClientResult<Vec<SubscriptionRow>> {
        let query = Query::table("subscriptions")
            .eq("customer_id", customer_id)
            .eq("app_id", self.app_id.as_str())
            .order_by("created_at", SortDirection::Desc)
            .limit(SUBSCRIPTION_HISTORY_LIMIT);
        fetch_rows(self.source.as_ref(), &query).await
    }

    /// Subscription representing the customer right now.
    ///
    /// A failed read is logged and reported as "no subscription".
    pub async fn current_subscription(&self, customer_id: &str) -> Option<SubscriptionRow> {
        match self.subscriptions(customer_id).await {
            Ok(rows) => resolve_current_subscription(&rows).cloned(),
            Err(e) => {
                tracing::warn!(customer_id, "Subscription lookup failed: {e}");
                None
            }
        }
    }

    pub async fn plan_by_id(&self, plan_id: &str) -> ClientResult<Option<PlanRow>> {
        let query = Query::table("plans").eq("id", plan_id).maybe_single();
        fetch_one(self.source.as_ref(), &query).await
    }

    /// Build the status summary.
    ///
    /// Lookups degrade instead of failing: a failed subscription read gives
    /// "no subscription", a failed plan read gives "no plan".
    pub async fn build(&self, customer_id: &str) -> SubscriptionUiState {
        let subscription = self.current_subscription(customer_id).await;

        let plan = match subscription.as_ref().and_then(|s| s.plan_id.as_deref()) {
            Some(plan_id) => match self.plan_by_id(plan_id).await {
                Ok(plan) => plan,
                Err(e) => {
                    tracing::debug!(plan_id, "Plan lookup failed: {e}");
                    None
                }
            },
            None => None,
        };

        SubscriptionUiState::build(subscription, plan)
    }
}
