//! Subscription Model
//!
//! Subscription rows, current-subscription selection and the paywall view
//! state derived from them.

use serde::{Deserialize, Serialize};

use super::plan::PlanRow;

/// Status priority when several subscriptions exist for one customer
pub const STATUS_PRIORITY: [&str; 3] = ["ACTIVE", "PENDING_PAYMENT", "SUSPENDED"];

/// Statuses that put the customer behind the paywall
pub const PAYWALL_STATUSES: [&str; 2] = ["PENDING_PAYMENT", "SUSPENDED"];

/// Status of a subscription superseded by a plan change
pub const REPLACED_STATUS: &str = "REPLACED";

/// How many recent subscriptions are considered
pub const SUBSCRIPTION_HISTORY_LIMIT: u32 = 25;

/// Display name used when the plan row carries neither name nor code
pub const DEFAULT_PLAN_DISPLAY_NAME: &str = "Plan activo";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingFrequency {
    #[default]
    Monthly,
    Yearly,
    FreeTrial,
}

/// Raw `subscriptions` row
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscriptionRow {
    pub id: String,
    pub customer_id: String,
    pub app_id: String,
    pub plan_id: Option<String>,
    pub billing_frequency: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub next_billing_date: Option<String>,
    pub status: Option<String>,
    pub created_at: Option<String>,
}

impl SubscriptionRow {
    fn has_status(&self, status: &str) -> bool {
        self.status.as_deref() == Some(status)
    }

    fn is_replaced(&self) -> bool {
        self.has_status(REPLACED_STATUS)
    }
}

/// Pick the subscription that represents the customer's current state.
///
/// `rows` are expected newest first. Priority statuses win in order; replaced
/// rows only count when nothing else exists.
pub fn resolve_current_subscription(rows: &[SubscriptionRow]) -> Option<&SubscriptionRow> {
    let has_live = rows.iter().any(|row| !row.is_replaced());

    for status in STATUS_PRIORITY {
        if let Some(candidate) = rows.iter().find(|row| row.has_status(status)) {
            return Some(candidate);
        }
    }

    if has_live {
        return rows.iter().find(|row| !row.is_replaced());
    }

    rows.first()
}

pub fn is_paywalled_status(status: Option<&str>) -> bool {
    status.is_some_and(|s| PAYWALL_STATUSES.contains(&s))
}

/// Subscription summary shown next to the plan cards
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionUiState {
    pub subscription: Option<SubscriptionRow>,
    pub plan: Option<PlanRow>,
    pub plan_display_name: String,
    pub plan_code: Option<String>,
    pub limits_max_queries_per_month: Option<i64>,
    pub next_billing_date: Option<String>,
    pub status: Option<String>,
    pub is_paywalled: bool,
}

impl SubscriptionUiState {
    pub fn build(subscription: Option<SubscriptionRow>, plan: Option<PlanRow>) -> Self {
        let plan_display_name = plan
            .as_ref()
            .and_then(|p| p.name().or_else(|| p.code()))
            .unwrap_or_else(|| DEFAULT_PLAN_DISPLAY_NAME.to_string());
        let plan_code = plan.as_ref().and_then(PlanRow::code).map(|c| c.to_uppercase());
        let limits_max_queries_per_month = plan.as_ref().and_then(PlanRow::max_queries);
        let status = subscription.as_ref().and_then(|s| s.status.clone());
        let next_billing_date = subscription
            .as_ref()
            .and_then(|s| s.next_billing_date.clone());
        let is_paywalled = is_paywalled_status(status.as_deref());

        Self {
            subscription,
            plan,
            plan_display_name,
            plan_code,
            limits_max_queries_per_month,
            next_billing_date,
            status,
            is_paywalled,
        }
    }
}
