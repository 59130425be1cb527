//! Plan change requests
//!
//! Asks the subscription-management function for a checkout session. The
//! payment provider later redirects back with the checkout marker, which is
//! what triggers the loader's delayed re-fetch.

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::{BillingFrequency, PlanCode};

use crate::{ClientConfig, ClientError, ClientResult};

#[derive(Debug, Clone)]
pub struct ChangePlanParams {
    pub target_plan_code: PlanCode,
    pub customer_id: String,
    pub billing_frequency: BillingFrequency,
    pub app_id: Option<String>,
}

impl ChangePlanParams {
    pub fn new(target_plan_code: PlanCode, customer_id: impl Into<String>) -> Self {
        Self {
            target_plan_code,
            customer_id: customer_id.into(),
            billing_frequency: BillingFrequency::default(),
            app_id: None,
        }
    }

    pub fn with_billing_frequency(mut self, frequency: BillingFrequency) -> Self {
        self.billing_frequency = frequency;
        self
    }
}

#[derive(Debug, Serialize)]
struct ChangePlanRequest<'a> {
    action: &'static str,
    target_plan_code: PlanCode,
    billing_frequency: BillingFrequency,
    customer_id: &'a str,
    app_id: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChangePlanResponse {
    pub checkout_url: String,
    pub pending_subscription_id: Option<String>,
}

pub struct PlanChangeClient {
    client: Client,
    endpoint: String,
    app_id: String,
    token: Option<String>,
}

impl PlanChangeClient {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.plan_change_endpoint(),
            app_id: config.app_id.clone(),
            token: config.session_token.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Request a checkout session for moving to a paid plan
    pub async fn change_plan(&self, params: &ChangePlanParams) -> ClientResult<ChangePlanResponse> {
        if !params.target_plan_code.is_paid() {
            return Err(ClientError::Validation(format!(
                "{} is not a paid plan",
                params.target_plan_code
            )));
        }
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| ClientError::Unauthorized("No session, sign in again".into()))?;

        let body = ChangePlanRequest {
            action: "CHANGE",
            target_plan_code: params.target_plan_code,
            billing_frequency: params.billing_frequency,
            customer_id: &params.customer_id,
            app_id: params.app_id.as_deref().unwrap_or(&self.app_id),
        };

        tracing::info!(
            customer_id = %params.customer_id,
            plan = %params.target_plan_code,
            "Requesting plan change"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        let payload: Value = serde_json::from_str(&text).unwrap_or(Value::Null);
        interpret_response(status, &payload)
    }
}

fn str_field(payload: &Value, snake: &str, camel: &str) -> Option<String> {
    payload
        .get(snake)
        .or_else(|| payload.get(camel))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn interpret_response(status: StatusCode, payload: &Value) -> ClientResult<ChangePlanResponse> {
    let pending_subscription_id =
        str_field(payload, "pending_subscription_id", "pendingSubscriptionId");

    if status == StatusCode::CONFLICT {
        return Err(ClientError::PendingChange {
            message: str_field(payload, "error", "error")
                .unwrap_or_else(|| "A plan change is already pending".into()),
            pending_subscription_id,
        });
    }

    if !status.is_success() {
        return Err(ClientError::Internal(
            str_field(payload, "error", "error")
                .unwrap_or_else(|| "Could not start the plan change".into()),
        ));
    }

    let checkout_url = str_field(payload, "checkout_url", "checkoutUrl").ok_or_else(|| {
        ClientError::InvalidResponse("Server response carries no checkout_url".into())
    })?;

    Ok(ChangePlanResponse {
        checkout_url,
        pending_subscription_id,
    })
}
