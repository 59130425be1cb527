//! Client configuration

use std::time::Duration;

use crate::{ClientError, ClientResult};

/// Application id the plan catalog and subscriptions are scoped to
pub const DEFAULT_APP_ID: &str = "DEBACU_EVAL";

/// URL parameter the payment provider appends when redirecting back
pub const CHECKOUT_MARKER_PARAM: &str = "session_id";

/// Delay before the post-checkout re-fetch
pub const DEFAULT_CHECKOUT_RETRY_DELAY_MS: u64 = 2500;

/// Edge function handling plan changes
pub const PLAN_CHANGE_FUNCTION: &str = "debacu_eval_subscription_manage";

/// Configuration for talking to the hosted backend and driving the loader
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend project URL (e.g., "https://xyz.supabase.co")
    pub base_url: String,

    /// Public API key sent as `apikey` and default bearer token
    pub api_key: Option<String>,

    /// Signed-in user's session token (overrides the API key as bearer)
    pub session_token: Option<String>,

    /// Edge functions base URL
    pub functions_url: String,

    /// Application id for plans and subscriptions
    pub app_id: String,

    /// Request timeout in seconds
    pub timeout: u64,

    /// Delay before the second load after a checkout redirect
    pub checkout_retry_delay: Duration,

    /// Marker parameter that signals a checkout redirect
    pub checkout_marker: String,
}

impl ClientConfig {
    /// Create a configuration with defaults for everything but the URL
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let functions_url = derive_functions_url(&base_url);
        Self {
            base_url,
            api_key: None,
            session_token: None,
            functions_url,
            app_id: DEFAULT_APP_ID.to_string(),
            timeout: 30,
            checkout_retry_delay: Duration::from_millis(DEFAULT_CHECKOUT_RETRY_DELAY_MS),
            checkout_marker: CHECKOUT_MARKER_PARAM.to_string(),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    pub fn with_functions_url(mut self, url: impl Into<String>) -> Self {
        self.functions_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = app_id.into();
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = seconds;
        self
    }

    pub fn with_checkout_retry_delay(mut self, delay: Duration) -> Self {
        self.checkout_retry_delay = delay;
        self
    }

    /// Full URL of the plan-change function
    pub fn plan_change_endpoint(&self) -> String {
        format!("{}/functions/v1/{}", self.functions_url, PLAN_CHANGE_FUNCTION)
    }

    /// Load configuration from environment variables
    ///
    /// `SUPABASE_URL` is required; everything else has a default.
    pub fn from_env() -> ClientResult<Self> {
        let base_url = std::env::var("SUPABASE_URL")
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ClientError::Config("SUPABASE_URL must be set".into()))?;

        let mut config = Self::new(base_url);
        config.api_key = std::env::var("SUPABASE_ANON_KEY")
            .ok()
            .filter(|s| !s.is_empty());
        config.session_token = std::env::var("DEBACU_SESSION_TOKEN")
            .ok()
            .filter(|s| !s.is_empty());
        if let Some(url) = std::env::var("FUNCTIONS_URL").ok().filter(|s| !s.is_empty()) {
            config = config.with_functions_url(url);
        }
        if let Ok(app_id) = std::env::var("DEBACU_APP_ID") {
            if !app_id.is_empty() {
                config.app_id = app_id;
            }
        }
        config.timeout = std::env::var("REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(config.timeout);
        config.checkout_retry_delay = std::env::var("CHECKOUT_RETRY_DELAY_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(config.checkout_retry_delay);

        Ok(config)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("http://localhost:54321")
    }
}

/// `https://<ref>.supabase.co` serves functions from `https://<ref>.functions.supabase.co`
fn derive_functions_url(base_url: &str) -> String {
    base_url.replace(".supabase.co", ".functions.supabase.co")
}
