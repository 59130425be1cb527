//! Debacu Client - subscription view data for the Debacu evaluation portal
//!
//! Loads the customer profile, recent receipts and the plan catalog into a
//! shared view state, with checkout-redirect re-fetching and per-activation
//! cancellation.

pub mod config;
pub mod error;
pub mod loader;
pub mod location;
pub mod plan_change;
pub mod source;
pub mod status;
pub mod view;

pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use loader::{Activation, DEFAULT_LOAD_ERROR, SubscriptionController, SubscriptionDataLoader};
pub use location::{NavigationContext, UrlLocation};
pub use plan_change::{ChangePlanParams, ChangePlanResponse, PlanChangeClient};
pub use source::{DataSource, MemoryDataSource, RestDataSource};
pub use status::SubscriptionStatusLoader;
pub use view::{SubscriptionView, ViewState};

// Re-export shared types for convenience
pub use shared::{AvailablePlan, BankData, CustomerProfile, Invoice, InvoiceStatus, PlanCatalog, PlanCode};
