//! Shared types for the Debacu subscription view
//!
//! Domain models, raw backend row types, value coercion helpers and the
//! backend-agnostic `Query` description. No I/O lives here.

pub mod coerce;
pub mod models;
pub mod query;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use models::{
    AvailablePlan, BankData, BillingFrequency, CustomerProfile, CustomerRow, Invoice,
    InvoiceStatus, PlanCatalog, PlanCode, PlanMetadata, PlanRow, ReceiptRow, SubscriptionRow,
    SubscriptionUiState,
};
pub use query::{Filter, Query, SortDirection};
