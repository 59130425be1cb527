//! Data models
//!
//! View-facing entities plus the raw row shapes the backend returns.
//! Row types are lenient: every column is optional and numeric columns are
//! kept as raw JSON until coerced.

pub mod customer;
pub mod invoice;
pub mod plan;
pub mod subscription;

// Re-exports
pub use customer::*;
pub use invoice::*;
pub use plan::*;
pub use subscription::*;
