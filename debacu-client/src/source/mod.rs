//! Data access layer
//!
//! A `DataSource` answers table reads described by [`Query`]. The REST
//! implementation talks to the hosted backend; the in-memory one backs tests
//! and offline runs.

mod memory;
mod rest;

pub use memory::MemoryDataSource;
pub use rest::RestDataSource;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::Query;

use crate::{ClientError, ClientResult};

/// Data source trait
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Run a read and return the raw rows
    async fn fetch(&self, query: &Query) -> ClientResult<Vec<Value>>;
}

/// Run a list read and deserialize every row
pub async fn fetch_rows<T: DeserializeOwned>(
    source: &dyn DataSource,
    query: &Query,
) -> ClientResult<Vec<T>> {
    source
        .fetch(query)
        .await?
        .into_iter()
        .map(|row| serde_json::from_value(row).map_err(ClientError::from))
        .collect()
}

/// Run a point lookup: zero rows is `None`, more than one is an error
pub async fn fetch_one<T: DeserializeOwned>(
    source: &dyn DataSource,
    query: &Query,
) -> ClientResult<Option<T>> {
    let mut rows = source.fetch(query).await?;
    match rows.len() {
        0 => Ok(None),
        1 => Ok(Some(serde_json::from_value(rows.remove(0))?)),
        n => Err(ClientError::InvalidResponse(format!(
            "{} rows returned for single-row lookup on {}",
            n, query.table
        ))),
    }
}
