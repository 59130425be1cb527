//! In-memory data source
//!
//! Tables of JSON rows with the same filter/order/limit semantics the REST
//! backend applies. Tables can be swapped, failed or slowed down at runtime,
//! which is what the loader tests lean on.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use shared::{Filter, Query, SortDirection};

use super::DataSource;
use crate::{ClientError, ClientResult};

#[derive(Debug, Default)]
pub struct MemoryDataSource {
    tables: RwLock<HashMap<String, Vec<Value>>>,
    failures: RwLock<HashMap<String, String>>,
    latency: RwLock<Option<Duration>>,
    fetch_counts: Mutex<HashMap<String, usize>>,
}

impl MemoryDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`set_table`](Self::set_table)
    pub fn with_table(self, table: impl Into<String>, rows: Vec<Value>) -> Self {
        self.set_table(table, rows);
        self
    }

    /// Replace every row of `table`
    pub fn set_table(&self, table: impl Into<String>, rows: Vec<Value>) {
        self.tables.write().insert(table.into(), rows);
    }

    /// Make every read of `table` fail with `message`
    pub fn fail_table(&self, table: impl Into<String>, message: impl Into<String>) {
        self.failures.write().insert(table.into(), message.into());
    }

    pub fn clear_failure(&self, table: &str) {
        self.failures.write().remove(table);
    }

    /// Delay every read by `latency`
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.write() = latency;
    }

    /// Number of reads issued against `table`
    pub fn fetch_count(&self, table: &str) -> usize {
        self.fetch_counts.lock().get(table).copied().unwrap_or(0)
    }

    fn run(&self, query: &Query) -> ClientResult<Vec<Value>> {
        if let Some(message) = self.failures.read().get(&query.table) {
            return Err(ClientError::Internal(message.clone()));
        }

        let tables = self.tables.read();
        let mut rows: Vec<&Value> = tables
            .get(&query.table)
            .map(|rows| rows.iter().collect())
            .unwrap_or_default();

        rows.retain(|row| query.filters.iter().all(|f| matches_filter(row, f)));

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                compare_cells(a.get(&order.column), b.get(&order.column), order.direction)
            });
        }

        if let Some(limit) = query.limit {
            rows.truncate(limit as usize);
        }

        Ok(rows
            .into_iter()
            .map(|row| project(row, &query.columns))
            .collect())
    }
}

#[async_trait]
impl DataSource for MemoryDataSource {
    async fn fetch(&self, query: &Query) -> ClientResult<Vec<Value>> {
        *self
            .fetch_counts
            .lock()
            .entry(query.table.clone())
            .or_insert(0) += 1;

        let latency = *self.latency.read();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        self.run(query)
    }
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn matches_filter(row: &Value, filter: &Filter) -> bool {
    let cell = row.get(filter.column()).and_then(value_text);
    match filter {
        Filter::Eq { value, .. } => cell.as_deref() == Some(value.as_str()),
        Filter::In { values, .. } => cell.is_some_and(|c| values.contains(&c)),
    }
}

/// Mixed-type cells order by type first so the comparison stays total
fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .unwrap_or(0.0)
            .total_cmp(&y.as_f64().unwrap_or(0.0)),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Missing and null cells sort after every value in both directions
fn compare_cells(a: Option<&Value>, b: Option<&Value>, direction: SortDirection) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (Some(x), Some(y)) => match direction {
            SortDirection::Asc => compare_values(x, y),
            SortDirection::Desc => compare_values(x, y).reverse(),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn project(row: &Value, columns: &[String]) -> Value {
    if columns.is_empty() {
        return row.clone();
    }
    let Some(object) = row.as_object() else {
        return row.clone();
    };
    let projected: Map<String, Value> = columns
        .iter()
        .filter_map(|c| object.get(c).map(|v| (c.clone(), v.clone())))
        .collect();
    Value::Object(projected)
}
