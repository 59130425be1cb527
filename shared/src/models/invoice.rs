//! Invoice (billing record) Model

use std::cmp::Reverse;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::coerce::{id_text, opt_decimal_or_zero, text_or_none};

/// Columns read from the `receipts` table
pub const RECEIPT_COLUMNS: [&str; 5] = ["id", "date", "amount", "concept", "status"];

/// Source status that marks a receipt as settled
pub const PAID_STATUS: &str = "PAID";

/// Label used when a receipt has no concept
pub const DEFAULT_INVOICE_DESCRIPTION: &str = "Factura";

/// Number of receipts shown in the view
pub const MAX_RECENT_INVOICES: usize = 5;

/// Raw `receipts` row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiptRow {
    pub id: Option<Value>,
    pub date: Option<Value>,
    pub amount: Option<Value>,
    pub concept: Option<Value>,
    pub status: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceStatus {
    Paid,
    Pending,
}

impl InvoiceStatus {
    /// Only the exact string sentinel counts as paid; any other value,
    /// including non-string cells, is pending.
    pub fn from_db(status: Option<&Value>) -> Self {
        if status.and_then(Value::as_str) == Some(PAID_STATUS) {
            Self::Paid
        } else {
            Self::Pending
        }
    }
}

/// Read-only projection of a receipt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    pub date: Option<String>,
    pub amount: Decimal,
    pub description: String,
    pub status: InvoiceStatus,
}

impl Invoice {
    pub fn from_row(row: &ReceiptRow) -> Self {
        Self {
            id: id_text(row.id.as_ref()),
            date: text_or_none(row.date.as_ref()),
            amount: opt_decimal_or_zero(row.amount.as_ref()),
            description: text_or_none(row.concept.as_ref())
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| DEFAULT_INVOICE_DESCRIPTION.to_string()),
            status: InvoiceStatus::from_db(row.status.as_ref()),
        }
    }
}

/// Project receipts into the most recent invoices, newest first.
///
/// Rows whose date cannot be read sort after every dated row; ties keep the
/// source order.
pub fn recent_invoices(rows: &[ReceiptRow]) -> Vec<Invoice> {
    let mut invoices: Vec<Invoice> = rows.iter().map(Invoice::from_row).collect();
    invoices.sort_by_key(|invoice| Reverse(invoice.date.as_deref().and_then(parse_date)));
    invoices.truncate(MAX_RECENT_INVOICES);
    invoices
}

fn parse_date(text: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(dt);
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
