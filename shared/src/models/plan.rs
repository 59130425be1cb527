//! Subscription Plan Model

use std::collections::HashMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::coerce::{decimal_or_zero, opt_i64_or, text_or_none};

/// Columns read from the `plans` table
pub const PLAN_COLUMNS: [&str; 5] = ["id", "name", "code", "price_monthly", "max_queries_per_month"];

/// Subscription tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PlanCode {
    Free,
    Basic,
    Medium,
    Premium,
}

impl PlanCode {
    /// Paid tiers in display order
    pub const PAID: [PlanCode; 3] = [PlanCode::Basic, PlanCode::Medium, PlanCode::Premium];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "FREE",
            Self::Basic => "BASIC",
            Self::Medium => "MEDIUM",
            Self::Premium => "PREMIUM",
        }
    }

    /// Parse a backend code, ignoring case
    pub fn from_db(code: &str) -> Option<Self> {
        match code.trim().to_uppercase().as_str() {
            "FREE" => Some(Self::Free),
            "BASIC" => Some(Self::Basic),
            "MEDIUM" => Some(Self::Medium),
            "PREMIUM" => Some(Self::Premium),
            _ => None,
        }
    }

    /// Tier rank used to tell upgrades from downgrades
    pub fn rank(&self) -> u8 {
        match self {
            Self::Free => 0,
            Self::Basic => 1,
            Self::Medium => 2,
            Self::Premium => 3,
        }
    }

    pub fn is_paid(&self) -> bool {
        !matches!(self, Self::Free)
    }

    pub fn is_upgrade_from(&self, current: PlanCode) -> bool {
        self.rank() > current.rank()
    }
}

impl fmt::Display for PlanCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static display data for a tier, used when the catalog has no row for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanMetadata {
    pub name: String,
    pub description: String,
    pub max_queries: i64,
    pub default_price: Decimal,
}

impl PlanMetadata {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        max_queries: i64,
        default_price: i64,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            max_queries,
            default_price: Decimal::from(default_price),
        }
    }

    fn placeholder(code: PlanCode) -> Self {
        Self::new(code.as_str(), "", 0, 0)
    }
}

/// Raw `plans` row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanRow {
    pub id: Option<Value>,
    pub name: Option<Value>,
    pub code: Option<Value>,
    pub price_monthly: Option<Value>,
    pub max_queries_per_month: Option<Value>,
}

impl PlanRow {
    /// Non-empty id, rendered from a string or numeric cell
    pub fn id(&self) -> Option<String> {
        text_or_none(self.id.as_ref()).filter(|s| !s.is_empty())
    }

    /// Non-empty display name
    pub fn name(&self) -> Option<String> {
        text_or_none(self.name.as_ref()).filter(|s| !s.is_empty())
    }

    pub fn code(&self) -> Option<String> {
        text_or_none(self.code.as_ref())
    }

    /// Monthly query quota; absent or null uses `fallback`
    pub fn max_queries_or(&self, fallback: i64) -> i64 {
        opt_i64_or(self.max_queries_per_month.as_ref(), fallback)
    }

    /// Monthly query quota, if the row sets one
    pub fn max_queries(&self) -> Option<i64> {
        match self.max_queries_per_month.as_ref() {
            None | Some(Value::Null) => None,
            value => Some(opt_i64_or(value, 0)),
        }
    }
}

/// Plan card entry shown in the view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailablePlan {
    pub id: String,
    pub code: PlanCode,
    pub name: String,
    pub price_monthly: Decimal,
    pub description: String,
    pub max_queries: i64,
}

/// Ordered plan sequence plus fallback metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanCatalog {
    sequence: Vec<PlanCode>,
    metadata: HashMap<PlanCode, PlanMetadata>,
}

impl Default for PlanCatalog {
    fn default() -> Self {
        let metadata = HashMap::from([
            (
                PlanCode::Basic,
                PlanMetadata::new(
                    "Básico",
                    "Ideal para validar la plataforma con hasta 150 consultas/mes.",
                    150,
                    30,
                ),
            ),
            (
                PlanCode::Medium,
                PlanMetadata::new(
                    "Medio",
                    "Para equipos en crecimiento con soporte prioritario.",
                    500,
                    50,
                ),
            ),
            (
                PlanCode::Premium,
                PlanMetadata::new(
                    "Premium",
                    "API completa y gestión avanzada con 2.000 consultas/mes.",
                    2000,
                    75,
                ),
            ),
            (
                PlanCode::Free,
                PlanMetadata::new("Free", "Portal de inicio sin facturación.", 25, 0),
            ),
        ]);
        Self::new(PlanCode::PAID.to_vec(), metadata)
    }
}

impl PlanCatalog {
    pub fn new(sequence: Vec<PlanCode>, metadata: HashMap<PlanCode, PlanMetadata>) -> Self {
        Self { sequence, metadata }
    }

    pub fn sequence(&self) -> &[PlanCode] {
        &self.sequence
    }

    pub fn metadata(&self, code: PlanCode) -> Option<&PlanMetadata> {
        self.metadata.get(&code)
    }

    /// Sequence codes as backend filter values
    pub fn codes(&self) -> Vec<String> {
        self.sequence.iter().map(|c| c.as_str().to_string()).collect()
    }

    /// Build one entry per sequence code, in sequence order.
    ///
    /// Catalog rows are matched by code ignoring case; codes without a row
    /// fall back to the metadata table and use the code as id.
    pub fn available_plans(&self, rows: &[PlanRow]) -> Vec<AvailablePlan> {
        self.sequence
            .iter()
            .map(|&code| {
                let row = rows.iter().find(|row| {
                    row.code()
                        .is_some_and(|c| c.to_uppercase() == code.as_str())
                });
                let meta = self
                    .metadata(code)
                    .cloned()
                    .unwrap_or_else(|| PlanMetadata::placeholder(code));
                build_plan(code, row, meta)
            })
            .collect()
    }
}

fn build_plan(code: PlanCode, row: Option<&PlanRow>, meta: PlanMetadata) -> AvailablePlan {
    let Some(row) = row else {
        return AvailablePlan {
            id: code.as_str().to_string(),
            code,
            name: meta.name,
            price_monthly: meta.default_price,
            description: meta.description,
            max_queries: meta.max_queries,
        };
    };

    let price_monthly = match row.price_monthly.as_ref() {
        Some(value) if !value.is_null() => decimal_or_zero(value),
        _ => meta.default_price,
    };

    AvailablePlan {
        id: row.id().unwrap_or_else(|| code.as_str().to_string()),
        code,
        name: row.name().unwrap_or(meta.name),
        price_monthly,
        description: meta.description,
        max_queries: row.max_queries_or(meta.max_queries),
    }
}
