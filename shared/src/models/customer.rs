//! Customer Profile Model

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::coerce::text_or_none;

/// Columns read from the `customers` table
pub const CUSTOMER_COLUMNS: [&str; 13] = [
    "name",
    "nif",
    "address",
    "postal_code",
    "city",
    "province",
    "country",
    "phone",
    "email",
    "iban",
    "swift",
    "bank_name",
    "bank_address",
];

/// Raw `customers` row
///
/// Cells stay raw JSON so a mistyped column degrades to "absent" instead of
/// failing the row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomerRow {
    pub name: Option<Value>,
    /// Tax identification number (NIF)
    pub nif: Option<Value>,
    pub address: Option<Value>,
    pub postal_code: Option<Value>,
    pub city: Option<Value>,
    pub province: Option<Value>,
    pub country: Option<Value>,
    pub phone: Option<Value>,
    pub email: Option<Value>,
    pub iban: Option<Value>,
    pub swift: Option<Value>,
    pub bank_name: Option<Value>,
    pub bank_address: Option<Value>,
}

/// Company profile shown in the subscription view
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub name: String,
    pub nif: String,
    pub address: String,
    pub postal_code: String,
    pub city: String,
    pub province: String,
    pub country: String,
    pub phone: String,
    pub email: String,
}

impl CustomerProfile {
    /// Seed a profile with the signed-in user's email
    pub fn with_email(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            ..Self::default()
        }
    }

    /// Merge-by-presence: a field is only overwritten when the row carries a
    /// non-empty value for it.
    pub fn merge_from(&mut self, row: &CustomerRow) {
        keep_or_replace(&mut self.name, text_or_none(row.name.as_ref()));
        keep_or_replace(&mut self.nif, text_or_none(row.nif.as_ref()));
        keep_or_replace(&mut self.address, text_or_none(row.address.as_ref()));
        keep_or_replace(&mut self.postal_code, text_or_none(row.postal_code.as_ref()));
        keep_or_replace(&mut self.city, text_or_none(row.city.as_ref()));
        keep_or_replace(&mut self.province, text_or_none(row.province.as_ref()));
        keep_or_replace(&mut self.country, text_or_none(row.country.as_ref()));
        keep_or_replace(&mut self.phone, text_or_none(row.phone.as_ref()));
        keep_or_replace(&mut self.email, text_or_none(row.email.as_ref()));
    }
}

fn keep_or_replace(slot: &mut String, incoming: Option<String>) {
    if let Some(value) = incoming.filter(|v| !v.is_empty()) {
        *slot = value;
    }
}

/// Bank details, replaced wholesale on every fetch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankData {
    pub iban: String,
    pub swift: String,
    pub bank_name: String,
    pub bank_address: String,
}

impl BankData {
    pub fn from_row(row: &CustomerRow) -> Self {
        Self {
            iban: text_or_none(row.iban.as_ref()).unwrap_or_default(),
            swift: text_or_none(row.swift.as_ref()).unwrap_or_default(),
            bank_name: text_or_none(row.bank_name.as_ref()).unwrap_or_default(),
            bank_address: text_or_none(row.bank_address.as_ref()).unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_keeps_existing_when_absent() {
        let mut profile = CustomerProfile::with_email("a@x.com");
        profile.city = "Madrid".to_string();

        profile.merge_from(&CustomerRow {
            name: Some(json!("ACME")),
            city: None,
            email: None,
            ..CustomerRow::default()
        });

        assert_eq!(profile.name, "ACME");
        assert_eq!(profile.city, "Madrid");
        assert_eq!(profile.email, "a@x.com");
    }

    #[test]
    fn test_merge_treats_empty_as_absent() {
        let mut profile = CustomerProfile::with_email("a@x.com");
        profile.merge_from(&CustomerRow {
            email: Some(json!("")),
            ..CustomerRow::default()
        });
        assert_eq!(profile.email, "a@x.com");

        profile.merge_from(&CustomerRow {
            email: Some(json!("x@y.com")),
            ..CustomerRow::default()
        });
        assert_eq!(profile.email, "x@y.com");
    }

    #[test]
    fn test_bank_data_defaults_to_empty() {
        let bank = BankData::from_row(&CustomerRow {
            iban: Some(json!("ES91 2100 0418 4502 0005 1332")),
            ..CustomerRow::default()
        });
        assert_eq!(bank.iban, "ES91 2100 0418 4502 0005 1332");
        assert_eq!(bank.swift, "");
        assert_eq!(bank.bank_name, "");
        assert_eq!(bank.bank_address, "");
    }

    #[test]
    fn test_row_deserializes_with_nulls_and_gaps() {
        let row: CustomerRow =
            serde_json::from_str(r#"{"name":"ACME","email":null,"extra":1}"#).unwrap();
        assert_eq!(text_or_none(row.name.as_ref()).as_deref(), Some("ACME"));
        assert!(text_or_none(row.email.as_ref()).is_none());
        assert!(row.iban.is_none());
    }

    #[test]
    fn test_odd_cell_types_do_not_break_the_row() {
        let row: CustomerRow = serde_json::from_str(
            r#"{"name":"ACME","postal_code":46001,"phone":["x"],"iban":false}"#,
        )
        .unwrap();

        let mut profile = CustomerProfile {
            phone: "600 000 000".to_string(),
            ..CustomerProfile::default()
        };
        profile.merge_from(&row);
        assert_eq!(profile.name, "ACME");
        assert_eq!(profile.postal_code, "46001");
        assert_eq!(profile.phone, "600 000 000");
        assert_eq!(BankData::from_row(&row).iban, "");
    }
}
