//! Lenient value coercion for backend rows
//!
//! Backend columns are kept as raw JSON and read through these helpers, so a
//! cell of an unexpected type never fails a whole row. Numeric columns can
//! arrive as JSON numbers, numeric strings or garbage; anything that is not a
//! readable number becomes zero.

use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::Value;

/// Coerce a JSON value into a decimal, falling back to zero.
pub fn decimal_or_zero(value: &Value) -> Decimal {
    match value {
        Value::Number(n) => parse_decimal(&n.to_string()),
        Value::String(s) => parse_decimal(s.trim()),
        _ => Decimal::ZERO,
    }
}

/// Same as [`decimal_or_zero`] for an optional column.
pub fn opt_decimal_or_zero(value: Option<&Value>) -> Decimal {
    value.map(decimal_or_zero).unwrap_or(Decimal::ZERO)
}

/// Read an integer column. Absent or null uses `fallback`; anything else is
/// coerced like a decimal and truncated.
pub fn opt_i64_or(value: Option<&Value>, fallback: i64) -> i64 {
    match value {
        None | Some(Value::Null) => fallback,
        Some(value) => decimal_or_zero(value).trunc().to_i64().unwrap_or(0),
    }
}

fn parse_decimal(text: &str) -> Decimal {
    if text.is_empty() {
        return Decimal::ZERO;
    }
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .unwrap_or(Decimal::ZERO)
}

/// Read a text column. Numbers are rendered; null, booleans, arrays and
/// objects count as absent.
pub fn text_or_none(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// Render an identifier column (string or number) as text.
pub fn id_text(value: Option<&Value>) -> String {
    text_or_none(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numbers_pass_through() {
        assert_eq!(decimal_or_zero(&json!(42)), Decimal::from(42));
        assert_eq!(decimal_or_zero(&json!(19.9)), Decimal::from_str("19.9").unwrap());
    }

    #[test]
    fn test_numeric_strings_are_parsed() {
        assert_eq!(decimal_or_zero(&json!(" 12.50 ")), Decimal::from_str("12.50").unwrap());
        assert_eq!(decimal_or_zero(&json!("1e3")), Decimal::from(1000));
    }

    #[test]
    fn test_garbage_becomes_zero() {
        assert_eq!(decimal_or_zero(&json!("abc")), Decimal::ZERO);
        assert_eq!(decimal_or_zero(&json!("")), Decimal::ZERO);
        assert_eq!(decimal_or_zero(&json!(null)), Decimal::ZERO);
        assert_eq!(decimal_or_zero(&json!(true)), Decimal::ZERO);
        assert_eq!(decimal_or_zero(&json!({"v": 1})), Decimal::ZERO);
        assert_eq!(opt_decimal_or_zero(None), Decimal::ZERO);
    }

    #[test]
    fn test_integer_columns() {
        assert_eq!(opt_i64_or(Some(&json!(150)), 7), 150);
        assert_eq!(opt_i64_or(Some(&json!("150")), 7), 150);
        assert_eq!(opt_i64_or(Some(&json!(150.9)), 7), 150);
        assert_eq!(opt_i64_or(Some(&json!("lots")), 7), 0);
        assert_eq!(opt_i64_or(Some(&json!(null)), 7), 7);
        assert_eq!(opt_i64_or(None, 7), 7);
    }

    #[test]
    fn test_text_columns() {
        assert_eq!(text_or_none(Some(&json!("PAID"))).as_deref(), Some("PAID"));
        assert_eq!(text_or_none(Some(&json!(46001))).as_deref(), Some("46001"));
        assert_eq!(text_or_none(Some(&json!(true))), None);
        assert_eq!(text_or_none(Some(&json!({"a": 1}))), None);
        assert_eq!(text_or_none(Some(&json!(null))), None);
        assert_eq!(text_or_none(None), None);
    }

    #[test]
    fn test_id_text() {
        assert_eq!(id_text(Some(&json!("r-1"))), "r-1");
        assert_eq!(id_text(Some(&json!(7))), "7");
        assert_eq!(id_text(None), "");
    }
}
