//! Value projection: dotted-path lookup plus type-aware cell formatting.
//!
//! Lookups never fail in the default mode. A path that does not resolve
//! yields an empty cell, and type-specific formatting only applies to
//! truthy values, so sparse rows render blanks rather than `$NaN` or
//! garbage dates.

use std::fmt::Write as _;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone};
use serde_json::Value;

use crate::column::{ColumnDescriptor, ColumnType};
use crate::{ExportError, Result};

/// Knobs for cell formatting.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionOptions {
    /// chrono format string for `date` columns.
    pub date_format: String,
    /// Error on unresolved paths and non-numeric amounts instead of blanking.
    pub strict: bool,
}

impl Default for ProjectionOptions {
    fn default() -> Self {
        Self {
            date_format: "%-m/%-d/%Y".into(),
            strict: false,
        }
    }
}

/// Walk `row` along a dotted path. `None` means some level was missing.
///
/// Numeric segments index into arrays, so `lines.0.sku` works.
pub fn lookup<'a>(row: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(row, |current, key| match current {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Resolve a dotted path, returning `""` when any level is missing.
pub fn get_nested_value(row: &Value, path: &str) -> Value {
    lookup(row, path)
        .cloned()
        .unwrap_or_else(|| Value::String(String::new()))
}

/// Format a looked-up value for display according to the column type.
///
/// `value` is `None` when the path did not resolve.
pub fn format_value(
    value: Option<&Value>,
    column: &ColumnDescriptor,
    options: &ProjectionOptions,
) -> Result<String> {
    format_value_at(0, value, column, options)
}

fn format_value_at(
    index: usize,
    value: Option<&Value>,
    column: &ColumnDescriptor,
    options: &ProjectionOptions,
) -> Result<String> {
    let Some(value) = value else {
        return Ok(String::new());
    };

    match column.kind {
        Some(ColumnType::Date) if is_truthy(value) => format_date(index, value, column, options),
        Some(ColumnType::Currency) if is_truthy(value) => {
            let amount = coerce_number(index, value, column, options)?;
            Ok(format!("${}", fixed2(amount)))
        }
        Some(ColumnType::Number) if is_truthy(value) => {
            let amount = coerce_number(index, value, column, options)?;
            Ok(fixed2(amount))
        }
        Some(ColumnType::Boolean) => Ok(if is_truthy(value) { "Yes" } else { "No" }.into()),
        _ if is_truthy(value) => Ok(display(value)),
        _ => Ok(String::new()),
    }
}

/// Project one row into formatted cells, one per column, in column order.
pub fn project_row(
    row: &Value,
    columns: &[ColumnDescriptor],
    options: &ProjectionOptions,
) -> Result<Vec<String>> {
    project_row_at(0, row, columns, options)
}

/// Project every row. Errors in strict mode name the offending row index.
pub fn project_rows(
    data: &[Value],
    columns: &[ColumnDescriptor],
    options: &ProjectionOptions,
) -> Result<Vec<Vec<String>>> {
    data.iter()
        .enumerate()
        .map(|(idx, row)| project_row_at(idx, row, columns, options))
        .collect()
}

fn project_row_at(
    index: usize,
    row: &Value,
    columns: &[ColumnDescriptor],
    options: &ProjectionOptions,
) -> Result<Vec<String>> {
    columns
        .iter()
        .map(|column| {
            let value = lookup(row, &column.key);
            if value.is_none() && options.strict {
                return Err(ExportError::MissingField {
                    row: index,
                    path: column.key.clone(),
                });
            }
            format_value_at(index, value, column, options)
        })
        .collect()
}

/// `null`, `false`, `0`, `""` are falsy; everything else, including empty
/// arrays and objects, is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Loose numeric coercion: numbers as-is, booleans as 1/0, trimmed numeric
/// strings parsed (blank is 0), everything else NaN.
pub fn to_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => parse_number(s),
        Value::Array(_) | Value::Object(_) => f64::NAN,
    }
}

fn parse_number(s: &str) -> f64 {
    let trimmed = s.trim();
    match trimmed {
        "" => 0.0,
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        _ => {
            // Rust also accepts "inf" and "nan", which are not numbers here.
            let lower = trimmed.to_ascii_lowercase();
            if lower.contains("inf") || lower.contains("nan") {
                return f64::NAN;
            }
            trimmed.parse().unwrap_or(f64::NAN)
        }
    }
}

/// Two-decimal fixed rendering. Exact ties round away from zero.
pub fn fixed2(n: f64) -> String {
    if n.is_nan() {
        return "NaN".into();
    }
    if n.is_infinite() {
        let sign = if n > 0.0 { "" } else { "-" };
        return format!("{sign}Infinity");
    }

    // A third decimal of exactly 5 is only representable for odd multiples
    // of 1/8. `{:.2}` would round those to even.
    let eighths = n.abs() * 8.0;
    if eighths.fract() != 0.0 || eighths % 2.0 == 0.0 {
        return format!("{n:.2}");
    }
    let mut text = format!("{:.3}", n.abs());
    text.pop();
    let sign = if n < 0.0 { "-" } else { "" };
    format!("{sign}{}", increment_last_digit(&text))
}

fn increment_last_digit(text: &str) -> String {
    let mut chars: Vec<char> = text.chars().collect();
    for i in (0..chars.len()).rev() {
        match chars[i] {
            '.' => continue,
            '9' => chars[i] = '0',
            digit => {
                chars[i] = char::from(digit as u8 + 1);
                return chars.into_iter().collect();
            }
        }
    }
    std::iter::once('1').chain(chars).collect()
}

fn coerce_number(
    index: usize,
    value: &Value,
    column: &ColumnDescriptor,
    options: &ProjectionOptions,
) -> Result<f64> {
    let n = to_number(value);
    if n.is_nan() && options.strict {
        return Err(ExportError::InvalidValue {
            row: index,
            path: column.key.clone(),
            reason: format!("'{}' is not numeric", display(value)),
        });
    }
    Ok(n)
}

fn format_date(
    index: usize,
    value: &Value,
    column: &ColumnDescriptor,
    options: &ProjectionOptions,
) -> Result<String> {
    let Some(date) = parse_date(value) else {
        if options.strict {
            return Err(ExportError::InvalidValue {
                row: index,
                path: column.key.clone(),
                reason: format!("'{}' is not a date", display(value)),
            });
        }
        return Ok(display(value));
    };

    let mut out = String::new();
    if write!(out, "{}", date.format(&options.date_format)).is_err() {
        // Bad format string: fall back to ISO rather than panic.
        out.clear();
        let _ = write!(out, "{}", date.format("%Y-%m-%d"));
    }
    Ok(out)
}

/// Accepts RFC 3339 timestamps (converted to local time), naive
/// date-times, plain `YYYY-MM-DD` dates and epoch milliseconds.
pub(crate) fn parse_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Local).date_naive());
            }
            for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
                if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
                    return Some(dt.date());
                }
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
        }
        Value::Number(n) => {
            let millis = n.as_i64()?;
            Local
                .timestamp_millis_opt(millis)
                .single()
                .map(|dt| dt.date_naive())
        }
        _ => None,
    }
}

/// Plain text rendering of a JSON value.
pub fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => format!("{f}"),
            _ => n.to_string(),
        },
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn opts() -> ProjectionOptions {
        ProjectionOptions::default()
    }

    fn strict() -> ProjectionOptions {
        ProjectionOptions {
            strict: true,
            ..ProjectionOptions::default()
        }
    }

    fn cell(row: &Value, column: &ColumnDescriptor) -> String {
        project_row(row, std::slice::from_ref(column), &opts()).unwrap()[0].clone()
    }

    #[test]
    fn test_get_nested_value_resolves() {
        let row = json!({"customer": {"address": {"city": "Lagos"}}});
        assert_eq!(get_nested_value(&row, "customer.address.city"), json!("Lagos"));
    }

    #[test]
    fn test_get_nested_value_missing_is_empty_string() {
        let row = json!({"customer": {"address": null}, "name": "x"});
        for path in [
            "customer.address.city",
            "customer.phone",
            "missing",
            "name.first",
            "",
        ] {
            assert_eq!(get_nested_value(&row, path), json!(""), "path {path}");
        }
    }

    #[test]
    fn test_lookup_indexes_arrays() {
        let row = json!({"lines": [{"sku": "A1"}, {"sku": "B2"}]});
        assert_eq!(lookup(&row, "lines.1.sku"), Some(&json!("B2")));
        assert_eq!(lookup(&row, "lines.5.sku"), None);
        assert_eq!(lookup(&row, "lines.first"), None);
    }

    #[test]
    fn test_currency_nested() {
        let col = ColumnDescriptor::new("a.b", "AB").with_type(ColumnType::Currency);
        assert_eq!(cell(&json!({"a": {"b": 5}}), &col), "$5.00");
        assert_eq!(cell(&json!({"a": {}}), &col), "");
        assert_eq!(cell(&json!({"a": {"b": "12.5"}}), &col), "$12.50");
    }

    #[test]
    fn test_currency_zero_is_blank() {
        let col = ColumnDescriptor::new("amount", "Amount").with_type(ColumnType::Currency);
        assert_eq!(cell(&json!({"amount": 0}), &col), "");
    }

    #[test]
    fn test_currency_non_numeric_is_permissive() {
        let col = ColumnDescriptor::new("amount", "Amount").with_type(ColumnType::Currency);
        assert_eq!(cell(&json!({"amount": "n/a"}), &col), "$NaN");
    }

    #[test]
    fn test_number_formatting() {
        let col = ColumnDescriptor::new("qty", "Qty").with_type(ColumnType::Number);
        assert_eq!(cell(&json!({"qty": 3}), &col), "3.00");
        assert_eq!(cell(&json!({"qty": " 7.5 "}), &col), "7.50");
        assert_eq!(cell(&json!({"qty": null}), &col), "");
        assert_eq!(cell(&json!({"qty": true}), &col), "1.00");
    }

    #[test]
    fn test_boolean_formatting() {
        let col = ColumnDescriptor::new("active", "Active").with_type(ColumnType::Boolean);
        assert_eq!(cell(&json!({"active": true}), &col), "Yes");
        assert_eq!(cell(&json!({"active": false}), &col), "No");
        assert_eq!(cell(&json!({}), &col), "");
    }

    #[test]
    fn test_date_formatting() {
        let col = ColumnDescriptor::new("due", "Due").with_type(ColumnType::Date);
        assert_eq!(cell(&json!({"due": "2024-03-05"}), &col), "3/5/2024");
        assert_eq!(cell(&json!({"due": "2024-12-31T15:30:00"}), &col), "12/31/2024");
        assert_eq!(cell(&json!({"due": ""}), &col), "");
        assert_eq!(cell(&json!({"due": "someday"}), &col), "someday");
    }

    #[test]
    fn test_date_custom_format() {
        let col = ColumnDescriptor::new("due", "Due").with_type(ColumnType::Date);
        let options = ProjectionOptions {
            date_format: "%d.%m.%Y".into(),
            strict: false,
        };
        let cells = project_row(&json!({"due": "2024-03-05"}), &[col], &options).unwrap();
        assert_eq!(cells, vec!["05.03.2024"]);
    }

    #[test]
    fn test_untyped_values() {
        let col = ColumnDescriptor::new("v", "V");
        assert_eq!(cell(&json!({"v": "Acme"}), &col), "Acme");
        assert_eq!(cell(&json!({"v": 42}), &col), "42");
        assert_eq!(cell(&json!({"v": 2.5}), &col), "2.5");
        assert_eq!(cell(&json!({"v": 0}), &col), "");
        assert_eq!(cell(&json!({"v": false}), &col), "");
        assert_eq!(cell(&json!({"v": null}), &col), "");
    }

    #[test]
    fn test_project_row_column_order() {
        let columns = vec![
            ColumnDescriptor::new("b", "B"),
            ColumnDescriptor::new("a", "A"),
            ColumnDescriptor::new("c.d", "CD"),
        ];
        let row = json!({"a": "first", "b": "second"});
        let cells = project_row(&row, &columns, &opts()).unwrap();
        assert_eq!(cells, vec!["second", "first", ""]);
    }

    #[test]
    fn test_strict_missing_field_names_row() {
        let columns = vec![ColumnDescriptor::new("a.b", "AB")];
        let data = vec![json!({"a": {"b": 1}}), json!({"a": {}})];
        let err = project_rows(&data, &columns, &strict()).unwrap_err();
        match err {
            ExportError::MissingField { row, path } => {
                assert_eq!(row, 1);
                assert_eq!(path, "a.b");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_strict_rejects_non_numeric_currency() {
        let columns = vec![ColumnDescriptor::new("amt", "Amt").with_type(ColumnType::Currency)];
        let err = project_rows(&[json!({"amt": "abc"})], &columns, &strict()).unwrap_err();
        assert!(matches!(err, ExportError::InvalidValue { .. }));
    }

    #[test]
    fn test_strict_invalid_value_names_row() {
        let columns = vec![
            ColumnDescriptor::new("amt", "Amt").with_type(ColumnType::Number),
            ColumnDescriptor::new("due", "Due").with_type(ColumnType::Date),
        ];
        let data = vec![
            json!({"amt": 1, "due": "2024-01-01"}),
            json!({"amt": 2, "due": "2024-01-02"}),
            json!({"amt": "x", "due": "2024-01-03"}),
        ];
        match project_rows(&data, &columns, &strict()).unwrap_err() {
            ExportError::InvalidValue { row, path, .. } => {
                assert_eq!(row, 2);
                assert_eq!(path, "amt");
            }
            other => panic!("unexpected error: {other}"),
        }

        let data = vec![
            json!({"amt": 1, "due": "2024-01-01"}),
            json!({"amt": 1, "due": "later"}),
        ];
        match project_rows(&data, &columns, &strict()).unwrap_err() {
            ExportError::InvalidValue { row, path, .. } => {
                assert_eq!(row, 1);
                assert_eq!(path, "due");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_fixed2_rounds_ties_up() {
        assert_eq!(fixed2(0.125), "0.13");
        assert_eq!(fixed2(10.125), "10.13");
        assert_eq!(fixed2(1.625), "1.63");
        assert_eq!(fixed2(0.375), "0.38");
        assert_eq!(fixed2(-0.125), "-0.13");
        assert_eq!(fixed2(9.995), "9.99");
        assert_eq!(fixed2(99.875), "99.88");
        assert_eq!(fixed2(2.5), "2.50");
        assert_eq!(fixed2(1.005), "1.00");
    }

    #[test]
    fn test_currency_tie_rounding() {
        let col = ColumnDescriptor::new("amount", "Amount").with_type(ColumnType::Currency);
        assert_eq!(cell(&json!({"amount": 0.125}), &col), "$0.13");
        assert_eq!(cell(&json!({"amount": 10.125}), &col), "$10.13");
    }

    #[test]
    fn test_increment_last_digit_carries() {
        assert_eq!(increment_last_digit("0.12"), "0.13");
        assert_eq!(increment_last_digit("9.99"), "10.00");
        assert_eq!(increment_last_digit("1.09"), "1.10");
    }

    #[test]
    fn test_parse_number_rejects_rust_only_forms() {
        assert!(parse_number("inf").is_nan());
        assert!(parse_number("NaN").is_nan());
        assert_eq!(parse_number("Infinity"), f64::INFINITY);
        assert_eq!(parse_number("  "), 0.0);
        assert_eq!(fixed2(f64::NEG_INFINITY), "-Infinity");
    }
}
