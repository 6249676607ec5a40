//! Receivable/payable aging.
//!
//! Buckets open amounts by days past due and sums them per currency. The
//! resulting report converts to rows and columns so it exports through the
//! same dispatcher as any list view.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::column::{ColumnDescriptor, ColumnType};
use crate::projector::{display, lookup, parse_date, to_number};

/// Days-past-due ranges, in report column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgingBucket {
    Current,
    Days1To30,
    Days31To60,
    Days61To90,
    Over90,
}

impl AgingBucket {
    pub const ALL: [AgingBucket; 5] = [
        Self::Current,
        Self::Days1To30,
        Self::Days31To60,
        Self::Days61To90,
        Self::Over90,
    ];

    /// Bucket for a number of days past due. Not yet due counts as current.
    pub fn for_days_past_due(days: i64) -> Self {
        match days {
            i64::MIN..=0 => Self::Current,
            1..=30 => Self::Days1To30,
            31..=60 => Self::Days31To60,
            61..=90 => Self::Days61To90,
            _ => Self::Over90,
        }
    }

    /// Row key used by [`AgingReport::to_rows`].
    pub fn key(self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::Days1To30 => "days_1_30",
            Self::Days31To60 => "days_31_60",
            Self::Days61To90 => "days_61_90",
            Self::Over90 => "over_90",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Current => "Current",
            Self::Days1To30 => "1-30 Days",
            Self::Days31To60 => "31-60 Days",
            Self::Days61To90 => "61-90 Days",
            Self::Over90 => "Over 90 Days",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Where to find the due date, amount and currency in each row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgingSpec {
    pub due_date_path: String,
    pub amount_path: String,
    #[serde(default)]
    pub currency_path: Option<String>,
    #[serde(default = "default_currency")]
    pub default_currency: String,
}

fn default_currency() -> String {
    "USD".into()
}

impl AgingSpec {
    pub fn new(due_date_path: impl Into<String>, amount_path: impl Into<String>) -> Self {
        Self {
            due_date_path: due_date_path.into(),
            amount_path: amount_path.into(),
            currency_path: None,
            default_currency: default_currency(),
        }
    }

    pub fn with_currency_path(mut self, path: impl Into<String>) -> Self {
        self.currency_path = Some(path.into());
        self
    }
}

/// Per-currency bucket totals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgingReport {
    totals: BTreeMap<String, [f64; 5]>,
    /// Rows that contributed to a bucket.
    pub counted: usize,
    /// Rows without a usable due date or amount.
    pub skipped: usize,
}

impl AgingReport {
    pub fn currencies(&self) -> impl Iterator<Item = &str> {
        self.totals.keys().map(String::as_str)
    }

    pub fn total(&self, currency: &str, bucket: AgingBucket) -> f64 {
        self.totals
            .get(currency)
            .map_or(0.0, |buckets| buckets[bucket.index()])
    }

    pub fn currency_total(&self, currency: &str) -> f64 {
        self.totals
            .get(currency)
            .map_or(0.0, |buckets| buckets.iter().sum())
    }

    /// One row per currency with a key per bucket plus `total`.
    pub fn to_rows(&self) -> Vec<Value> {
        self.totals
            .iter()
            .map(|(currency, buckets)| {
                let mut row = Map::new();
                row.insert("currency".into(), json!(currency));
                for bucket in AgingBucket::ALL {
                    row.insert(bucket.key().into(), json!(round2(buckets[bucket.index()])));
                }
                row.insert("total".into(), json!(round2(buckets.iter().sum())));
                Value::Object(row)
            })
            .collect()
    }
}

/// Columns matching [`AgingReport::to_rows`].
///
/// Amounts are `number` columns: a report mixes currencies, so a `$` prefix
/// would be wrong for most rows. The currency code has its own column.
pub fn aging_columns() -> Vec<ColumnDescriptor> {
    let mut columns = vec![ColumnDescriptor::new("currency", "Currency").with_width(10.0)];
    columns.extend(AgingBucket::ALL.iter().map(|bucket| {
        ColumnDescriptor::new(bucket.key(), bucket.label()).with_type(ColumnType::Number)
    }));
    columns.push(ColumnDescriptor::new("total", "Total").with_type(ColumnType::Number));
    columns
}

/// Sum open amounts per currency into aging buckets as of `as_of`.
pub fn tally_aging(rows: &[Value], spec: &AgingSpec, as_of: NaiveDate) -> AgingReport {
    let mut report = AgingReport::default();

    for row in rows {
        let due = lookup(row, &spec.due_date_path).and_then(parse_date);
        let amount = lookup(row, &spec.amount_path)
            .filter(|v| !v.is_null())
            .map(to_number)
            .filter(|n| n.is_finite());

        let (Some(due), Some(amount)) = (due, amount) else {
            report.skipped += 1;
            continue;
        };

        let currency = spec
            .currency_path
            .as_deref()
            .and_then(|path| lookup(row, path))
            .map(display)
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| spec.default_currency.clone());

        let bucket = AgingBucket::for_days_past_due((as_of - due).num_days());
        report.totals.entry(currency).or_insert([0.0; 5])[bucket.index()] += amount;
        report.counted += 1;
    }

    tracing::debug!(
        counted = report.counted,
        skipped = report.skipped,
        "aging tally complete"
    );
    report
}

fn round2(n: f64) -> f64 {
    (n * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projector::{ProjectionOptions, project_rows};

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
    }

    #[test]
    fn test_bucket_boundaries() {
        assert_eq!(AgingBucket::for_days_past_due(-5), AgingBucket::Current);
        assert_eq!(AgingBucket::for_days_past_due(0), AgingBucket::Current);
        assert_eq!(AgingBucket::for_days_past_due(1), AgingBucket::Days1To30);
        assert_eq!(AgingBucket::for_days_past_due(30), AgingBucket::Days1To30);
        assert_eq!(AgingBucket::for_days_past_due(31), AgingBucket::Days31To60);
        assert_eq!(AgingBucket::for_days_past_due(90), AgingBucket::Days61To90);
        assert_eq!(AgingBucket::for_days_past_due(91), AgingBucket::Over90);
    }

    #[test]
    fn test_tally_per_currency() {
        let rows = vec![
            json!({"invoice": {"due": "2024-07-10"}, "balance": 100, "cur": "USD"}),
            json!({"invoice": {"due": "2024-06-20"}, "balance": "50.25", "cur": "USD"}),
            json!({"invoice": {"due": "2024-05-15"}, "balance": 40, "cur": "EUR"}),
            json!({"invoice": {"due": "2024-01-01"}, "balance": 10}),
        ];
        let spec = AgingSpec::new("invoice.due", "balance").with_currency_path("cur");
        let report = tally_aging(&rows, &spec, as_of());

        assert_eq!(report.counted, 4);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.total("USD", AgingBucket::Current), 100.0);
        assert_eq!(report.total("USD", AgingBucket::Days1To30), 50.25);
        assert_eq!(report.total("USD", AgingBucket::Over90), 10.0);
        assert_eq!(report.total("EUR", AgingBucket::Days31To60), 40.0);
        assert_eq!(report.currency_total("USD"), 160.25);
        assert_eq!(report.currencies().collect::<Vec<_>>(), vec!["EUR", "USD"]);
    }

    #[test]
    fn test_tally_skips_unusable_rows() {
        let rows = vec![
            json!({"due": "not a date", "amount": 5}),
            json!({"amount": 5}),
            json!({"due": "2024-06-01", "amount": "abc"}),
            json!({"due": "2024-06-01", "amount": null}),
            json!({"due": "2024-06-01", "amount": 5}),
        ];
        let report = tally_aging(&rows, &AgingSpec::new("due", "amount"), as_of());
        assert_eq!(report.counted, 1);
        assert_eq!(report.skipped, 4);
        assert_eq!(report.total("USD", AgingBucket::Days1To30), 5.0);
    }

    #[test]
    fn test_report_rows_project_through_columns() {
        let rows = vec![json!({"due": "2024-06-01", "amount": 12.5})];
        let report = tally_aging(&rows, &AgingSpec::new("due", "amount"), as_of());

        let cells = project_rows(&report.to_rows(), &aging_columns(), &ProjectionOptions::default())
            .unwrap();
        assert_eq!(cells, vec![vec!["USD", "", "12.50", "", "", "", "12.50"]]);
    }

    #[test]
    fn test_aging_columns_are_numeric_amounts() {
        let columns = aging_columns();
        assert_eq!(columns.len(), AgingBucket::ALL.len() + 2);
        assert_eq!(columns[0].key, "currency");
        assert_eq!(columns[0].kind, None);
        assert!(
            columns[1..]
                .iter()
                .all(|c| c.kind == Some(ColumnType::Number))
        );
    }
}
