use serde::{Deserialize, Serialize};

/// Presentation transform applied to a projected value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Date,
    Currency,
    Number,
    Boolean,
}

/// How to extract, label and size one column of a tabular export.
///
/// `key` is a dotted path into the row object, e.g. `customer.address.city`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub key: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(
        default,
        rename = "type",
        deserialize_with = "lenient_type",
        skip_serializing_if = "Option::is_none"
    )]
    pub kind: Option<ColumnType>,
}

/// Unrecognized type tags fall back to plain rendering instead of failing the request.
fn lenient_type<'de, D>(d: D) -> Result<Option<ColumnType>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let tag = Option::<String>::deserialize(d)?;
    Ok(match tag.as_deref() {
        Some("date") => Some(ColumnType::Date),
        Some("currency") => Some(ColumnType::Currency),
        Some("number") => Some(ColumnType::Number),
        Some("boolean") => Some(ColumnType::Boolean),
        _ => None,
    })
}

impl ColumnDescriptor {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            width: None,
            kind: None,
        }
    }

    pub fn with_width(mut self, width: f64) -> Self {
        self.width = Some(width);
        self
    }

    pub fn with_type(mut self, kind: ColumnType) -> Self {
        self.kind = Some(kind);
        self
    }

    /// The configured width, or `default` when the descriptor has none.
    pub fn width_or(&self, default: f64) -> f64 {
        self.width.filter(|w| *w > 0.0).unwrap_or(default)
    }
}

/// Header labels in column order.
pub fn labels(columns: &[ColumnDescriptor]) -> Vec<&str> {
    columns.iter().map(|c| c.label.as_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_descriptor() {
        let json = r#"[
            {"key": "invoice.total", "label": "Total", "type": "currency", "width": 20},
            {"key": "name", "label": "Name"}
        ]"#;
        let columns: Vec<ColumnDescriptor> = serde_json::from_str(json).unwrap();
        assert_eq!(columns[0].kind, Some(ColumnType::Currency));
        assert_eq!(columns[0].width, Some(20.0));
        assert_eq!(columns[1].kind, None);
        assert_eq!(columns[1].width, None);
    }

    #[test]
    fn test_unknown_type_renders_plain() {
        let json = r#"{"key": "a", "label": "A", "type": "percent"}"#;
        let col: ColumnDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(col.kind, None);
    }

    #[test]
    fn test_width_or_default() {
        let col = ColumnDescriptor::new("a", "A");
        assert_eq!(col.width_or(15.0), 15.0);
        assert_eq!(col.clone().with_width(30.0).width_or(15.0), 30.0);
        assert_eq!(col.with_width(0.0).width_or(15.0), 15.0);
    }

    #[test]
    fn test_labels_preserve_order() {
        let columns = vec![
            ColumnDescriptor::new("b", "Second"),
            ColumnDescriptor::new("a", "First"),
        ];
        assert_eq!(labels(&columns), vec!["Second", "First"]);
    }
}
