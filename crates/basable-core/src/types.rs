//! Core types for Basable

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

/// Page size used when a table config does not set `items_per_page`
pub const DEFAULT_ITEMS_PER_PAGE: usize = 100;

/// A column as reported by the backend's schema introspection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "col_type")]
    pub declared_type: String,
    pub nullable: bool,
    #[serde(rename = "primary", default)]
    pub is_primary: bool,
    #[serde(rename = "unique", default)]
    pub is_unique: bool,
    #[serde(default)]
    pub default_value: Option<String>,
}

impl Column {
    /// Convenience constructor for a nullable text column
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
            nullable: true,
            is_primary: false,
            is_unique: false,
            default_value: None,
        }
    }

    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self.is_unique = true;
        self.nullable = false;
        self
    }
}

/// Per-table configuration persisted by the backend
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TableConfig {
    pub name: String,

    #[serde(default)]
    pub label: Option<String>,

    /// Column used to address individual rows when saving edits
    #[serde(rename = "pk_column", default)]
    pub unique_column: Option<String>,

    /// Column recording when a row was created
    #[serde(default)]
    pub created_column: Option<String>,

    /// Rows per page
    #[serde(default)]
    pub items_per_page: Option<usize>,

    /// Columns hidden from the row editor
    #[serde(default, deserialize_with = "null_as_empty")]
    pub exclude_columns: Vec<String>,
}

impl TableConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// The label shown for this table, falling back to its name
    pub fn display_label(&self) -> &str {
        match self.label.as_deref() {
            Some(label) if !label.trim().is_empty() => label,
            _ => &self.name,
        }
    }

    pub fn page_size(&self) -> usize {
        self.items_per_page
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_ITEMS_PER_PAGE)
    }

    /// Apply a partial update, leaving fields the patch does not mention untouched
    pub fn merge(&mut self, patch: &TableConfigPatch) {
        if let Some(label) = &patch.label {
            self.label = Some(label.clone());
        }
        if let Some(unique) = &patch.unique_column {
            self.unique_column = Some(unique.clone());
        }
        if let Some(created) = &patch.created_column {
            self.created_column = Some(created.clone());
        }
        if let Some(items) = patch.items_per_page {
            self.items_per_page = Some(items);
        }
        if let Some(excluded) = &patch.exclude_columns {
            self.exclude_columns = excluded.clone();
        }
    }
}

/// Partial [`TableConfig`] sent when saving the settings form
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TableConfigPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "pk_column", skip_serializing_if = "Option::is_none")]
    pub unique_column: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_column: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_per_page: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_columns: Option<Vec<String>>,
}

impl TableConfigPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Vec<String>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Runtime type tag of a cell, as named on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    #[serde(rename = "NULL")]
    Null,
    Text,
    Int,
    UInt,
    Float,
    Double,
    Date,
    Time,
}

impl ColumnType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int | Self::UInt | Self::Float | Self::Double)
    }
}

/// A self-describing cell value: `{"Int": 5}`, `{"Text": "paid"}`, `"NULL"`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnValue {
    #[serde(rename = "NULL")]
    Null,
    Text(String),
    Int(i64),
    UInt(u64),
    Float(f32),
    Double(f64),
    /// year, month, day, hour, minutes, seconds, micro seconds
    Date(u16, u8, u8, u8, u8, u8, u32),
    /// is negative, days, hours, minutes, seconds, micro seconds
    Time(bool, u32, u8, u8, u8, u32),
}

impl ColumnValue {
    pub fn column_type(&self) -> ColumnType {
        match self {
            Self::Null => ColumnType::Null,
            Self::Text(_) => ColumnType::Text,
            Self::Int(_) => ColumnType::Int,
            Self::UInt(_) => ColumnType::UInt,
            Self::Float(_) => ColumnType::Float,
            Self::Double(_) => ColumnType::Double,
            Self::Date(..) => ColumnType::Date,
            Self::Time(..) => ColumnType::Time,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Text shown in an input widget. NULL renders as an empty field.
    pub fn input_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            other => other.to_string(),
        }
    }

    /// Build the value a user typed into this cell.
    ///
    /// Keeps the cell's type tag when `input` parses as that type, otherwise
    /// falls back to `Text`. Clearing a NULL cell leaves it NULL.
    pub fn with_input(&self, input: &str) -> ColumnValue {
        let text = || ColumnValue::Text(input.to_string());
        match self {
            Self::Null if input.is_empty() => Self::Null,
            Self::Null | Self::Text(_) => text(),
            Self::Int(_) => input.trim().parse().map(Self::Int).unwrap_or_else(|_| text()),
            Self::UInt(_) => input.trim().parse().map(Self::UInt).unwrap_or_else(|_| text()),
            Self::Float(_) => input.trim().parse().map(Self::Float).unwrap_or_else(|_| text()),
            Self::Double(_) => input.trim().parse().map(Self::Double).unwrap_or_else(|_| text()),
            Self::Date(..) => parse_date(input.trim()).unwrap_or_else(text),
            Self::Time(..) => parse_time(input.trim()).unwrap_or_else(text),
        }
    }
}

fn parse_date(input: &str) -> Option<ColumnValue> {
    let datetime = NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(input, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;

    let year = u16::try_from(datetime.year()).ok()?;
    Some(ColumnValue::Date(
        year,
        datetime.month() as u8,
        datetime.day() as u8,
        datetime.hour() as u8,
        datetime.minute() as u8,
        datetime.second() as u8,
        datetime.nanosecond() / 1_000,
    ))
}

fn parse_time(input: &str) -> Option<ColumnValue> {
    let (negative, rest) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input),
    };
    let time = NaiveTime::parse_from_str(rest, "%H:%M:%S%.f").ok()?;
    Some(ColumnValue::Time(
        negative,
        0,
        time.hour() as u8,
        time.minute() as u8,
        time.second() as u8,
        time.nanosecond() / 1_000,
    ))
}

impl std::fmt::Display for ColumnValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Text(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::UInt(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Double(v) => write!(f, "{}", v),
            Self::Date(y, m, d, h, min, s, micro) => {
                write!(f, "{:04}-{:02}-{:02} {:02}:{:02}:{:02}", y, m, d, h, min, s)?;
                if *micro > 0 {
                    write!(f, ".{:06}", micro)?;
                }
                Ok(())
            }
            Self::Time(negative, days, h, min, s, micro) => {
                let hours = u64::from(*days) * 24 + u64::from(*h);
                let sign = if *negative { "-" } else { "" };
                write!(f, "{}{:02}:{:02}:{:02}", sign, hours, min, s)?;
                if *micro > 0 {
                    write!(f, ".{:06}", micro)?;
                }
                Ok(())
            }
        }
    }
}

/// A result row: column name to self-describing cell, in column order
pub type TableRow = IndexMap<String, ColumnValue>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn cell_values_use_single_key_wire_format() {
        let row: TableRow = serde_json::from_value(json!({
            "id": {"Int": 7},
            "status": {"Text": "paid"},
            "deleted_at": "NULL",
            "created": {"Date": [2024, 3, 9, 14, 5, 0, 0]}
        }))
        .expect("row should decode");

        assert_eq!(row["id"], ColumnValue::Int(7));
        assert_eq!(row["status"], ColumnValue::Text("paid".into()));
        assert!(row["deleted_at"].is_null());
        assert_eq!(row["created"].to_string(), "2024-03-09 14:05:00");

        let keys: Vec<&str> = row.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["id", "status", "deleted_at", "created"]);
    }

    #[test]
    fn input_keeps_type_when_it_parses() {
        assert_eq!(ColumnValue::Int(1).with_input("42"), ColumnValue::Int(42));
        assert_eq!(
            ColumnValue::Int(1).with_input("forty"),
            ColumnValue::Text("forty".into())
        );
        assert_eq!(ColumnValue::Double(0.5).with_input("2.25"), ColumnValue::Double(2.25));
        assert_eq!(ColumnValue::Null.with_input(""), ColumnValue::Null);
        assert_eq!(ColumnValue::Null.with_input("x"), ColumnValue::Text("x".into()));
        assert_eq!(
            ColumnValue::Date(2020, 1, 1, 0, 0, 0, 0).with_input("2024-02-29"),
            ColumnValue::Date(2024, 2, 29, 0, 0, 0, 0)
        );
        assert_eq!(
            ColumnValue::Time(false, 0, 0, 0, 0, 0).with_input("-01:30:00"),
            ColumnValue::Time(true, 0, 1, 30, 0, 0)
        );
    }

    #[test]
    fn time_display_folds_days_into_hours() {
        let value = ColumnValue::Time(false, 1, 2, 3, 4, 0);
        assert_eq!(value.to_string(), "26:03:04");
        assert_eq!(ColumnValue::Null.input_text(), "");
    }

    #[test]
    fn table_config_tolerates_null_exclusions() {
        let config: TableConfig = serde_json::from_value(json!({
            "name": "orders",
            "label": "",
            "pk_column": "id",
            "items_per_page": null,
            "exclude_columns": null
        }))
        .expect("config should decode");

        assert!(config.exclude_columns.is_empty());
        assert_eq!(config.display_label(), "orders");
        assert_eq!(config.page_size(), DEFAULT_ITEMS_PER_PAGE);
        assert_eq!(config.unique_column.as_deref(), Some("id"));
    }

    #[test]
    fn merge_only_touches_patched_fields() {
        let mut config = TableConfig {
            label: Some("Orders".into()),
            items_per_page: Some(25),
            ..TableConfig::new("orders")
        };
        let patch = TableConfigPatch {
            exclude_columns: Some(vec!["notes".into()]),
            ..Default::default()
        };

        config.merge(&patch);

        assert_eq!(config.label.as_deref(), Some("Orders"));
        assert_eq!(config.items_per_page, Some(25));
        assert_eq!(config.exclude_columns, vec!["notes".to_string()]);
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!({"exclude_columns": ["notes"]})
        );
    }
}
