//! Column type inference from returned rows

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::types::{ColumnType, TableRow};

/// Input widget to render for a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputKind {
    #[default]
    Text,
    Number,
    Date,
    Time,
}

/// Column name to runtime type, in column order
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnTypes(IndexMap<String, ColumnType>);

impl ColumnTypes {
    /// Types of the first row, or `None` when the result set is empty
    pub fn from_rows(rows: &[TableRow]) -> Option<Self> {
        rows.first().map(infer_types)
    }

    pub fn get(&self, column: &str) -> Option<ColumnType> {
        self.0.get(column).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ColumnType)> {
        self.0.iter().map(|(name, ty)| (name.as_str(), *ty))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Widget for `column`; unknown columns render as text.
    pub fn input_kind(&self, column: &str) -> InputKind {
        match self.get(column) {
            Some(ty) if ty.is_numeric() => InputKind::Number,
            Some(ColumnType::Date) => InputKind::Date,
            Some(ColumnType::Time) => InputKind::Time,
            _ => InputKind::Text,
        }
    }

    /// Whether free-text search may target `column`. A NULL sample cell says
    /// nothing about the column, so it stays eligible.
    pub fn is_searchable(&self, column: &str) -> bool {
        matches!(
            self.get(column),
            None | Some(ColumnType::Text) | Some(ColumnType::Null)
        )
    }
}

/// Read each cell's type tag from a sample row.
pub fn infer_types(row: &TableRow) -> ColumnTypes {
    ColumnTypes(
        row.iter()
            .map(|(name, value)| (name.clone(), value.column_type()))
            .collect(),
    )
}

/// Columns eligible for free-text search. With no inferred types every
/// candidate is allowed.
pub fn searchable_columns<'a>(types: Option<&ColumnTypes>, candidates: &'a [String]) -> Vec<&'a str> {
    candidates
        .iter()
        .map(String::as_str)
        .filter(|column| types.is_none_or(|t| t.is_searchable(column)))
        .collect()
}
