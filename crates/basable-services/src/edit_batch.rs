//! Dirty-cell tracking for the row editor
//!
//! Cell edits update the visible row at once and accumulate in an
//! [`EditBatch`] keyed by the row's unique-column value. The batch is sent in a
//! single `PATCH tables/data/<table>` call.

use basable_core::{TableEditMode, TableRow, UpdateTableData};
use indexmap::IndexMap;

use crate::error::{ServiceError, ServiceResult};

/// Accumulated, unsaved edits of an editable table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditBatch {
    data: UpdateTableData,
}

impl EditBatch {
    pub fn new(unique_key: impl Into<String>) -> Self {
        Self {
            data: UpdateTableData {
                unique_key: unique_key.into(),
                ..Default::default()
            },
        }
    }

    /// Record `column = value` for the row identified by `unique_value`.
    ///
    /// A second edit of the same row merges into that row's existing input.
    pub fn record(&mut self, unique_value: &str, column: &str, value: impl Into<String>) {
        let data = &mut self.data;
        if !data.columns.iter().any(|c| c == column) {
            data.columns.push(column.to_string());
        }

        match data.unique_values.iter().position(|v| v == unique_value) {
            Some(index) => {
                data.input[index].insert(column.to_string(), value.into());
            }
            None => {
                data.unique_values.push(unique_value.to_string());
                data.input
                    .push(IndexMap::from([(column.to_string(), value.into())]));
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.unique_values.is_empty()
    }

    pub fn unique_key(&self) -> &str {
        &self.data.unique_key
    }

    pub fn payload(&self) -> &UpdateTableData {
        &self.data
    }

    /// Drop recorded edits, keeping the unique key
    pub fn reset(&mut self) {
        self.data = UpdateTableData {
            unique_key: std::mem::take(&mut self.data.unique_key),
            ..Default::default()
        };
    }
}

/// A single cell change entered by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellEdit {
    pub row_index: usize,
    pub column: String,
    pub value: String,
}

impl CellEdit {
    pub fn new(row_index: usize, column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            row_index,
            column: column.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    /// Recorded in the batch under this unique value
    Staged { unique_value: String },
    /// Shown locally only; the table cannot address rows for saving
    LocalOnly,
}

/// Edit state of the open table. The read-only variant carries no batch, so
/// an unaddressable batch cannot exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditTracker {
    Editable(EditBatch),
    ReadOnly { unsaved: usize },
}

impl EditTracker {
    pub fn for_mode(mode: &TableEditMode) -> Self {
        match mode {
            TableEditMode::Editable { unique_column } => {
                Self::Editable(EditBatch::new(unique_column.clone()))
            }
            TableEditMode::ReadOnly => Self::ReadOnly { unsaved: 0 },
        }
    }

    /// Apply `edit` to `rows` and record it.
    ///
    /// The row is addressed by its unique value in `loaded`, the page as
    /// fetched, so edits to the unique column itself stay addressable. The
    /// edited row is replaced with a new snapshot. Nothing changes when the
    /// edit is rejected.
    pub fn apply_edit(
        &mut self,
        rows: &mut [TableRow],
        loaded: &[TableRow],
        edit: CellEdit,
    ) -> ServiceResult<EditOutcome> {
        let row = rows.get(edit.row_index).ok_or_else(|| {
            ServiceError::InvalidEdit(format!("row {} is not loaded", edit.row_index))
        })?;
        let current = row.get(&edit.column).ok_or_else(|| {
            ServiceError::InvalidEdit(format!("column `{}` is not in the row", edit.column))
        })?;

        let mut updated = row.clone();
        updated.insert(edit.column.clone(), current.with_input(&edit.value));

        let outcome = match self {
            Self::Editable(batch) => {
                let original = loaded.get(edit.row_index).unwrap_or(row);
                let unique_value = original
                    .get(batch.unique_key())
                    .ok_or_else(|| {
                        ServiceError::InvalidEdit(format!(
                            "row {} has no value for unique column `{}`",
                            edit.row_index,
                            batch.unique_key()
                        ))
                    })?
                    .to_string();
                batch.record(&unique_value, &edit.column, edit.value);
                EditOutcome::Staged { unique_value }
            }
            Self::ReadOnly { unsaved } => {
                *unsaved += 1;
                tracing::warn!(
                    column = %edit.column,
                    row = edit.row_index,
                    "Edit applied locally only; table has no usable unique column"
                );
                EditOutcome::LocalOnly
            }
        };

        rows[edit.row_index] = updated;
        Ok(outcome)
    }

    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Editable(_))
    }

    pub fn has_pending(&self) -> bool {
        match self {
            Self::Editable(batch) => !batch.is_empty(),
            Self::ReadOnly { unsaved } => *unsaved > 0,
        }
    }

    pub fn pending(&self) -> Option<&UpdateTableData> {
        match self {
            Self::Editable(batch) if !batch.is_empty() => Some(batch.payload()),
            _ => None,
        }
    }

    pub fn reset(&mut self) {
        match self {
            Self::Editable(batch) => batch.reset(),
            Self::ReadOnly { unsaved } => *unsaved = 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use basable_core::ColumnValue;
    use pretty_assertions::assert_eq;

    fn rows() -> Vec<TableRow> {
        vec![
            TableRow::from([
                ("id".to_string(), ColumnValue::Int(1)),
                ("total".to_string(), ColumnValue::Double(10.0)),
                ("status".to_string(), ColumnValue::Text("new".into())),
            ]),
            TableRow::from([
                ("id".to_string(), ColumnValue::Int(2)),
                ("total".to_string(), ColumnValue::Double(99.5)),
                ("status".to_string(), ColumnValue::Text("paid".into())),
            ]),
        ]
    }

    fn editable() -> EditTracker {
        EditTracker::for_mode(&TableEditMode::Editable {
            unique_column: "id".into(),
        })
    }

    #[test]
    fn edits_of_one_row_merge_into_one_entry() {
        let loaded = rows();
        let mut rows = loaded.clone();
        let mut tracker = editable();

        tracker
            .apply_edit(&mut rows, &loaded, CellEdit::new(0, "status", "paid"))
            .unwrap();
        let outcome = tracker
            .apply_edit(&mut rows, &loaded, CellEdit::new(0, "total", "12.5"))
            .unwrap();

        assert_eq!(
            outcome,
            EditOutcome::Staged {
                unique_value: "1".into()
            }
        );
        let payload = tracker.pending().unwrap();
        assert_eq!(payload.unique_key, "id");
        assert_eq!(payload.unique_values, vec!["1".to_string()]);
        assert_eq!(payload.columns, vec!["status".to_string(), "total".to_string()]);
        assert_eq!(payload.input.len(), 1);
        assert_eq!(payload.input[0].get("status").map(String::as_str), Some("paid"));
        assert_eq!(payload.input[0].get("total").map(String::as_str), Some("12.5"));
    }

    #[test]
    fn edits_update_rows_immediately_keeping_type() {
        let loaded = rows();
        let mut rows = loaded.clone();
        let mut tracker = editable();
        tracker
            .apply_edit(&mut rows, &loaded, CellEdit::new(1, "total", "120"))
            .unwrap();
        assert_eq!(rows[1].get("total"), Some(&ColumnValue::Double(120.0)));
    }

    #[test]
    fn separate_rows_get_separate_entries() {
        let loaded = rows();
        let mut rows = loaded.clone();
        let mut tracker = editable();
        tracker
            .apply_edit(&mut rows, &loaded, CellEdit::new(0, "status", "void"))
            .unwrap();
        tracker
            .apply_edit(&mut rows, &loaded, CellEdit::new(1, "status", "void"))
            .unwrap();

        let payload = tracker.pending().unwrap();
        assert_eq!(payload.unique_values, vec!["1".to_string(), "2".to_string()]);
        assert_eq!(payload.columns, vec!["status".to_string()]);
    }

    #[test]
    fn invalid_edits_change_nothing() {
        let loaded = rows();
        let mut rows = loaded.clone();
        let before = rows.clone();
        let mut tracker = editable();

        assert!(tracker
            .apply_edit(&mut rows, &loaded, CellEdit::new(5, "status", "x"))
            .is_err());
        assert!(tracker
            .apply_edit(&mut rows, &loaded, CellEdit::new(0, "missing", "x"))
            .is_err());
        assert_eq!(rows, before);
        assert!(!tracker.has_pending());
    }

    #[test]
    fn read_only_tracker_applies_locally() {
        let loaded = rows();
        let mut rows = loaded.clone();
        let mut tracker = EditTracker::for_mode(&TableEditMode::ReadOnly);

        let outcome = tracker
            .apply_edit(&mut rows, &loaded, CellEdit::new(0, "status", "paid"))
            .unwrap();

        assert_eq!(outcome, EditOutcome::LocalOnly);
        assert_eq!(rows[0].get("status"), Some(&ColumnValue::Text("paid".into())));
        assert!(tracker.has_pending());
        assert!(tracker.pending().is_none());
    }

    #[test]
    fn renaming_the_key_keeps_addressing_the_loaded_row() {
        let loaded = rows();
        let mut rows = loaded.clone();
        let mut tracker = editable();

        tracker
            .apply_edit(&mut rows, &loaded, CellEdit::new(0, "id", "10"))
            .unwrap();
        let outcome = tracker
            .apply_edit(&mut rows, &loaded, CellEdit::new(0, "status", "paid"))
            .unwrap();

        assert_eq!(
            outcome,
            EditOutcome::Staged {
                unique_value: "1".into()
            }
        );
        let payload = tracker.pending().unwrap();
        assert_eq!(payload.unique_values, vec!["1".to_string()]);
        assert_eq!(payload.input[0].get("id").map(String::as_str), Some("10"));
        assert_eq!(payload.input[0].get("status").map(String::as_str), Some("paid"));
        assert_eq!(rows[0].get("id"), Some(&ColumnValue::Int(10)));
    }

    #[test]
    fn reset_keeps_unique_key() {
        let mut batch = EditBatch::new("id");
        batch.record("1", "status", "paid");
        batch.reset();
        assert!(batch.is_empty());
        assert_eq!(batch.payload().columns, Vec::<String>::new());
        assert_eq!(batch.unique_key(), "id");
    }
}
