//! Column projection driven by a table's configuration

use crate::types::{Column, TableConfig};

/// Whether edits on a table can be addressed to individual rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableEditMode {
    /// Rows are keyed by the values of `unique_column`
    Editable { unique_column: String },
    /// No usable unique column; edits cannot be persisted
    ReadOnly,
}

impl TableEditMode {
    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Editable { .. })
    }

    pub fn unique_column(&self) -> Option<&str> {
        match self {
            Self::Editable { unique_column } => Some(unique_column),
            Self::ReadOnly => None,
        }
    }
}

/// Ordered, exclusion-filtered columns a table renders and edits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    pub columns: Vec<Column>,
    pub edit_mode: TableEditMode,
}

impl Projection {
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Drop excluded columns and pin the unique column leftmost.
///
/// A unique column that is excluded, or missing from `all_columns`, leaves the
/// table read-only.
pub fn resolve_projection(all_columns: &[Column], config: &TableConfig) -> Projection {
    let mut columns: Vec<Column> = all_columns
        .iter()
        .filter(|c| !config.exclude_columns.contains(&c.name))
        .cloned()
        .collect();

    let edit_mode = match config.unique_column.as_deref() {
        Some(unique) if pin_first(&mut columns, unique) => TableEditMode::Editable {
            unique_column: unique.to_string(),
        },
        _ => TableEditMode::ReadOnly,
    };

    tracing::debug!(
        table = %config.name,
        columns = columns.len(),
        excluded = config.exclude_columns.len(),
        editable = edit_mode.is_editable(),
        "Resolved column projection"
    );

    Projection { columns, edit_mode }
}

/// Move `name` to index 0. Returns false when it is not present.
fn pin_first(columns: &mut Vec<Column>, name: &str) -> bool {
    match columns.iter().position(|c| c.name == name) {
        Some(index) => {
            let column = columns.remove(index);
            columns.insert(0, column);
            true
        }
        None => false,
    }
}

/// `columns` value for the query options: the full, unfiltered name list when
/// the config excludes anything, otherwise unset.
pub fn query_columns(all_columns: &[Column], config: &TableConfig) -> Option<Vec<String>> {
    if config.exclude_columns.is_empty() {
        None
    } else {
        Some(all_columns.iter().map(|c| c.name.clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn columns() -> Vec<Column> {
        vec![
            Column::new("total", "decimal"),
            Column::new("status", "varchar"),
            Column::new("id", "int").primary(),
            Column::new("notes", "text"),
        ]
    }

    fn config() -> TableConfig {
        TableConfig {
            unique_column: Some("id".into()),
            exclude_columns: vec!["notes".into()],
            ..TableConfig::new("orders")
        }
    }

    #[test]
    fn excludes_and_pins_unique_column() {
        let projection = resolve_projection(&columns(), &config());
        assert_eq!(projection.column_names(), vec!["id", "total", "status"]);
        assert_eq!(projection.edit_mode.unique_column(), Some("id"));
    }

    #[test]
    fn pinning_is_idempotent() {
        let once = resolve_projection(&columns(), &config());
        let twice = resolve_projection(&once.columns, &config());
        assert_eq!(once, twice);
    }

    #[test]
    fn excluded_unique_column_degrades_to_read_only() {
        let config = TableConfig {
            exclude_columns: vec!["id".into()],
            ..config()
        };
        let projection = resolve_projection(&columns(), &config);
        assert_eq!(projection.column_names(), vec!["total", "status", "notes"]);
        assert_eq!(projection.edit_mode, TableEditMode::ReadOnly);
    }

    #[test]
    fn no_config_keeps_all_columns_read_only() {
        let projection = resolve_projection(&columns(), &TableConfig::new("orders"));
        assert_eq!(projection.columns, columns());
        assert!(!projection.edit_mode.is_editable());
    }

    #[test]
    fn query_columns_carry_full_list_only_with_exclusions() {
        assert_eq!(
            query_columns(&columns(), &config()),
            Some(vec![
                "total".to_string(),
                "status".to_string(),
                "id".to_string(),
                "notes".to_string()
            ])
        );
        assert_eq!(query_columns(&columns(), &TableConfig::new("orders")), None);
    }
}
