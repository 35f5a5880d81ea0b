//! Terminal rendering

use basable_core::{Column, ColumnTypes, FilterOperator, InputKind, Projection, TableConfig, TableRow};
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL};

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Rows in projection order; the unique column, if any, comes first.
pub fn rows_table(projection: &Projection, rows: &[TableRow]) -> Table {
    let mut table = new_table();
    let names = projection.column_names();
    table.set_header(names.clone());

    for row in rows {
        table.add_row(
            names
                .iter()
                .map(|name| row.get(*name).map(ToString::to_string).unwrap_or_default())
                .collect::<Vec<_>>(),
        );
    }
    table
}

pub fn columns_table(columns: &[Column], types: Option<&ColumnTypes>) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Column", "Type", "Nullable", "Key", "Default", "Input"]);

    for column in columns {
        let key = if column.is_primary {
            "PRI"
        } else if column.is_unique {
            "UNI"
        } else {
            ""
        };
        let input = types
            .map(|t| t.input_kind(&column.name))
            .unwrap_or_default();
        table.add_row(vec![
            column.name.clone(),
            column.declared_type.clone(),
            if column.nullable { "YES" } else { "NO" }.to_string(),
            key.to_string(),
            column.default_value.clone().unwrap_or_default(),
            input_label(input).to_string(),
        ]);
    }
    table
}

fn input_label(kind: InputKind) -> &'static str {
    match kind {
        InputKind::Text => "text",
        InputKind::Number => "number",
        InputKind::Date => "date",
        InputKind::Time => "time",
    }
}

pub fn configs_table(configs: &[TableConfig]) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Table", "Label", "Unique column", "Page size", "Excluded"]);

    for config in configs {
        table.add_row(vec![
            config.name.clone(),
            config.display_label().to_string(),
            config.unique_column.clone().unwrap_or_else(|| "-".into()),
            config.page_size().to_string(),
            config.exclude_columns.join(", "),
        ]);
    }
    table
}

pub fn operators_table() -> Table {
    let mut table = new_table();
    table.set_header(vec!["Label", "Symbol", "Backend key", "Values"]);

    for op in FilterOperator::all() {
        let values = if op.requires_two_values() {
            "2"
        } else if op.requires_value() {
            "1"
        } else {
            "0"
        };
        table.add_row(vec![op.label(), op.symbol(), op.key(), values]);
    }
    table
}

/// `Page 2 of 3 (250 rows)`
pub fn page_summary(current_page: usize, total_pages: usize, total: Option<usize>) -> String {
    match total {
        Some(total) => format!(
            "Page {} of {} ({} rows)",
            current_page + 1,
            total_pages.max(1),
            total
        ),
        None => format!("Page {}", current_page + 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use basable_core::{ColumnValue, TableEditMode};
    use pretty_assertions::assert_eq;

    #[test]
    fn rows_follow_projection_order() {
        let projection = Projection {
            columns: vec![Column::new("id", "int"), Column::new("status", "varchar")],
            edit_mode: TableEditMode::ReadOnly,
        };
        let row = TableRow::from([
            ("status".to_string(), ColumnValue::Text("paid".into())),
            ("id".to_string(), ColumnValue::Int(7)),
            ("notes".to_string(), ColumnValue::Null),
        ]);

        let rendered = rows_table(&projection, &[row]).to_string();
        let id_at = rendered.find('7').unwrap();
        let status_at = rendered.find("paid").unwrap();
        assert!(id_at < status_at);
        assert!(!rendered.contains("notes"));
    }

    #[test]
    fn summary_is_one_based() {
        assert_eq!(page_summary(1, 3, Some(250)), "Page 2 of 3 (250 rows)");
        assert_eq!(page_summary(0, 0, Some(0)), "Page 1 of 1 (0 rows)");
        assert_eq!(page_summary(0, 0, None), "Page 1");
    }
}
