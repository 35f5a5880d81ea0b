//! Subcommand implementations
//!
//! Each command opens a [`TableSession`] against the HTTP backend and drives
//! it the way the dashboard would.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use basable_core::{DownloadFormat, FilterInput, TableBackend, TableConfigPatch, filter};
use basable_http::{ClientConfig, HttpBackend};
use basable_services::{CellEdit, LoadOutcome, TableConfigStore, TableSession};

use crate::args::{Cli, Commands, ConfigCommand, QueryArgs};
use crate::filter_arg::parse_filter;
use crate::output;

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = ClientConfig::load(cli.config.as_deref()).context("loading client config")?;
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }
    tracing::debug!(base_url = %config.base_url, "Using Basable API");

    let backend: Arc<dyn TableBackend> = Arc::new(HttpBackend::new(&config)?);
    let session = TableSession::new(backend, Arc::new(TableConfigStore::new()));

    let result = dispatch(cli.command, &session).await;
    if let Err(e) = &result
        && is_auth_rejection(e)
    {
        session.logout();
        eprintln!("Session rejected by the server; refresh the token in your config.");
    }
    result
}

fn is_auth_rejection(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| {
        cause
            .downcast_ref::<basable_services::ServiceError>()
            .is_some_and(|e| e.is_auth_rejection())
            || cause
                .downcast_ref::<basable_core::BasableError>()
                .is_some_and(|e| e.is_auth_rejection())
    })
}

async fn dispatch(command: Commands, session: &TableSession) -> anyhow::Result<()> {
    match command {
        Commands::Tables => {
            let configs = session.load_configs().await?;
            println!("{}", output::configs_table(&configs));
        }

        Commands::Columns { table } => {
            session
                .open_table(&table)
                .await
                .with_context(|| format!("fetching columns of `{}`", table))?;
            println!(
                "{}",
                output::columns_table(&session.columns(), session.column_types().as_ref())
            );
        }

        Commands::Query { table, query, json } => {
            open_with_query(session, &table, &query).await?;
            let rows = session.rows();
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                let projection = session
                    .projection()
                    .context("table closed while loading")?;
                println!("{}", output::rows_table(&projection, &rows));
                print_filters(session);
                println!(
                    "{}",
                    output::page_summary(
                        session.current_page(),
                        session.total_pages(),
                        session.query_count()
                    )
                );
            }
        }

        Commands::Count { table, query } => {
            open_with_query(session, &table, &query).await?;
            println!("{}", session.query_count().unwrap_or(0));
        }

        Commands::Export {
            table,
            query,
            format,
            out,
        } => {
            let format = DownloadFormat::parse(&format)?;
            open_with_query(session, &table, &query).await?;
            let export = session.export(format).await?;
            let path = out.unwrap_or_else(|| PathBuf::from(&export.filename));
            std::fs::write(&path, export.data.as_bytes())
                .with_context(|| format!("writing {}", path.display()))?;
            println!("Wrote {} ({})", path.display(), export.mimetype);
        }

        Commands::Edit {
            table,
            row_key,
            assignments,
        } => edit_row(session, &table, &row_key, &assignments).await?,

        Commands::Config { command } => match command {
            ConfigCommand::Show { table } => {
                session.open_table(&table).await?;
                let config = session.config().context("table closed while loading")?;
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
            ConfigCommand::Set {
                table,
                label,
                unique_column,
                created_column,
                page_size,
                exclude,
                clear_excludes,
            } => {
                let patch = TableConfigPatch {
                    label,
                    unique_column,
                    created_column,
                    items_per_page: page_size,
                    exclude_columns: if clear_excludes {
                        Some(Vec::new())
                    } else {
                        (!exclude.is_empty()).then_some(exclude)
                    },
                };
                if patch.is_empty() {
                    bail!("nothing to change; pass at least one option");
                }
                session.open_table(&table).await?;
                session.update_config(patch).await?;
                println!("Saved configuration for {}", session.store().label_of(&table));
            }
        },

        Commands::Clear { table, yes } => {
            if !yes {
                bail!("refusing to clear `{}` without --yes", table);
            }
            session.open_table(&table).await?;
            session.clear_table().await?;
            println!("Cleared {}", table);
        }

        Commands::Drop { table, yes } => {
            if !yes {
                bail!("refusing to drop `{}` without --yes", table);
            }
            session.open_table(&table).await?;
            session.drop_table().await?;
            println!("Dropped {}", table);
        }

        Commands::Operators => {
            println!("{}", output::operators_table());
        }
    }

    Ok(())
}

/// Open `table`, apply filters or search, sort and page.
async fn open_with_query(session: &TableSession, table: &str, query: &QueryArgs) -> anyhow::Result<()> {
    session.open_table(table).await?;

    if !query.filters.is_empty() {
        let filters = query
            .filters
            .iter()
            .map(|expr| parse_filter(expr))
            .collect::<anyhow::Result<Vec<FilterInput>>>()?;
        session.set_filters(filters).await?;
    }

    if let Some(text) = &query.search {
        let columns = (!query.search_cols.is_empty()).then(|| query.search_cols.clone());
        session.search(text, columns).await?;
    }

    if let Some(column) = &query.sort {
        session.sort_by(column).await?;
        if query.desc {
            session.sort_by(column).await?;
        }
    }

    for _ in 1..query.page.max(1) {
        if session.next_page().await? == LoadOutcome::Unchanged {
            tracing::info!(page = session.current_page() + 1, "Reached last page");
            break;
        }
    }

    Ok(())
}

fn print_filters(session: &TableSession) {
    let compiled = session.compiled_filters();
    if !compiled.is_empty() {
        println!("Filters: {}", filter::describe(&compiled));
    }
    if let Some(search) = session.query_opts().and_then(|o| o.search_opts) {
        println!(
            "Search: '{}' in {}",
            search.query,
            search.search_cols.join(", ")
        );
    }
}

/// Locate the row whose unique value is `row_key`, apply `column=value`
/// assignments and save them as one batch.
async fn edit_row(
    session: &TableSession,
    table: &str,
    row_key: &str,
    assignments: &[String],
) -> anyhow::Result<()> {
    session.open_table(table).await?;
    let unique_column = session
        .edit_mode()
        .and_then(|mode| mode.unique_column().map(str::to_string))
        .with_context(|| {
            format!(
                "`{}` has no usable unique column; set one with `basable config set {} --unique-column <COLUMN>`",
                table, table
            )
        })?;

    session
        .set_filters(vec![FilterInput::new(
            unique_column.as_str(),
            basable_core::FilterOperator::Equal,
            row_key,
        )])
        .await?;

    let row_index = session
        .rows()
        .iter()
        .position(|row| {
            row.get(&unique_column)
                .is_some_and(|value| value.to_string() == row_key)
        })
        .with_context(|| format!("no row with {} = {}", unique_column, row_key))?;

    for assignment in assignments {
        let (column, value) = assignment
            .split_once('=')
            .with_context(|| format!("expected COLUMN=VALUE, got `{}`", assignment))?;
        session.apply_edit(CellEdit::new(row_index, column.trim(), value))?;
    }

    let saved = session.save_edits().await?;
    println!("Saved {} row(s) in {}", saved, table);
    Ok(())
}
