//! Table session
//!
//! [`TableSession`] owns the state of the table currently open in the
//! dashboard: query options, filter rows, the loaded page, inferred column
//! types and unsaved edits.
//!
//! Every operation that refetches data applies its change to the query state
//! at once, then fetches under a new request epoch. Overlapping operations
//! therefore build on each other. Rows and counts are committed only if no
//! newer operation started while the request was in flight; otherwise the
//! response is dropped and the caller gets [`LoadOutcome::Superseded`]. A
//! failed request puts the query state back as it was, unless a newer
//! operation has built on it since.

use std::sync::Arc;

use basable_core::{
    BasableError, Column, ColumnTypes, CompiledFilter, DownloadFormat, ExportRequest,
    ExportResponse, FilterInput, FilterList, Projection, TableBackend, TableConfig,
    TableConfigPatch, TableEditMode, TableQueryOpts, TableRow, TableSearchOpts, UpdateTableData,
    resolve_projection, searchable_columns,
};
use parking_lot::Mutex;

use crate::edit_batch::{CellEdit, EditOutcome, EditTracker};
use crate::error::{ServiceError, ServiceResult};
use crate::query_builder::{PageDirection, TableQueryBuilder};
use crate::store::TableConfigStore;

/// Result of an operation that refetches the current page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// New rows are in place
    Applied { rows: usize, total: Option<usize> },
    /// A newer operation started before this response arrived; it was dropped
    Superseded,
    /// Nothing to fetch (e.g. next page on the last page)
    Unchanged,
}

impl LoadOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

#[derive(Debug, Clone)]
struct ActiveTable {
    config: TableConfig,
    all_columns: Vec<Column>,
    projection: Projection,
    builder: TableQueryBuilder,
    filters: FilterList,
    rows: Vec<TableRow>,
    /// Rows as last fetched or saved, for discarding edits
    loaded_rows: Vec<TableRow>,
    column_types: Option<ColumnTypes>,
    edits: EditTracker,
}

impl ActiveTable {
    fn new(config: TableConfig, all_columns: Vec<Column>) -> Self {
        let projection = resolve_projection(&all_columns, &config);
        let builder = TableQueryBuilder::new(config.name.clone(), &config, &all_columns);
        let edits = EditTracker::for_mode(&projection.edit_mode);
        Self {
            config,
            all_columns,
            projection,
            builder,
            filters: FilterList::new(),
            rows: Vec::new(),
            loaded_rows: Vec::new(),
            column_types: None,
            edits,
        }
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    fn column_names(&self) -> Vec<&str> {
        self.all_columns.iter().map(|c| c.name.as_str()).collect()
    }

    fn has_column(&self, column: &str) -> bool {
        self.all_columns.iter().any(|c| c.name == column)
    }

    /// Install `draft` as the query state, returning the previous one.
    fn install(&mut self, draft: QueryDraft) -> QueryDraft {
        QueryDraft {
            builder: std::mem::replace(&mut self.builder, draft.builder),
            filters: std::mem::replace(&mut self.filters, draft.filters),
        }
    }

    /// Swap in a new config; pending edits survive only if the unique column is unchanged.
    fn apply_config(&mut self, config: TableConfig) {
        let projection = resolve_projection(&self.all_columns, &config);
        if projection.edit_mode != self.projection.edit_mode {
            if self.edits.has_pending() {
                tracing::warn!(
                    table = %config.name,
                    "Edit mode changed; discarding unsaved edits"
                );
            }
            self.edits = EditTracker::for_mode(&projection.edit_mode);
            self.rows = self.loaded_rows.clone();
        }
        self.builder.apply_config(&config, &self.all_columns);
        self.projection = projection;
        self.config = config;
    }
}

/// Query state of the open table, mutated as a unit
#[derive(Debug, Clone)]
struct QueryDraft {
    builder: TableQueryBuilder,
    filters: FilterList,
}

impl QueryDraft {
    fn of(table: &ActiveTable) -> Self {
        Self {
            builder: table.builder.clone(),
            filters: table.filters.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct SessionState {
    /// Bumped by every fetch; a response is current only while it matches
    epoch: u64,
    /// Bumped by opening or closing a table
    generation: u64,
    table: Option<ActiveTable>,
}

/// The open table and everything needed to query and edit it
pub struct TableSession {
    backend: Arc<dyn TableBackend>,
    store: Arc<TableConfigStore>,
    state: Mutex<SessionState>,
}

impl TableSession {
    pub fn new(backend: Arc<dyn TableBackend>, store: Arc<TableConfigStore>) -> Self {
        Self {
            backend,
            store,
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn store(&self) -> &Arc<TableConfigStore> {
        &self.store
    }

    /// Fetch every table configuration into the store
    #[tracing::instrument(skip(self))]
    pub async fn load_configs(&self) -> ServiceResult<Vec<TableConfig>> {
        let configs = self
            .backend
            .table_configs()
            .await
            .map_err(ServiceError::ConfigFailed)?;
        tracing::info!(tables = configs.len(), "Loaded table configurations");
        self.store.set_configs(configs.clone());
        Ok(configs)
    }

    /// Open `table` on its first page, replacing whatever was open.
    ///
    /// The new table is installed as soon as its columns and configuration
    /// arrive, before its first page is fetched, so operations issued from
    /// then on act on it. If the page fetch fails the previous table is
    /// restored.
    #[tracing::instrument(skip(self))]
    pub async fn open_table(&self, table: &str) -> ServiceResult<LoadOutcome> {
        let generation = {
            let mut state = self.state.lock();
            state.generation += 1;
            state.generation
        };

        let (columns, config) = tokio::try_join!(self.backend.columns(table), self.fetch_config(table))
            .map_err(ServiceError::LoadFailed)?;

        let (epoch, builder, previous) = {
            let mut state = self.state.lock();
            if state.generation != generation {
                tracing::debug!(table, generation, "Discarding superseded table open");
                return Ok(LoadOutcome::Superseded);
            }
            let active = ActiveTable::new(config, columns);
            self.store.add_config(active.config.clone());
            let builder = active.builder.clone();
            let previous = state.table.replace(active);
            state.epoch += 1;
            (state.epoch, builder, previous)
        };

        let fetched = self.fetch_page(&builder).await;

        let mut state = self.state.lock();
        let current = state.epoch == epoch;
        match fetched {
            Ok((count, rows)) => {
                let Some(table_state) = state.table.as_mut().filter(|_| current) else {
                    tracing::debug!(table, epoch, "Discarding stale first page");
                    return Ok(LoadOutcome::Superseded);
                };
                let outcome = Self::commit_page(table_state, count, rows);
                tracing::info!(
                    table,
                    columns = table_state.projection.columns.len(),
                    editable = table_state.projection.edit_mode.is_editable(),
                    "Opened table"
                );
                Ok(outcome)
            }
            Err(e) => {
                if current {
                    state.table = previous;
                }
                Err(ServiceError::LoadFailed(e))
            }
        }
    }

    /// Close the open table. In-flight requests for it are dropped on arrival.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.epoch += 1;
        state.generation += 1;
        if let Some(table) = state.table.take() {
            tracing::info!(table = %table.name(), "Closed table");
        }
    }

    /// Total reset: close the table and forget every stored configuration
    pub fn logout(&self) {
        self.close();
        self.store.reset();
    }

    /// Append a filter row and reload from the first page.
    pub async fn add_filter(&self, filter: FilterInput) -> ServiceResult<LoadOutcome> {
        self.reload_with(|draft, table| {
            draft.filters.push(filter)?;
            let compiled = draft.filters.compile(&table.column_names())?;
            draft.builder.set_filters(compiled);
            Ok(true)
        })
        .await
    }

    /// Remove the filter row at `index`. The next row becomes the anchor.
    pub async fn remove_filter(&self, index: usize) -> ServiceResult<LoadOutcome> {
        self.reload_with(|draft, table| {
            if draft.filters.remove_at(index).is_none() {
                return Ok(false);
            }
            let compiled = draft.filters.compile(&table.column_names())?;
            draft.builder.set_filters(compiled);
            Ok(true)
        })
        .await
    }

    /// Replace all filter rows at once
    pub async fn set_filters(&self, filters: Vec<FilterInput>) -> ServiceResult<LoadOutcome> {
        self.reload_with(|draft, table| {
            let list = FilterList::try_from(filters)?;
            let compiled = list.compile(&table.column_names())?;
            draft.filters = list;
            draft.builder.set_filters(compiled);
            Ok(true)
        })
        .await
    }

    pub async fn clear_filters(&self) -> ServiceResult<LoadOutcome> {
        self.reload_with(|draft, _| {
            draft.filters.clear();
            draft.builder.set_filters(Vec::new());
            Ok(true)
        })
        .await
    }

    /// Free-text search. With no explicit columns, every searchable column
    /// of the projection is searched. Clears any filters.
    pub async fn search(
        &self,
        query: &str,
        columns: Option<Vec<String>>,
    ) -> ServiceResult<LoadOutcome> {
        self.reload_with(|draft, table| {
            let search_cols = match columns {
                Some(columns) => {
                    if let Some(unknown) = columns.iter().find(|c| !table.has_column(c)) {
                        return Err(BasableError::UnknownColumn(unknown.clone()).into());
                    }
                    columns
                }
                None => {
                    let candidates: Vec<String> = table
                        .projection
                        .columns
                        .iter()
                        .map(|c| c.name.clone())
                        .collect();
                    searchable_columns(table.column_types.as_ref(), &candidates)
                        .into_iter()
                        .map(str::to_string)
                        .collect()
                }
            };
            draft
                .builder
                .set_search(TableSearchOpts::new(search_cols, query)?)?;
            draft.filters.clear();
            Ok(true)
        })
        .await
    }

    pub async fn clear_search(&self) -> ServiceResult<LoadOutcome> {
        self.reload_with(|draft, _| {
            if draft.builder.search_opts().is_none() {
                return Ok(false);
            }
            draft.builder.clear_search();
            Ok(true)
        })
        .await
    }

    /// Sort by `column`; sorting by the active sort column flips its direction.
    pub async fn sort_by(&self, column: &str) -> ServiceResult<LoadOutcome> {
        self.reload_with(|draft, table| {
            if !table.has_column(column) {
                return Err(BasableError::UnknownColumn(column.to_string()).into());
            }
            draft.builder.set_order_by(column);
            Ok(true)
        })
        .await
    }

    pub async fn next_page(&self) -> ServiceResult<LoadOutcome> {
        self.navigate(PageDirection::Next).await
    }

    pub async fn prev_page(&self) -> ServiceResult<LoadOutcome> {
        self.navigate(PageDirection::Prev).await
    }

    pub async fn navigate(&self, direction: PageDirection) -> ServiceResult<LoadOutcome> {
        self.reload_with(|draft, _| Ok(draft.builder.navigate(direction)))
            .await
    }

    /// Refetch the current page with the current options
    pub async fn reload(&self) -> ServiceResult<LoadOutcome> {
        self.reload_with(|_, _| Ok(true)).await
    }

    /// Edit a cell of the loaded page. The row updates immediately; the edit
    /// is staged for [`save_edits`](Self::save_edits) when the table is editable.
    pub fn apply_edit(&self, edit: CellEdit) -> ServiceResult<EditOutcome> {
        let mut state = self.state.lock();
        let table = state.table.as_mut().ok_or(ServiceError::NoTableSelected)?;
        table
            .edits
            .apply_edit(&mut table.rows, &table.loaded_rows, edit)
    }

    /// Send staged edits in one batch. Returns the number of rows saved.
    ///
    /// On failure the batch is kept so the save can be retried.
    #[tracing::instrument(skip(self))]
    pub async fn save_edits(&self) -> ServiceResult<usize> {
        let (table, payload) = {
            let state = self.state.lock();
            let table = state.table.as_ref().ok_or(ServiceError::NoTableSelected)?;
            match &table.edits {
                EditTracker::ReadOnly { unsaved: 0 } => return Ok(0),
                EditTracker::ReadOnly { .. } => {
                    return Err(ServiceError::ReadOnly(table.name().to_string()));
                }
                EditTracker::Editable(batch) if batch.is_empty() => return Ok(0),
                EditTracker::Editable(batch) => {
                    (table.name().to_string(), batch.payload().clone())
                }
            }
        };

        self.backend
            .update_rows(&table, &payload)
            .await
            .map_err(ServiceError::SaveFailed)?;

        let saved = payload.unique_values.len();
        let mut state = self.state.lock();
        if let Some(active) = state.table.as_mut().filter(|t| t.name() == table) {
            if active.edits.pending() == Some(&payload) {
                active.edits.reset();
                active.loaded_rows = active.rows.clone();
            } else {
                tracing::debug!(table = %table, "Edits changed during save; keeping batch");
            }
        }
        tracing::info!(table = %table, rows = saved, "Saved edits");
        Ok(saved)
    }

    /// Drop staged edits and restore the rows as last loaded
    pub fn discard_edits(&self) -> ServiceResult<()> {
        let mut state = self.state.lock();
        let table = state.table.as_mut().ok_or(ServiceError::NoTableSelected)?;
        table.edits.reset();
        table.rows = table.loaded_rows.clone();
        Ok(())
    }

    /// Save a partial configuration for the open table, then re-resolve the
    /// projection and reload from the first page.
    #[tracing::instrument(skip(self, patch))]
    pub async fn update_config(&self, patch: TableConfigPatch) -> ServiceResult<LoadOutcome> {
        let table = self.require_table_name()?;
        if patch.is_empty() {
            return Ok(LoadOutcome::Unchanged);
        }

        self.backend
            .save_table_config(&table, &patch)
            .await
            .map_err(ServiceError::ConfigFailed)?;
        let config = self.store.update_config(&table, &patch);
        tracing::info!(table = %table, "Saved table configuration");

        {
            let mut state = self.state.lock();
            match state.table.as_mut().filter(|t| t.name() == table) {
                Some(active) => active.apply_config(config),
                None => return Ok(LoadOutcome::Superseded),
            };
        }

        self.reload().await
    }

    /// Export every row matching the current options
    #[tracing::instrument(skip(self))]
    pub async fn export(&self, format: DownloadFormat) -> ServiceResult<ExportResponse> {
        let query_opts = self
            .query_opts()
            .ok_or(ServiceError::NoTableSelected)?;
        let request = ExportRequest { query_opts, format };
        let response = self
            .backend
            .export(&request)
            .await
            .map_err(ServiceError::ExportFailed)?;
        tracing::info!(filename = %response.filename, bytes = response.data.len(), "Exported table");
        Ok(response)
    }

    /// Delete every row of the open table, then reload from the first page.
    #[tracing::instrument(skip(self))]
    pub async fn clear_table(&self) -> ServiceResult<LoadOutcome> {
        let table = self.require_table_name()?;
        self.backend
            .clear_table(&table)
            .await
            .map_err(ServiceError::TableOperationFailed)?;
        tracing::info!(table = %table, "Cleared table");

        self.reload_with(|draft, _| {
            draft.builder.reset_offset();
            Ok(true)
        })
        .await
    }

    /// Drop the open table and close the session.
    #[tracing::instrument(skip(self))]
    pub async fn drop_table(&self) -> ServiceResult<()> {
        let table = self.require_table_name()?;
        self.backend
            .drop_table(&table)
            .await
            .map_err(ServiceError::TableOperationFailed)?;
        tracing::info!(table = %table, "Dropped table");

        self.store.remove(&table);
        self.close();
        Ok(())
    }

    pub fn table_name(&self) -> Option<String> {
        self.with_table(|t| t.name().to_string())
    }

    /// Every column of the open table, excluded ones included
    pub fn columns(&self) -> Vec<Column> {
        self.with_table(|t| t.all_columns.clone())
            .unwrap_or_default()
    }

    pub fn config(&self) -> Option<TableConfig> {
        self.with_table(|t| t.config.clone())
    }

    pub fn rows(&self) -> Vec<TableRow> {
        self.with_table(|t| t.rows.clone()).unwrap_or_default()
    }

    pub fn projection(&self) -> Option<Projection> {
        self.with_table(|t| t.projection.clone())
    }

    pub fn edit_mode(&self) -> Option<TableEditMode> {
        self.with_table(|t| t.projection.edit_mode.clone())
    }

    pub fn query_opts(&self) -> Option<TableQueryOpts> {
        self.with_table(|t| t.builder.query_opts())
    }

    pub fn filters(&self) -> FilterList {
        self.with_table(|t| t.filters.clone()).unwrap_or_default()
    }

    pub fn compiled_filters(&self) -> Vec<CompiledFilter> {
        self.with_table(|t| t.builder.filters().map(<[_]>::to_vec))
            .flatten()
            .unwrap_or_default()
    }

    pub fn column_types(&self) -> Option<ColumnTypes> {
        self.with_table(|t| t.column_types.clone()).flatten()
    }

    pub fn current_page(&self) -> usize {
        self.with_table(|t| t.builder.current_page()).unwrap_or(0)
    }

    pub fn total_pages(&self) -> usize {
        self.with_table(|t| t.builder.total_pages()).unwrap_or(0)
    }

    pub fn query_count(&self) -> Option<usize> {
        self.with_table(|t| t.builder.query_count()).flatten()
    }

    pub fn pending_edits(&self) -> Option<UpdateTableData> {
        self.with_table(|t| t.edits.pending().cloned()).flatten()
    }

    pub fn has_unsaved_edits(&self) -> bool {
        self.with_table(|t| t.edits.has_pending()).unwrap_or(false)
    }

    fn with_table<T>(&self, f: impl FnOnce(&ActiveTable) -> T) -> Option<T> {
        self.state.lock().table.as_ref().map(f)
    }

    fn require_table_name(&self) -> ServiceResult<String> {
        self.table_name().ok_or(ServiceError::NoTableSelected)
    }

    fn next_epoch(&self) -> u64 {
        let mut state = self.state.lock();
        state.epoch += 1;
        state.epoch
    }

    /// Server config for `table`; tables never configured fall back to the
    /// stored copy or an empty config.
    async fn fetch_config(&self, table: &str) -> basable_core::Result<TableConfig> {
        match self.backend.table_config(table).await {
            Ok(config) => Ok(config),
            Err(BasableError::Backend { status: 404, .. }) => {
                tracing::debug!(table, "No saved configuration; using defaults");
                Ok(self
                    .store
                    .get(table)
                    .unwrap_or_else(|| TableConfig::new(table)))
            }
            Err(e) => Err(e),
        }
    }

    /// Fetch the page described by `builder`, plus the count when it is due.
    async fn fetch_page(
        &self,
        builder: &TableQueryBuilder,
    ) -> basable_core::Result<(Option<usize>, Vec<TableRow>)> {
        let opts = builder.query_opts();
        if builder.needs_count() {
            let (count, rows) = tokio::try_join!(
                self.backend.query_count(&opts),
                self.backend.query_rows(&opts)
            )?;
            Ok((Some(count), rows))
        } else {
            Ok((None, self.backend.query_rows(&opts).await?))
        }
    }

    /// Apply `mutate` to the query state, fetch, and commit the page if no
    /// newer fetch started meanwhile. `mutate` works on a copy so a rejected
    /// change leaves nothing behind, and returns false when there is nothing
    /// to fetch.
    async fn reload_with<F>(&self, mutate: F) -> ServiceResult<LoadOutcome>
    where
        F: FnOnce(&mut QueryDraft, &ActiveTable) -> ServiceResult<bool>,
    {
        let (epoch, builder, snapshot) = {
            let mut state = self.state.lock();
            let table = state.table.as_mut().ok_or(ServiceError::NoTableSelected)?;
            let mut draft = QueryDraft::of(table);
            if !mutate(&mut draft, &*table)? {
                return Ok(LoadOutcome::Unchanged);
            }
            let builder = draft.builder.clone();
            let snapshot = table.install(draft);
            state.epoch += 1;
            (state.epoch, builder, snapshot)
        };

        let fetched = self.fetch_page(&builder).await;

        let mut state = self.state.lock();
        let current = state.epoch == epoch;
        let table = state.table.as_mut().filter(|_| current);
        match (fetched, table) {
            (Ok((count, rows)), Some(table)) => Ok(Self::commit_page(table, count, rows)),
            (Ok(_), None) => {
                tracing::debug!(epoch, "Discarding stale response");
                Ok(LoadOutcome::Superseded)
            }
            (Err(e), Some(table)) => {
                table.install(snapshot);
                Err(ServiceError::LoadFailed(e))
            }
            (Err(e), None) => Err(ServiceError::LoadFailed(e)),
        }
    }

    fn commit_page(table: &mut ActiveTable, count: Option<usize>, rows: Vec<TableRow>) -> LoadOutcome {
        if let Some(count) = count {
            table.builder.set_query_count(count);
        }
        table.column_types = ColumnTypes::from_rows(&rows);
        table.loaded_rows = rows.clone();
        table.rows = rows;

        tracing::debug!(
            table = %table.name(),
            offset = table.builder.offset(),
            rows = table.rows.len(),
            total = ?table.builder.query_count(),
            "Loaded page"
        );

        LoadOutcome::Applied {
            rows: table.rows.len(),
            total: table.builder.query_count(),
        }
    }
}
