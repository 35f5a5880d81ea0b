//! Query-options builder and pager
//!
//! Owns the canonical [`TableQueryOpts`] for one table. Every mutation that
//! changes what is being fetched (filters, search, sort, columns) resets the
//! offset to the first page. Filters and search are mutually exclusive.

use basable_core::{
    Column, CompiledFilter, QueryOrder, Result, TableConfig, TableQueryOpts, TableSearchOpts,
    query_columns,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageDirection {
    Prev,
    Next,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableQueryBuilder {
    table: String,
    offset: usize,
    row_count: usize,
    filters: Option<Vec<CompiledFilter>>,
    search_opts: Option<TableSearchOpts>,
    order_by: Option<QueryOrder>,
    columns: Option<Vec<String>>,
    query_count: Option<usize>,
}

impl TableQueryBuilder {
    pub fn new(table: impl Into<String>, config: &TableConfig, all_columns: &[Column]) -> Self {
        Self {
            table: table.into(),
            offset: 0,
            row_count: config.page_size().max(1),
            filters: None,
            search_opts: None,
            order_by: None,
            columns: query_columns(all_columns, config),
            query_count: None,
        }
    }

    /// Replace the filters. An empty list clears filtering.
    pub fn set_filters(&mut self, filters: Vec<CompiledFilter>) {
        self.filters = (!filters.is_empty()).then_some(filters);
        self.search_opts = None;
        self.offset = 0;
    }

    pub fn set_search(&mut self, opts: TableSearchOpts) -> Result<()> {
        opts.validate()?;
        self.search_opts = Some(opts);
        self.filters = None;
        self.offset = 0;
        Ok(())
    }

    pub fn clear_search(&mut self) {
        self.search_opts = None;
        self.offset = 0;
    }

    /// Sort by `column`, flipping the direction if it is already the sort column.
    pub fn set_order_by(&mut self, column: &str) {
        self.order_by = Some(match &self.order_by {
            Some(order) if order.column() == column => order.flipped(),
            _ => QueryOrder::Asc(column.to_string()),
        });
        self.offset = 0;
    }

    /// Re-derive `columns` and page size after a config change
    pub fn apply_config(&mut self, config: &TableConfig, all_columns: &[Column]) {
        self.columns = query_columns(all_columns, config);
        self.row_count = config.page_size().max(1);
        self.offset = 0;
    }

    pub fn reset_offset(&mut self) {
        self.offset = 0;
    }

    pub fn current_page(&self) -> usize {
        self.offset / self.row_count
    }

    /// `ceil(query_count / row_count)`; 0 while the count is unknown
    pub fn total_pages(&self) -> usize {
        self.query_count
            .map(|count| count.div_ceil(self.row_count))
            .unwrap_or(0)
    }

    pub fn can_navigate(&self, direction: PageDirection) -> bool {
        match direction {
            PageDirection::Prev => self.current_page() > 0,
            PageDirection::Next => self.current_page() + 1 < self.total_pages(),
        }
    }

    /// Move one page. Returns false (and leaves the offset alone) at either end.
    pub fn navigate(&mut self, direction: PageDirection) -> bool {
        if !self.can_navigate(direction) {
            return false;
        }
        match direction {
            PageDirection::Prev => self.offset -= self.row_count,
            PageDirection::Next => self.offset += self.row_count,
        }
        true
    }

    /// The count is refetched on the first page, and whenever it was never fetched.
    pub fn needs_count(&self) -> bool {
        self.offset == 0 || self.query_count.is_none()
    }

    pub fn set_query_count(&mut self, count: usize) {
        self.query_count = Some(count);
    }

    pub fn query_opts(&self) -> TableQueryOpts {
        TableQueryOpts {
            table: self.table.clone(),
            offset: self.offset,
            row_count: self.row_count,
            filters: self.filters.clone(),
            columns: self.columns.clone(),
            order_by: self.order_by.clone(),
            search_opts: self.search_opts.clone(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn query_count(&self) -> Option<usize> {
        self.query_count
    }

    pub fn filters(&self) -> Option<&[CompiledFilter]> {
        self.filters.as_deref()
    }

    pub fn search_opts(&self) -> Option<&TableSearchOpts> {
        self.search_opts.as_ref()
    }

    pub fn order_by(&self) -> Option<&QueryOrder> {
        self.order_by.as_ref()
    }
}
