//! Common test utilities and mocks

#![allow(dead_code)]

use async_trait::async_trait;
use basable_core::{
    BasableError, Column, ColumnValue, ExportRequest, ExportResponse, Result, TableBackend,
    TableConfig, TableConfigPatch, TableQueryOpts, TableRow, UpdateTableData,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::Notify;

/// A request received by [`MockBackend`]
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Columns(String),
    TableConfigs,
    TableConfig(String),
    SaveConfig(String, TableConfigPatch),
    Count(TableQueryOpts),
    Rows(TableQueryOpts),
    Update(String, UpdateTableData),
    Clear(String),
    Drop(String),
    Export(ExportRequest),
}

/// Holds one `query_rows` or `update_rows` call until released.
#[derive(Default)]
pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
}

/// In-memory backend serving one table.
///
/// Row queries return the slice `offset..offset + row_count` of the scripted
/// rows; counts return the number of scripted rows.
pub struct MockBackend {
    pub columns: Vec<Column>,
    pub config: Mutex<Option<TableConfig>>,
    pub rows: Mutex<Vec<TableRow>>,
    pub should_fail: Mutex<bool>,
    pub reject_auth: bool,
    pub gate: Mutex<Option<Arc<Gate>>>,
    /// Log of all requests, for assertion in tests
    pub request_log: Arc<Mutex<Vec<Request>>>,
}

impl MockBackend {
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            config: Mutex::new(None),
            rows: Mutex::new(Vec::new()),
            should_fail: Mutex::new(false),
            reject_auth: false,
            gate: Mutex::new(None),
            request_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_config(self, config: TableConfig) -> Self {
        *self.config.lock() = Some(config);
        self
    }

    pub fn with_rows(self, rows: Vec<TableRow>) -> Self {
        *self.rows.lock() = rows;
        self
    }

    pub fn with_failure(self) -> Self {
        self.set_failing(true);
        self
    }

    pub fn with_auth_rejection(mut self) -> Self {
        self.reject_auth = true;
        self
    }

    pub fn set_failing(&self, failing: bool) {
        *self.should_fail.lock() = failing;
    }

    /// Hold the next row query or update until `Gate::release` is notified
    pub fn arm_gate(&self) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        *self.gate.lock() = Some(gate.clone());
        gate
    }

    pub fn request_log(&self) -> Vec<Request> {
        self.request_log.lock().clone()
    }

    pub fn clear_log(&self) {
        self.request_log.lock().clear();
    }

    pub fn row_queries(&self) -> Vec<TableQueryOpts> {
        self.request_log()
            .into_iter()
            .filter_map(|r| match r {
                Request::Rows(opts) => Some(opts),
                _ => None,
            })
            .collect()
    }

    pub fn count_queries(&self) -> usize {
        self.request_log()
            .iter()
            .filter(|r| matches!(r, Request::Count(_)))
            .count()
    }

    async fn wait_at_gate(&self) {
        let gate = self.gate.lock().take();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
    }

    fn log(&self, request: Request) {
        self.request_log.lock().push(request);
    }

    fn check(&self) -> Result<()> {
        if self.reject_auth {
            return Err(BasableError::Unauthorized {
                status: 401,
                message: "session expired".into(),
            });
        }
        if *self.should_fail.lock() {
            return Err(BasableError::Backend {
                status: 500,
                message: "mock failure".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl TableBackend for MockBackend {
    async fn columns(&self, table: &str) -> Result<Vec<Column>> {
        self.log(Request::Columns(table.to_string()));
        self.check()?;
        Ok(self.columns.clone())
    }

    async fn table_configs(&self) -> Result<Vec<TableConfig>> {
        self.log(Request::TableConfigs);
        self.check()?;
        Ok(self.config.lock().clone().into_iter().collect())
    }

    async fn table_config(&self, table: &str) -> Result<TableConfig> {
        self.log(Request::TableConfig(table.to_string()));
        self.check()?;
        self.config
            .lock()
            .clone()
            .filter(|c| c.name == table)
            .ok_or_else(|| BasableError::Backend {
                status: 404,
                message: "configuration not found".into(),
            })
    }

    async fn save_table_config(&self, table: &str, patch: &TableConfigPatch) -> Result<()> {
        self.log(Request::SaveConfig(table.to_string(), patch.clone()));
        self.check()?;
        self.config
            .lock()
            .get_or_insert_with(|| TableConfig::new(table))
            .merge(patch);
        Ok(())
    }

    async fn query_count(&self, opts: &TableQueryOpts) -> Result<usize> {
        self.log(Request::Count(opts.clone()));
        self.check()?;
        Ok(self.rows.lock().len())
    }

    async fn query_rows(&self, opts: &TableQueryOpts) -> Result<Vec<TableRow>> {
        self.log(Request::Rows(opts.clone()));
        self.wait_at_gate().await;

        self.check()?;
        let rows = self.rows.lock();
        Ok(rows
            .iter()
            .skip(opts.offset)
            .take(opts.row_count)
            .cloned()
            .collect())
    }

    async fn update_rows(&self, table: &str, batch: &UpdateTableData) -> Result<()> {
        self.log(Request::Update(table.to_string(), batch.clone()));
        self.wait_at_gate().await;
        self.check()
    }

    async fn clear_table(&self, table: &str) -> Result<()> {
        self.log(Request::Clear(table.to_string()));
        self.check()?;
        self.rows.lock().clear();
        Ok(())
    }

    async fn drop_table(&self, table: &str) -> Result<()> {
        self.log(Request::Drop(table.to_string()));
        self.check()
    }

    async fn export(&self, request: &ExportRequest) -> Result<ExportResponse> {
        self.log(Request::Export(request.clone()));
        self.check()?;
        Ok(ExportResponse {
            data: "id,total,status\n".into(),
            filename: format!("{}.{}", request.query_opts.table, request.format.label().to_lowercase()),
            mimetype: "text/csv".into(),
        })
    }
}

pub fn order_columns() -> Vec<Column> {
    vec![
        Column::new("id", "int").primary(),
        Column::new("total", "decimal"),
        Column::new("status", "varchar"),
    ]
}

pub fn orders_config(page_size: usize) -> TableConfig {
    TableConfig {
        unique_column: Some("id".into()),
        items_per_page: Some(page_size),
        ..TableConfig::new("orders")
    }
}

/// `count` order rows with ids `1..=count`
pub fn order_rows(count: usize) -> Vec<TableRow> {
    (1..=count)
        .map(|id| {
            TableRow::from([
                ("id".to_string(), ColumnValue::Int(id as i64)),
                ("total".to_string(), ColumnValue::Double(id as f64 * 10.0)),
                (
                    "status".to_string(),
                    ColumnValue::Text(if id % 2 == 0 { "paid" } else { "new" }.into()),
                ),
            ])
        })
        .collect()
}

/// Backend serving an `orders` table with `count` rows
pub fn orders_backend(count: usize, page_size: usize) -> Arc<MockBackend> {
    Arc::new(
        MockBackend::new(order_columns())
            .with_config(orders_config(page_size))
            .with_rows(order_rows(count)),
    )
}
