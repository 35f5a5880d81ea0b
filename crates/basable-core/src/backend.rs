//! Backend trait: the HTTP JSON API the dashboard talks to

use async_trait::async_trait;

use crate::{
    Column, ExportRequest, ExportResponse, Result, TableConfig, TableConfigPatch, TableQueryOpts,
    TableRow, UpdateTableData,
};

/// Remote table operations.
///
/// Implementations own transport, headers and session credentials. Every
/// method maps to one request; nothing here retries.
#[async_trait]
pub trait TableBackend: Send + Sync {
    /// `GET columns?table=<name>`
    async fn columns(&self, table: &str) -> Result<Vec<Column>>;

    /// `GET tables/configurations`
    async fn table_configs(&self) -> Result<Vec<TableConfig>>;

    /// `GET tables/configurations/<name>`
    async fn table_config(&self, table: &str) -> Result<TableConfig>;

    /// `PATCH tables/configurations/<name>`
    async fn save_table_config(&self, table: &str, patch: &TableConfigPatch) -> Result<()>;

    /// `POST tables/query-result-count/<name>`
    async fn query_count(&self, opts: &TableQueryOpts) -> Result<usize>;

    /// `POST tables/query-data/<name>`
    async fn query_rows(&self, opts: &TableQueryOpts) -> Result<Vec<TableRow>>;

    /// `PATCH tables/data/<name>`
    async fn update_rows(&self, table: &str, batch: &UpdateTableData) -> Result<()>;

    /// `DELETE tables/data/clear/<name>`
    async fn clear_table(&self, table: &str) -> Result<()>;

    /// `DELETE tables/drop/<name>`
    async fn drop_table(&self, table: &str) -> Result<()>;

    /// `POST tables/data/export/<name>`
    async fn export(&self, request: &ExportRequest) -> Result<ExportResponse>;
}
