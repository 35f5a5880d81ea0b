//! Request and response contracts exchanged with the backend

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::{EnumString, IntoStaticStr};

use crate::error::{BasableError, Result};
use crate::filter::CompiledFilter;

/// Sort column and direction, `{"ASC": "id"}` on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryOrder {
    #[serde(rename = "ASC")]
    Asc(String),
    #[serde(rename = "DESC")]
    Desc(String),
}

impl QueryOrder {
    pub fn column(&self) -> &str {
        match self {
            Self::Asc(column) | Self::Desc(column) => column,
        }
    }

    pub fn is_descending(&self) -> bool {
        matches!(self, Self::Desc(_))
    }

    /// Same column, opposite direction
    pub fn flipped(&self) -> Self {
        match self {
            Self::Asc(column) => Self::Desc(column.clone()),
            Self::Desc(column) => Self::Asc(column.clone()),
        }
    }
}

/// Free-text search over a set of columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSearchOpts {
    pub search_cols: Vec<String>,
    pub query: String,
}

impl TableSearchOpts {
    pub fn new(search_cols: Vec<String>, query: impl Into<String>) -> Result<Self> {
        let opts = Self {
            search_cols,
            query: query.into(),
        };
        opts.validate()?;
        Ok(opts)
    }

    pub fn validate(&self) -> Result<()> {
        if self.search_cols.is_empty() || self.query.trim().is_empty() {
            return Err(BasableError::EmptySearch);
        }
        Ok(())
    }
}

/// The single request contract used for both row data and row count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableQueryOpts {
    pub table: String,
    pub offset: usize,
    pub row_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Vec<CompiledFilter>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<QueryOrder>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_opts: Option<TableSearchOpts>,
}

impl TableQueryOpts {
    pub fn is_search_mode(&self) -> bool {
        self.search_opts.is_some()
    }
}

/// Export formats offered by the backend
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum DownloadFormat {
    #[default]
    Csv,
    Tsv,
    Psv,
    Text,
    Json,
    Html,
    Xml,
}

impl DownloadFormat {
    pub fn all() -> &'static [DownloadFormat] {
        &[
            Self::Csv,
            Self::Tsv,
            Self::Psv,
            Self::Text,
            Self::Json,
            Self::Html,
            Self::Xml,
        ]
    }

    pub fn label(&self) -> &'static str {
        self.into()
    }

    pub fn parse(value: &str) -> Result<Self> {
        value
            .trim()
            .parse()
            .map_err(|_| BasableError::UnknownFormat(value.to_string()))
    }
}

impl std::fmt::Display for DownloadFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Body of `POST tables/data/export/<table>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRequest {
    pub query_opts: TableQueryOpts,
    pub format: DownloadFormat,
}

/// Exported document returned by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportResponse {
    pub data: String,
    pub filename: String,
    pub mimetype: String,
}

/// Batch of cell edits addressed by unique-column value.
///
/// `input[i]` holds the edited columns of the row whose unique value is
/// `unique_values[i]`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpdateTableData {
    pub unique_key: String,
    pub columns: Vec<String>,
    pub unique_values: Vec<String>,
    pub input: Vec<IndexMap<String, String>>,
}
