//! Basable Core - domain types and query algorithms for the table dashboard
//!
//! This crate holds everything that does not touch the network:
//!
//! - Wire types: [`Column`], [`TableConfig`], [`TableRow`], [`TableQueryOpts`],
//!   [`UpdateTableData`], export request/response
//! - [`filter`] - the operator catalog and the filter compiler
//! - Column type inference from a sample row
//! - Column projection (exclusions, unique column pinned first, edit mode)
//! - [`TableBackend`] - the trait the HTTP client implements

mod backend;
mod column_types;
mod error;
pub mod filter;
mod projection;
mod query;
mod types;

pub use backend::*;
pub use column_types::*;
pub use error::*;
pub use filter::{
    CompiledFilter, Combinator, FilterExpression, FilterInput, FilterList, FilterOperator,
};
pub use projection::*;
pub use query::*;
pub use types::*;
