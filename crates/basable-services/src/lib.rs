//! Basable Services Layer
//!
//! Stateful orchestration on top of [`basable_core`]: the pieces a dashboard
//! (or the CLI) drives while a user browses and edits a table.
//!
//! # Architecture
//!
//! ```text
//! Dashboard / CLI (basable-cli)
//!     ↓
//! Service Layer (basable-services) ← This crate
//!     ↓
//! Domain Layer (basable-core: filters, projection, inference)
//!     ↓
//! TableBackend (basable-http)
//! ```
//!
//! # Components
//!
//! - [`TableSession`] - the open table: reload, paging, filters, search, sort,
//!   edits, export, config updates
//! - [`TableQueryBuilder`] - query options and pager
//! - [`EditTracker`] / [`EditBatch`] - unsaved cell edits keyed by unique value
//! - [`TableConfigStore`] - table configurations keyed by name
//!
//! Sessions and stores are plain values handed to whoever needs them; there
//! is no global state. Logout is an explicit [`TableSession::logout`].

mod edit_batch;
mod error;
mod query_builder;
mod session;
mod store;

pub use edit_batch::{CellEdit, EditBatch, EditOutcome, EditTracker};
pub use error::{ServiceError, ServiceResult};
pub use query_builder::{PageDirection, TableQueryBuilder};
pub use session::{LoadOutcome, TableSession};
pub use store::TableConfigStore;
