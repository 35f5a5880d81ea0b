//! HTTP client for the Basable API
//!
//! [`HttpBackend`] implements [`basable_core::TableBackend`] over reqwest and
//! attaches the session headers the server expects. [`ClientConfig`] is read
//! from `config.toml` with `BASABLE_*` environment overrides.

mod client;
mod config;

pub use client::HttpBackend;
pub use config::{ClientConfig, SessionCredentials};
