//! Error types for Basable

use thiserror::Error;

use crate::filter::Combinator;

/// Core error type for Basable operations
///
/// Validation variants are raised before any network call and leave caller
/// state untouched. Transport and backend variants come from the
/// [`TableBackend`](crate::TableBackend) collaborator.
#[derive(Error, Debug)]
pub enum BasableError {
    #[error("Unknown filter operator: {0}")]
    UnknownOperator(String),

    #[error("Filter column must not be empty")]
    EmptyFilterColumn,

    #[error("Column `{0}` does not exist on this table")]
    UnknownColumn(String),

    #[error("Range filter on `{column}` requires both a start and an end value")]
    MissingRangeEnd { column: String },

    #[error("Filter at position {index} cannot use combinator {combinator:?}")]
    InvalidCombinator { index: usize, combinator: Combinator },

    #[error("Search requires at least one column and a non-empty query")]
    EmptySearch,

    #[error("Unknown download format: {0}")]
    UnknownFormat(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request rejected by the server ({status}): {message}")]
    Unauthorized { status: u16, message: String },

    #[error("Server responded with status {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl BasableError {
    /// True for errors raised by local contract checks, before any request is sent.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::UnknownOperator(_)
                | Self::EmptyFilterColumn
                | Self::UnknownColumn(_)
                | Self::MissingRangeEnd { .. }
                | Self::InvalidCombinator { .. }
                | Self::EmptySearch
                | Self::UnknownFormat(_)
        )
    }

    /// True when the backend refused the session (HTTP 401/403). Callers
    /// usually force a logout on these.
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}

/// Result type alias for Basable operations
pub type Result<T> = std::result::Result<T, BasableError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_classified() {
        assert!(BasableError::EmptySearch.is_validation());
        assert!(BasableError::UnknownOperator("BETWEEN".into()).is_validation());
        assert!(!BasableError::Transport("connection reset".into()).is_validation());
    }

    #[test]
    fn auth_rejection_is_detected() {
        let err = BasableError::Unauthorized {
            status: 401,
            message: "token expired".into(),
        };
        assert!(err.is_auth_rejection());
        assert!(!err.is_validation());

        let err = BasableError::Backend {
            status: 500,
            message: "boom".into(),
        };
        assert!(!err.is_auth_rejection());
    }
}
