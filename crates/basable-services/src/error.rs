use basable_core::BasableError;
use thiserror::Error;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service-level errors, tagged with the operation that failed
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Invalid(BasableError),

    #[error("Loading table data failed: {0}")]
    LoadFailed(BasableError),

    #[error("Saving edits failed: {0}")]
    SaveFailed(BasableError),

    #[error("Export failed: {0}")]
    ExportFailed(BasableError),

    #[error("Updating table configuration failed: {0}")]
    ConfigFailed(BasableError),

    #[error("Table operation failed: {0}")]
    TableOperationFailed(BasableError),

    #[error("Table `{0}` has no usable unique column; edits cannot be saved")]
    ReadOnly(String),

    #[error("No table is open")]
    NoTableSelected,

    #[error("Invalid edit: {0}")]
    InvalidEdit(String),
}

impl ServiceError {
    fn source_error(&self) -> Option<&BasableError> {
        match self {
            Self::Invalid(e)
            | Self::LoadFailed(e)
            | Self::SaveFailed(e)
            | Self::ExportFailed(e)
            | Self::ConfigFailed(e)
            | Self::TableOperationFailed(e) => Some(e),
            Self::ReadOnly(_) | Self::NoTableSelected | Self::InvalidEdit(_) => None,
        }
    }

    /// The backend refused the session; the caller should log out.
    pub fn is_auth_rejection(&self) -> bool {
        self.source_error()
            .is_some_and(BasableError::is_auth_rejection)
    }

    /// Rejected locally before any request was sent
    pub fn is_validation(&self) -> bool {
        match self {
            Self::InvalidEdit(_) => true,
            _ => self.source_error().is_some_and(BasableError::is_validation),
        }
    }
}

impl From<BasableError> for ServiceError {
    fn from(error: BasableError) -> Self {
        Self::Invalid(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_rejection_is_visible_through_operation_tag() {
        let error = ServiceError::LoadFailed(BasableError::Unauthorized {
            status: 401,
            message: "expired".into(),
        });
        assert!(error.is_auth_rejection());
        assert!(!error.is_validation());
        assert!(!ServiceError::NoTableSelected.is_auth_rejection());
    }

    #[test]
    fn local_checks_are_validation_errors() {
        assert!(ServiceError::from(BasableError::EmptySearch).is_validation());
        assert!(ServiceError::InvalidEdit("row 9".into()).is_validation());
    }
}
