use beatstore_cloud::payment::PaymentError;
use beatstore_cloud::storage::StorageError;
use beatstore_core::error::CoreError;

use crate::contract::ContractError;

/// Error returned by every workflow.
///
/// Provider failures are folded into [`CoreError::Internal`] so callers only
/// have to map domain and database errors.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<StorageError> for PipelineError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => Self::Core(CoreError::Missing(format!("file {key}"))),
            other => Self::Core(CoreError::Internal(other.to_string())),
        }
    }
}

impl From<PaymentError> for PipelineError {
    fn from(err: PaymentError) -> Self {
        Self::Core(CoreError::Internal(err.to_string()))
    }
}

impl From<ContractError> for PipelineError {
    fn from(err: ContractError) -> Self {
        Self::Core(CoreError::Internal(err.to_string()))
    }
}
