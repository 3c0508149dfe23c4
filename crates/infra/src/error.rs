use thiserror::Error;

use warehouse_core::Cancelled;
use warehouse_inventory::SnapshotError;

/// Failure of a storage collaborator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("storage failure: {0}")]
    Backend(String),

    #[error("operation cancelled")]
    Cancelled,
}

impl StoreError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    pub(crate) fn poisoned() -> Self {
        Self::Backend("lock poisoned".to_string())
    }
}

impl From<Cancelled> for StoreError {
    fn from(_: Cancelled) -> Self {
        StoreError::Cancelled
    }
}

impl From<SnapshotError> for StoreError {
    fn from(value: SnapshotError) -> Self {
        StoreError::Backend(value.to_string())
    }
}
