use thiserror::Error;

use warehouse_auth::{AuthzError, RegistrationError, TokenError};
use warehouse_core::{Cancelled, DomainError};

use crate::audit::LedgerError;
use crate::StoreError;

/// Outcome of an application operation, in the vocabulary the transport maps
/// to responses.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error(transparent)]
    Forbidden(#[from] AuthzError),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found")]
    NotFound,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage failure: {0}")]
    Storage(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => ServiceError::Validation(msg),
            DomainError::NotFound => ServiceError::NotFound,
            DomainError::InvalidCredentials => ServiceError::InvalidCredentials,
            DomainError::Conflict(msg) => ServiceError::Conflict(msg),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound => ServiceError::NotFound,
            StoreError::Conflict(msg) => ServiceError::Conflict(msg),
            StoreError::InvalidCredentials => ServiceError::InvalidCredentials,
            StoreError::Backend(msg) => ServiceError::Storage(msg),
            StoreError::Cancelled => ServiceError::Cancelled,
        }
    }
}

impl From<LedgerError> for ServiceError {
    fn from(value: LedgerError) -> Self {
        match value {
            LedgerError::Storage(inner) => inner.into(),
            LedgerError::Cancelled => ServiceError::Cancelled,
        }
    }
}

impl From<Cancelled> for ServiceError {
    fn from(_: Cancelled) -> Self {
        ServiceError::Cancelled
    }
}

impl From<RegistrationError> for ServiceError {
    fn from(value: RegistrationError) -> Self {
        match value {
            RegistrationError::Invalid(domain) => domain.into(),
            RegistrationError::Password(err) => ServiceError::Internal(err.to_string()),
        }
    }
}

impl From<TokenError> for ServiceError {
    fn from(value: TokenError) -> Self {
        ServiceError::Internal(value.to_string())
    }
}
