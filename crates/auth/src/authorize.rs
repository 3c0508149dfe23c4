use thiserror::Error;

use crate::{Action, Identity, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: role '{role}' may not {action}")]
    Forbidden { role: Role, action: Action },
}

/// Authorize an identity for a single action.
///
/// - No IO
/// - No panics
/// - Pure lookup in the static matrix
pub fn authorize(identity: &Identity, action: Action) -> Result<(), AuthzError> {
    if crate::allows(identity.role, action) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden {
            role: identity.role,
            action,
        })
    }
}
