use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Identity, Role, TokenError};

/// Claim set carried inside a signed token.
///
/// `iat`/`exp` are JWT NumericDate values (whole seconds since the epoch).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub username: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

impl TokenClaims {
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.iat, 0)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    pub fn identity(&self) -> Identity {
        Identity::new(self.username.clone(), self.role)
    }
}

/// Deterministically validate the time window of already-verified claims.
///
/// Signature checking happens in [`crate::TokenManager::verify`] before this runs.
pub fn validate_claims(claims: &TokenClaims, now: DateTime<Utc>) -> Result<(), TokenError> {
    let now = now.timestamp();
    if claims.exp <= claims.iat {
        return Err(TokenError::InvalidTimeWindow);
    }
    if now < claims.iat {
        return Err(TokenError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(TokenError::Expired);
    }
    Ok(())
}
