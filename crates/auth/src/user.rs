//! User accounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use warehouse_core::{DomainError, UserId};

use crate::{hash_password, verify_password, PasswordError, Role};

pub const MIN_PASSWORD_LEN: usize = 6;

/// Canonical form of a username. Registration and login both go through this.
pub fn normalize_username(raw: &str) -> &str {
    raw.trim()
}

/// Persisted account. The password hash never leaves the process in JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Compare a login attempt against the stored hash.
    ///
    /// An unreadable stored hash counts as a mismatch.
    pub fn check_password(&self, password: &str) -> bool {
        match verify_password(password, &self.password_hash) {
            Ok(matched) => matched,
            Err(err) => {
                tracing::warn!(username = %self.username, error = %err, "stored password hash unreadable");
                false
            }
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error(transparent)]
    Invalid(#[from] DomainError),

    #[error(transparent)]
    Password(#[from] PasswordError),
}

/// Validated registration input, ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
}

impl NewUser {
    /// Validate registration fields and hash the password.
    pub fn register(username: &str, password: &str, role: Role) -> Result<Self, RegistrationError> {
        let username = normalize_username(username);
        if username.is_empty() {
            return Err(DomainError::validation("username must not be empty").into());
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(DomainError::validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            ))
            .into());
        }

        let password_hash = hash_password(password)?;

        Ok(Self {
            username: username.to_string(),
            password_hash,
            role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_hashes_and_trims() {
        let new = NewUser::register("  alice ", "secret1", Role::Manager).unwrap();
        assert_eq!(new.username, "alice");
        assert_ne!(new.password_hash, "secret1");
        assert_eq!(new.role, Role::Manager);
    }

    #[test]
    fn register_rejects_blank_username_and_short_password() {
        assert!(matches!(
            NewUser::register("   ", "secret1", Role::Viewer),
            Err(RegistrationError::Invalid(DomainError::Validation(_)))
        ));
        assert!(matches!(
            NewUser::register("bob", "12345", Role::Viewer),
            Err(RegistrationError::Invalid(DomainError::Validation(_)))
        ));
    }

    #[test]
    fn password_hash_is_not_serialized() {
        let new = NewUser::register("carol", "secret1", Role::Admin).unwrap();
        let user = User {
            id: UserId::new(1),
            username: new.username,
            password_hash: new.password_hash,
            role: new.role,
            created_at: Utc::now(),
        };

        assert!(user.check_password("secret1"));
        assert!(!user.check_password("secret2"));

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "admin");
    }
}
