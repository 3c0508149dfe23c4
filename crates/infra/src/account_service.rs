//! Registration and login.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use warehouse_auth::{normalize_username, NewUser, Role, TokenManager, User};
use warehouse_core::{Clock, RequestScope};

use crate::users::UserStore;
use crate::{ServiceError, StoreError};

/// A successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginOutcome {
    pub token: String,
    pub username: String,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

pub struct AccountService {
    users: Arc<dyn UserStore>,
    tokens: Arc<TokenManager>,
    clock: Arc<dyn Clock>,
}

impl core::fmt::Debug for AccountService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AccountService")
            .field("tokens", &self.tokens)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl AccountService {
    pub fn new(users: Arc<dyn UserStore>, tokens: Arc<TokenManager>, clock: Arc<dyn Clock>) -> Self {
        Self { users, tokens, clock }
    }

    pub async fn register(
        &self,
        scope: &RequestScope,
        username: &str,
        password: &str,
        role: Role,
    ) -> Result<User, ServiceError> {
        let (username, password) = (username.to_string(), password.to_string());
        // Argon2 is deliberately slow; keep it off the async workers.
        let new_user = tokio::task::spawn_blocking(move || NewUser::register(&username, &password, role))
            .await
            .map_err(|e| ServiceError::Internal(format!("password hashing task failed: {e}")))??;

        let user = scope.run(self.users.create(new_user, self.clock.now())).await?;
        tracing::info!(username = %user.username, role = %user.role, "user registered");
        Ok(user)
    }

    pub async fn login(
        &self,
        scope: &RequestScope,
        username: &str,
        password: &str,
    ) -> Result<LoginOutcome, ServiceError> {
        let username = normalize_username(username);
        let user = match scope.run(self.users.get_by_username(username)).await {
            Ok(user) => user,
            Err(StoreError::InvalidCredentials) => {
                tracing::debug!(username, "login rejected: unknown user");
                return Err(ServiceError::InvalidCredentials);
            }
            Err(other) => return Err(other.into()),
        };

        let password = password.to_string();
        let (user, matched) = tokio::task::spawn_blocking(move || {
            let matched = user.check_password(&password);
            (user, matched)
        })
        .await
        .map_err(|e| ServiceError::Internal(format!("password check task failed: {e}")))?;

        if !matched {
            tracing::debug!(username = %user.username, "login rejected: bad password");
            return Err(ServiceError::InvalidCredentials);
        }

        let now = self.clock.now();
        let token = self.tokens.issue(&user.username, user.role, now)?;
        tracing::info!(username = %user.username, role = %user.role, "user logged in");

        Ok(LoginOutcome {
            token,
            username: user.username,
            role: user.role,
            expires_at: self.tokens.expires_at(now),
        })
    }
}
