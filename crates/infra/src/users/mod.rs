//! User account persistence.

mod in_memory;
mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use warehouse_auth::{NewUser, User};

use crate::StoreError;

pub use in_memory::InMemoryUserStore;
pub use postgres::PostgresUserStore;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// `InvalidCredentials` when no such user exists, so lookups cannot be
    /// used to probe for usernames.
    async fn get_by_username(&self, username: &str) -> Result<User, StoreError>;

    /// `Conflict` when the username is taken.
    async fn create(&self, user: NewUser, created_at: DateTime<Utc>) -> Result<User, StoreError>;
}

#[async_trait]
impl<S> UserStore for Arc<S>
where
    S: UserStore + ?Sized,
{
    async fn get_by_username(&self, username: &str) -> Result<User, StoreError> {
        (**self).get_by_username(username).await
    }

    async fn create(&self, user: NewUser, created_at: DateTime<Utc>) -> Result<User, StoreError> {
        (**self).create(user, created_at).await
    }
}
