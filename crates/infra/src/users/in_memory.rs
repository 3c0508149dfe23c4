use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use warehouse_auth::{NewUser, User};
use warehouse_core::UserId;

use super::UserStore;
use crate::StoreError;

#[derive(Debug, Default)]
struct UserTable {
    last_id: i64,
    by_name: HashMap<String, User>,
}

/// In-memory user store (tests/dev).
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    table: RwLock<UserTable>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn get_by_username(&self, username: &str) -> Result<User, StoreError> {
        let table = self.table.read().map_err(|_| StoreError::poisoned())?;
        table
            .by_name
            .get(username)
            .cloned()
            .ok_or(StoreError::InvalidCredentials)
    }

    async fn create(&self, user: NewUser, created_at: DateTime<Utc>) -> Result<User, StoreError> {
        let mut table = self.table.write().map_err(|_| StoreError::poisoned())?;
        if table.by_name.contains_key(&user.username) {
            return Err(StoreError::Conflict(format!(
                "username '{}' already exists",
                user.username
            )));
        }

        table.last_id += 1;
        let stored = User {
            id: UserId::new(table.last_id),
            username: user.username,
            password_hash: user.password_hash,
            role: user.role,
            created_at,
        };
        table.by_name.insert(stored.username.clone(), stored.clone());
        Ok(stored)
    }
}
