use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::instrument;

use warehouse_auth::{NewUser, Role, User};
use warehouse_core::UserId;

use super::UserStore;
use crate::pg::{is_unique_violation, map_sqlx_error};
use crate::StoreError;

#[derive(Debug, Clone)]
pub struct PostgresUserStore {
    pool: PgPool,
}

impl PostgresUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl UserStore for PostgresUserStore {
    #[instrument(skip(self), err)]
    async fn get_by_username(&self, username: &str) -> Result<User, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, username, password_hash, role, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_user", e))?;

        let Some(row) = row else {
            return Err(StoreError::InvalidCredentials);
        };

        let read = |e: sqlx::Error| StoreError::backend(format!("failed to deserialize user row: {}", e));
        let id: i64 = row.try_get("id").map_err(read)?;
        let role: String = row.try_get("role").map_err(read)?;
        let role: Role = role
            .parse()
            .map_err(|e| StoreError::backend(format!("user {}: {}", id, e)))?;

        Ok(User {
            id: UserId::new(id),
            username: row.try_get("username").map_err(read)?,
            password_hash: row.try_get("password_hash").map_err(read)?,
            role,
            created_at: row.try_get("created_at").map_err(read)?,
        })
    }

    #[instrument(skip(self, user), fields(username = %user.username, role = %user.role), err)]
    async fn create(&self, user: NewUser, created_at: DateTime<Utc>) -> Result<User, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO users (username, password_hash, role, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Conflict(format!("username '{}' already exists", user.username))
            } else {
                map_sqlx_error("insert_user", e)
            }
        })?;

        let id: i64 = row
            .try_get("id")
            .map_err(|e| StoreError::backend(format!("failed to read user id: {}", e)))?;

        Ok(User {
            id: UserId::new(id),
            username: user.username,
            password_hash: user.password_hash,
            role: user.role,
            created_at,
        })
    }
}
