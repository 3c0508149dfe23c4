//! Schema bootstrap for the Postgres backend.
//!
//! Idempotent: every statement is `IF NOT EXISTS` / `OR REPLACE`, so it runs
//! on every startup.

use sqlx::PgPool;
use tracing::instrument;

use crate::pg::map_sqlx_error;
use crate::StoreError;

const STATEMENTS: &[(&str, &str)] = &[
    (
        "create_users",
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id            BIGSERIAL PRIMARY KEY,
            username      TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            role          TEXT NOT NULL CHECK (role IN ('admin', 'manager', 'viewer')),
            created_at    TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "create_items",
        r#"
        CREATE TABLE IF NOT EXISTS items (
            id          BIGSERIAL PRIMARY KEY,
            name        TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            quantity    BIGINT NOT NULL CHECK (quantity >= 0),
            price       DOUBLE PRECISION NOT NULL CHECK (price >= 0),
            created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            created_by  TEXT,
            updated_by  TEXT,
            deleted_at  TIMESTAMPTZ,
            deleted_by  TEXT
        )
        "#,
    ),
    (
        "create_items_live_index",
        "CREATE INDEX IF NOT EXISTS idx_items_live ON items (created_at DESC) WHERE deleted_at IS NULL",
    ),
    (
        "create_items_history",
        r#"
        CREATE TABLE IF NOT EXISTS items_history (
            id         BIGSERIAL PRIMARY KEY,
            item_id    BIGINT NOT NULL REFERENCES items (id),
            action     TEXT NOT NULL CHECK (action IN ('INSERT', 'UPDATE', 'DELETE')),
            username   TEXT NOT NULL,
            old_data   JSONB,
            new_data   JSONB,
            changed_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "create_history_item_index",
        "CREATE INDEX IF NOT EXISTS idx_items_history_item ON items_history (item_id, changed_at DESC)",
    ),
    (
        "create_history_changed_index",
        "CREATE INDEX IF NOT EXISTS idx_items_history_changed ON items_history (changed_at DESC, id DESC)",
    ),
    (
        "create_history_username_index",
        "CREATE INDEX IF NOT EXISTS idx_items_history_username ON items_history (username)",
    ),
    (
        "history_no_update",
        "CREATE OR REPLACE RULE items_history_no_update AS ON UPDATE TO items_history DO INSTEAD NOTHING",
    ),
    (
        "history_no_delete",
        "CREATE OR REPLACE RULE items_history_no_delete AS ON DELETE TO items_history DO INSTEAD NOTHING",
    ),
];

#[instrument(skip(pool), err)]
pub async fn migrate(pool: &PgPool) -> Result<(), StoreError> {
    for (name, sql) in STATEMENTS {
        sqlx::query(sql)
            .execute(pool)
            .await
            .map_err(|e| map_sqlx_error(name, e))?;
    }
    tracing::info!(statements = STATEMENTS.len(), "database schema ready");
    Ok(())
}
