//! Postgres-backed item store.
//!
//! Each mutation runs in one transaction: lock the row (`FOR UPDATE`), write
//! the change, append the history record through the audit module, commit.
//! If the surrounding future is dropped before commit the transaction rolls
//! back and neither the change nor its record is kept.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Row};
use tracing::instrument;

use warehouse_core::ItemId;
use warehouse_inventory::{AuditStamp, Item, ItemChange, ItemDraft, NewHistoryRecord};

use super::{Audited, ItemStore};
use crate::audit::insert_record;
use crate::pg::map_sqlx_error;
use crate::StoreError;

const ITEM_COLUMNS: &str = "id, name, description, quantity, price, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PostgresItemStore {
    pool: PgPool,
}

impl PostgresItemStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn lock_live_item(conn: &mut PgConnection, id: ItemId) -> Result<Item, StoreError> {
    let row = sqlx::query(&format!(
        "SELECT {ITEM_COLUMNS} FROM items WHERE id = $1 AND deleted_at IS NULL FOR UPDATE"
    ))
    .bind(id.get())
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("lock_item", e))?;

    match row {
        Some(row) => item_from_row(&row),
        None => Err(StoreError::NotFound),
    }
}

#[async_trait::async_trait]
impl ItemStore for PostgresItemStore {
    #[instrument(skip(self, draft, stamp), fields(actor = %stamp.actor), err)]
    async fn create(&self, draft: ItemDraft, stamp: &AuditStamp) -> Result<Audited<Item>, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO items (name, description, quantity, price, created_at, updated_at, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $5, $5, $6, $6)
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(draft.quantity)
        .bind(draft.price)
        .bind(stamp.changed_at)
        .bind(&stamp.actor)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_item", e))?;
        let item = item_from_row(&row)?;

        let record = insert_record(
            &mut tx,
            NewHistoryRecord::new(ItemChange::Insert { new: item.clone() }, stamp),
        )
        .await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(Audited { value: item, record })
    }

    #[instrument(skip(self), fields(item_id = %id), err)]
    async fn get_by_id(&self, id: ItemId) -> Result<Item, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_item", e))?;

        match row {
            Some(row) => item_from_row(&row),
            None => Err(StoreError::NotFound),
        }
    }

    #[instrument(skip(self), err)]
    async fn get_all(&self) -> Result<Vec<Item>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE deleted_at IS NULL ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_items", e))?;

        rows.iter().map(item_from_row).collect()
    }

    #[instrument(skip(self, draft, stamp), fields(item_id = %id, actor = %stamp.actor), err)]
    async fn update(
        &self,
        id: ItemId,
        draft: ItemDraft,
        stamp: &AuditStamp,
    ) -> Result<Audited<Item>, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let old = lock_live_item(&mut tx, id).await?;
        let new = old.revised(draft, stamp.changed_at);

        sqlx::query(
            r#"
            UPDATE items
            SET name = $1, description = $2, quantity = $3, price = $4,
                updated_at = $5, updated_by = $6
            WHERE id = $7
            "#,
        )
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.quantity)
        .bind(new.price)
        .bind(new.updated_at)
        .bind(&stamp.actor)
        .bind(id.get())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_item", e))?;

        let record = insert_record(
            &mut tx,
            NewHistoryRecord::new(
                ItemChange::Update {
                    old,
                    new: new.clone(),
                },
                stamp,
            ),
        )
        .await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(Audited { value: new, record })
    }

    #[instrument(skip(self, stamp), fields(item_id = %id, actor = %stamp.actor), err)]
    async fn delete(&self, id: ItemId, stamp: &AuditStamp) -> Result<Audited<Item>, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let old = lock_live_item(&mut tx, id).await?;

        sqlx::query("UPDATE items SET deleted_at = $1, deleted_by = $2 WHERE id = $3")
            .bind(stamp.changed_at)
            .bind(&stamp.actor)
            .bind(id.get())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_item", e))?;

        let record = insert_record(
            &mut tx,
            NewHistoryRecord::new(ItemChange::Delete { old: old.clone() }, stamp),
        )
        .await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(Audited { value: old, record })
    }
}

fn item_from_row(row: &PgRow) -> Result<Item, StoreError> {
    let read = |e: sqlx::Error| StoreError::backend(format!("failed to deserialize item row: {}", e));

    let id: i64 = row.try_get("id").map_err(read)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(read)?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(read)?;

    Ok(Item {
        id: ItemId::new(id),
        name: row.try_get("name").map_err(read)?,
        description: row.try_get("description").map_err(read)?,
        quantity: row.try_get("quantity").map_err(read)?,
        price: row.try_get("price").map_err(read)?,
        created_at,
        updated_at,
    })
}
