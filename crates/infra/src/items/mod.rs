//! Item persistence.
//!
//! Every mutation takes an [`AuditStamp`] and returns the history record it
//! produced. The record is written in the same critical section (in memory) or
//! transaction (Postgres) as the mutation, so one is never visible without the
//! other.

mod in_memory;
mod postgres;

use std::sync::Arc;

use async_trait::async_trait;

use warehouse_core::ItemId;
use warehouse_inventory::{AuditStamp, HistoryRecord, Item, ItemDraft};

use crate::StoreError;

pub use in_memory::InMemoryItemStore;
pub use postgres::PostgresItemStore;

/// A mutation result together with its audit record.
#[derive(Debug, Clone, PartialEq)]
pub struct Audited<T> {
    pub value: T,
    pub record: HistoryRecord,
}

/// Persistence collaborator for items. Reads only see non-deleted rows.
#[async_trait]
pub trait ItemStore: Send + Sync {
    async fn create(&self, draft: ItemDraft, stamp: &AuditStamp) -> Result<Audited<Item>, StoreError>;

    async fn get_by_id(&self, id: ItemId) -> Result<Item, StoreError>;

    /// Newest first.
    async fn get_all(&self) -> Result<Vec<Item>, StoreError>;

    async fn update(
        &self,
        id: ItemId,
        draft: ItemDraft,
        stamp: &AuditStamp,
    ) -> Result<Audited<Item>, StoreError>;

    /// Soft delete. Returns the item as it was before deletion.
    async fn delete(&self, id: ItemId, stamp: &AuditStamp) -> Result<Audited<Item>, StoreError>;
}

#[async_trait]
impl<S> ItemStore for Arc<S>
where
    S: ItemStore + ?Sized,
{
    async fn create(&self, draft: ItemDraft, stamp: &AuditStamp) -> Result<Audited<Item>, StoreError> {
        (**self).create(draft, stamp).await
    }

    async fn get_by_id(&self, id: ItemId) -> Result<Item, StoreError> {
        (**self).get_by_id(id).await
    }

    async fn get_all(&self) -> Result<Vec<Item>, StoreError> {
        (**self).get_all().await
    }

    async fn update(
        &self,
        id: ItemId,
        draft: ItemDraft,
        stamp: &AuditStamp,
    ) -> Result<Audited<Item>, StoreError> {
        (**self).update(id, draft, stamp).await
    }

    async fn delete(&self, id: ItemId, stamp: &AuditStamp) -> Result<Audited<Item>, StoreError> {
        (**self).delete(id, stamp).await
    }
}
