//! Inventory application service.
//!
//! Every operation follows the same pipeline:
//!
//! ```text
//! identity + request
//!   ↓
//! 1. authorize(identity, action)      (pure policy check)
//!   ↓
//! 2. validate input                   (pure domain check)
//!   ↓
//! 3. stamp (actor, now) via the ledger
//!   ↓
//! 4. store call under the request scope (mutation + history record, atomic)
//! ```
//!
//! Cancellation or deadline expiry during step 4 drops the store future, which
//! rolls back any open transaction.

use std::sync::Arc;

use warehouse_auth::{authorize, Action, Identity};
use warehouse_core::{ItemId, RequestScope};
use warehouse_inventory::{HistoryFilter, HistoryRecord, Item, ItemDraft};

use crate::audit::{AuditLedger, HistoryStore};
use crate::items::ItemStore;
use crate::ServiceError;

pub struct InventoryService {
    items: Arc<dyn ItemStore>,
    ledger: AuditLedger<Arc<dyn HistoryStore>>,
}

impl core::fmt::Debug for InventoryService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InventoryService").field("ledger", &self.ledger).finish_non_exhaustive()
    }
}

impl InventoryService {
    pub fn new(items: Arc<dyn ItemStore>, ledger: AuditLedger<Arc<dyn HistoryStore>>) -> Self {
        Self { items, ledger }
    }

    pub async fn create(
        &self,
        scope: &RequestScope,
        identity: &Identity,
        draft: ItemDraft,
    ) -> Result<Item, ServiceError> {
        authorize(identity, Action::Create)?;
        draft.validate()?;

        let stamp = self.ledger.stamp(&identity.username);
        let audited = scope.run(self.items.create(draft, &stamp)).await?;

        tracing::info!(
            item_id = %audited.value.id,
            history_id = %audited.record.id,
            actor = %identity.username,
            "item created"
        );
        Ok(audited.value)
    }

    pub async fn get(
        &self,
        scope: &RequestScope,
        identity: &Identity,
        id: ItemId,
    ) -> Result<Item, ServiceError> {
        authorize(identity, Action::View)?;
        Ok(scope.run(self.items.get_by_id(id)).await?)
    }

    pub async fn list(&self, scope: &RequestScope, identity: &Identity) -> Result<Vec<Item>, ServiceError> {
        authorize(identity, Action::View)?;
        Ok(scope.run(self.items.get_all()).await?)
    }

    pub async fn update(
        &self,
        scope: &RequestScope,
        identity: &Identity,
        id: ItemId,
        draft: ItemDraft,
    ) -> Result<Item, ServiceError> {
        authorize(identity, Action::Update)?;
        draft.validate()?;

        let stamp = self.ledger.stamp(&identity.username);
        let audited = scope.run(self.items.update(id, draft, &stamp)).await?;

        tracing::info!(
            item_id = %id,
            history_id = %audited.record.id,
            actor = %identity.username,
            "item updated"
        );
        Ok(audited.value)
    }

    pub async fn delete(
        &self,
        scope: &RequestScope,
        identity: &Identity,
        id: ItemId,
    ) -> Result<Item, ServiceError> {
        authorize(identity, Action::Delete)?;

        let stamp = self.ledger.stamp(&identity.username);
        let audited = scope.run(self.items.delete(id, &stamp)).await?;

        tracing::info!(
            item_id = %id,
            history_id = %audited.record.id,
            actor = %identity.username,
            "item deleted"
        );
        Ok(audited.value)
    }

    pub async fn history_for_item(
        &self,
        scope: &RequestScope,
        identity: &Identity,
        id: ItemId,
    ) -> Result<Vec<HistoryRecord>, ServiceError> {
        authorize(identity, Action::ViewHistory)?;
        Ok(self.ledger.query_by_item(scope, id).await?)
    }

    pub async fn history(
        &self,
        scope: &RequestScope,
        identity: &Identity,
        filter: &HistoryFilter,
    ) -> Result<Vec<HistoryRecord>, ServiceError> {
        authorize(identity, Action::ViewHistory)?;
        Ok(self.ledger.query_filtered(scope, filter).await?)
    }
}
