//! Audit Ledger: the append-only change history of inventory items.
//!
//! This module is the only code that writes history records. Item stores that
//! need to pair a record with a mutation inside one transaction call into the
//! backend modules here (`in_memory` / `postgres`) rather than writing rows
//! themselves.
//!
//! ## Guarantees
//!
//! - Records are never updated or deleted once appended.
//! - Every listing is ordered newest first (`changed_at DESC, id DESC`).
//! - Filters are the conjunction of their present fields.
//! - Storage failures surface to the caller unchanged; nothing is retried.

mod in_memory;
mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use warehouse_core::{Cancelled, Clock, ItemId, RequestScope};
use warehouse_inventory::{AuditStamp, HistoryFilter, HistoryRecord, ItemChange, NewHistoryRecord};

use crate::StoreError;

pub use in_memory::InMemoryHistoryStore;
pub use postgres::PostgresHistoryStore;
pub(crate) use postgres::insert_record;

/// Persistence collaborator for history records.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Assign an id and persist. The record is visible to queries once this
    /// returns.
    async fn append(&self, record: NewHistoryRecord) -> Result<HistoryRecord, StoreError>;

    /// All records matching `filter`, newest first, paged by its limit/offset.
    async fn query(&self, filter: &HistoryFilter) -> Result<Vec<HistoryRecord>, StoreError>;
}

#[async_trait]
impl<S> HistoryStore for Arc<S>
where
    S: HistoryStore + ?Sized,
{
    async fn append(&self, record: NewHistoryRecord) -> Result<HistoryRecord, StoreError> {
        (**self).append(record).await
    }

    async fn query(&self, filter: &HistoryFilter) -> Result<Vec<HistoryRecord>, StoreError> {
        (**self).query(filter).await
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("history storage failure: {0}")]
    Storage(StoreError),

    #[error("operation cancelled")]
    Cancelled,
}

impl From<StoreError> for LedgerError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Cancelled => LedgerError::Cancelled,
            other => LedgerError::Storage(other),
        }
    }
}

impl From<Cancelled> for LedgerError {
    fn from(_: Cancelled) -> Self {
        LedgerError::Cancelled
    }
}

/// Stamps, records and retrieves item history.
#[derive(Clone)]
pub struct AuditLedger<H> {
    store: H,
    clock: Arc<dyn Clock>,
}

impl<H> core::fmt::Debug for AuditLedger<H> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuditLedger").field("clock", &self.clock).finish_non_exhaustive()
    }
}

impl<H: HistoryStore> AuditLedger<H> {
    pub fn new(store: H, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Actor and timestamp for a mutation about to be performed.
    pub fn stamp(&self, actor: &str) -> AuditStamp {
        AuditStamp::new(actor, self.clock.now())
    }

    /// Append one record for `change`, stamped with the current time.
    ///
    /// This is the standalone append path, for changes made outside an item
    /// store. Item mutations do not come through here: the item stores write
    /// their record in the same lock or transaction as the row change (via
    /// `InMemoryHistoryStore::insert` and [`insert_record`]), so the item and
    /// its record become visible together.
    pub async fn record(
        &self,
        scope: &RequestScope,
        change: ItemChange,
        actor: &str,
    ) -> Result<HistoryRecord, LedgerError> {
        let pending = NewHistoryRecord::new(change, &self.stamp(actor));
        let record = scope.run(self.store.append(pending)).await.map_err(|e| {
            tracing::warn!(error = %e, actor, "failed to append history record");
            LedgerError::from(e)
        })?;

        tracing::debug!(
            history_id = %record.id,
            item_id = %record.item_id,
            action = %record.action,
            actor,
            "history recorded"
        );
        Ok(record)
    }

    /// Every record for one item, newest first, unpaged.
    pub async fn query_by_item(
        &self,
        scope: &RequestScope,
        item_id: ItemId,
    ) -> Result<Vec<HistoryRecord>, LedgerError> {
        let filter = HistoryFilter {
            limit: Some(0),
            ..HistoryFilter::for_item(item_id)
        };
        Ok(scope.run(self.store.query(&filter)).await?)
    }

    pub async fn query_filtered(
        &self,
        scope: &RequestScope,
        filter: &HistoryFilter,
    ) -> Result<Vec<HistoryRecord>, LedgerError> {
        Ok(scope.run(self.store.query(filter)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeDelta, Utc};
    use warehouse_core::FixedClock;
    use warehouse_inventory::{HistoryAction, Item, ItemDraft};

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn item(id: i64, quantity: i64) -> Item {
        Item::create(
            ItemId::new(id),
            ItemDraft {
                name: "widget".into(),
                description: String::new(),
                quantity,
                price: 3.0,
            },
            t0(),
        )
    }

    fn ledger() -> (Arc<FixedClock>, AuditLedger<Arc<InMemoryHistoryStore>>) {
        let clock = Arc::new(FixedClock::new(t0()));
        let ledger = AuditLedger::new(Arc::new(InMemoryHistoryStore::new()), clock.clone());
        (clock, ledger)
    }

    #[tokio::test]
    async fn records_are_returned_newest_first() {
        let (clock, ledger) = ledger();
        let scope = RequestScope::detached();

        for q in 1..=5 {
            let change = if q == 1 {
                ItemChange::Insert { new: item(42, q) }
            } else {
                ItemChange::Update {
                    old: item(42, q - 1),
                    new: item(42, q),
                }
            };
            ledger.record(&scope, change, "bob").await.unwrap();
            clock.advance(TimeDelta::seconds(1));
        }

        let records = ledger.query_by_item(&scope, ItemId::new(42)).await.unwrap();
        assert_eq!(records.len(), 5);
        assert_eq!(records.last().map(|r| r.action), Some(HistoryAction::Insert));
        assert!(records.windows(2).all(|w| w[0].changed_at >= w[1].changed_at));
        assert_eq!(records[0].new_data.as_ref().map(|i| i.quantity), Some(5));
    }

    #[tokio::test]
    async fn stamp_uses_the_clock() {
        let (clock, ledger) = ledger();
        clock.advance(TimeDelta::minutes(3));
        let stamp = ledger.stamp("carol");
        assert_eq!(stamp.actor, "carol");
        assert_eq!(stamp.changed_at, t0() + TimeDelta::minutes(3));
    }

    #[tokio::test]
    async fn cancelled_scope_records_nothing() {
        let (_clock, ledger) = ledger();
        let (handle, scope) = RequestScope::new();
        handle.cancel();

        let result = ledger
            .record(&scope, ItemChange::Insert { new: item(7, 1) }, "alice")
            .await;
        assert_eq!(result, Err(LedgerError::Cancelled));

        let all = ledger
            .query_filtered(&RequestScope::detached(), &HistoryFilter::default())
            .await
            .unwrap();
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn unpaged_item_query_exceeds_default_limit() {
        let (_clock, ledger) = ledger();
        let scope = RequestScope::detached();
        for q in 0..120 {
            ledger
                .record(&scope, ItemChange::Delete { old: item(9, q) }, "bob")
                .await
                .unwrap();
        }

        assert_eq!(ledger.query_by_item(&scope, ItemId::new(9)).await.unwrap().len(), 120);
        let paged = ledger
            .query_filtered(&scope, &HistoryFilter::for_item(ItemId::new(9)))
            .await
            .unwrap();
        assert_eq!(paged.len(), 100);
    }
}
