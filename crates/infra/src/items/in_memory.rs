use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use warehouse_core::ItemId;
use warehouse_inventory::{AuditStamp, Item, ItemChange, ItemDraft, NewHistoryRecord};

use super::{Audited, ItemStore};
use crate::audit::InMemoryHistoryStore;
use crate::StoreError;

#[derive(Debug, Clone)]
struct ItemRow {
    item: Item,
    deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct ItemTable {
    last_id: i64,
    rows: BTreeMap<ItemId, ItemRow>,
}

impl ItemTable {
    fn live(&self, id: ItemId) -> Result<&Item, StoreError> {
        self.rows
            .get(&id)
            .filter(|row| row.deleted_at.is_none())
            .map(|row| &row.item)
            .ok_or(StoreError::NotFound)
    }
}

/// In-memory item store.
///
/// Lock order is items, then history; history is written while the item lock
/// is still held.
#[derive(Debug)]
pub struct InMemoryItemStore {
    table: RwLock<ItemTable>,
    history: Arc<InMemoryHistoryStore>,
}

impl InMemoryItemStore {
    pub fn new(history: Arc<InMemoryHistoryStore>) -> Self {
        Self {
            table: RwLock::new(ItemTable::default()),
            history,
        }
    }
}

#[async_trait]
impl ItemStore for InMemoryItemStore {
    async fn create(&self, draft: ItemDraft, stamp: &AuditStamp) -> Result<Audited<Item>, StoreError> {
        let mut table = self.table.write().map_err(|_| StoreError::poisoned())?;

        let id = ItemId::new(table.last_id + 1);
        let item = Item::create(id, draft, stamp.changed_at);
        let record = self
            .history
            .insert(NewHistoryRecord::new(ItemChange::Insert { new: item.clone() }, stamp))?;

        table.last_id = id.get();
        table.rows.insert(
            id,
            ItemRow {
                item: item.clone(),
                deleted_at: None,
            },
        );

        Ok(Audited { value: item, record })
    }

    async fn get_by_id(&self, id: ItemId) -> Result<Item, StoreError> {
        let table = self.table.read().map_err(|_| StoreError::poisoned())?;
        table.live(id).cloned()
    }

    async fn get_all(&self) -> Result<Vec<Item>, StoreError> {
        let table = self.table.read().map_err(|_| StoreError::poisoned())?;
        let mut items: Vec<Item> = table
            .rows
            .values()
            .filter(|row| row.deleted_at.is_none())
            .map(|row| row.item.clone())
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(items)
    }

    async fn update(
        &self,
        id: ItemId,
        draft: ItemDraft,
        stamp: &AuditStamp,
    ) -> Result<Audited<Item>, StoreError> {
        let mut table = self.table.write().map_err(|_| StoreError::poisoned())?;

        let old = table.live(id)?.clone();
        let new = old.revised(draft, stamp.changed_at);
        let record = self.history.insert(NewHistoryRecord::new(
            ItemChange::Update {
                old,
                new: new.clone(),
            },
            stamp,
        ))?;

        if let Some(row) = table.rows.get_mut(&id) {
            row.item = new.clone();
        }
        Ok(Audited { value: new, record })
    }

    async fn delete(&self, id: ItemId, stamp: &AuditStamp) -> Result<Audited<Item>, StoreError> {
        let mut table = self.table.write().map_err(|_| StoreError::poisoned())?;

        let old = table.live(id)?.clone();
        let record = self
            .history
            .insert(NewHistoryRecord::new(ItemChange::Delete { old: old.clone() }, stamp))?;

        if let Some(row) = table.rows.get_mut(&id) {
            row.deleted_at = Some(stamp.changed_at);
        }
        Ok(Audited { value: old, record })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::HistoryStore;
    use warehouse_inventory::{HistoryAction, HistoryFilter};

    fn draft(name: &str, quantity: i64) -> ItemDraft {
        ItemDraft {
            name: name.to_string(),
            description: "desc".to_string(),
            quantity,
            price: 9.99,
        }
    }

    fn stamp(secs: i64) -> AuditStamp {
        AuditStamp::new("bob", DateTime::from_timestamp(secs, 0).unwrap())
    }

    fn store() -> (Arc<InMemoryHistoryStore>, InMemoryItemStore) {
        let history = Arc::new(InMemoryHistoryStore::new());
        (history.clone(), InMemoryItemStore::new(history))
    }

    #[tokio::test]
    async fn every_mutation_leaves_exactly_one_record() {
        let (history, items) = store();

        let created = items.create(draft("bolt", 5), &stamp(10)).await.unwrap();
        let id = created.value.id;
        items.update(id, draft("bolt", 8), &stamp(20)).await.unwrap();
        let deleted = items.delete(id, &stamp(30)).await.unwrap();

        assert_eq!(deleted.value.quantity, 8);
        assert_eq!(history.len(), 3);

        let records = history.query(&HistoryFilter::for_item(id)).await.unwrap();
        let actions: Vec<HistoryAction> = records.iter().map(|r| r.action).collect();
        assert_eq!(
            actions,
            vec![HistoryAction::Delete, HistoryAction::Update, HistoryAction::Insert]
        );
        assert_eq!(records[1].old_data.as_ref().map(|i| i.quantity), Some(5));
        assert_eq!(records[1].new_data.as_ref().map(|i| i.quantity), Some(8));
    }

    #[tokio::test]
    async fn deleted_items_disappear_from_reads() {
        let (history, items) = store();
        let a = items.create(draft("a", 1), &stamp(1)).await.unwrap().value;
        let b = items.create(draft("b", 1), &stamp(2)).await.unwrap().value;
        items.delete(a.id, &stamp(3)).await.unwrap();

        assert_eq!(items.get_by_id(a.id).await, Err(StoreError::NotFound));
        let all = items.get_all().await.unwrap();
        assert_eq!(all.iter().map(|i| i.id).collect::<Vec<_>>(), vec![b.id]);

        // A second delete finds nothing and records nothing.
        assert_eq!(items.delete(a.id, &stamp(4)).await, Err(StoreError::NotFound));
        assert_eq!(history.len(), 3);
    }

    #[tokio::test]
    async fn missing_item_update_records_nothing() {
        let (history, items) = store();
        let result = items.update(ItemId::new(99), draft("x", 1), &stamp(1)).await;
        assert_eq!(result, Err(StoreError::NotFound));
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn listing_is_newest_first() {
        let (_history, items) = store();
        for (i, name) in ["first", "second", "third"].into_iter().enumerate() {
            items.create(draft(name, 1), &stamp(i as i64)).await.unwrap();
        }
        let names: Vec<String> = items.get_all().await.unwrap().into_iter().map(|i| i.name).collect();
        assert_eq!(names, vec!["third", "second", "first"]);
    }
}
