use std::sync::RwLock;

use async_trait::async_trait;

use warehouse_core::HistoryId;
use warehouse_inventory::{HistoryFilter, HistoryRecord, NewHistoryRecord};

use super::HistoryStore;
use crate::StoreError;

#[derive(Debug, Default)]
struct HistoryLog {
    last_id: i64,
    records: Vec<HistoryRecord>,
}

/// In-memory append-only history store.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryHistoryStore {
    log: RwLock<HistoryLog>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Synchronous append used by the in-memory item store while it still holds
    /// its own write lock, so item and record become visible together.
    pub(crate) fn insert(&self, record: NewHistoryRecord) -> Result<HistoryRecord, StoreError> {
        let mut log = self.log.write().map_err(|_| StoreError::poisoned())?;
        log.last_id += 1;
        let stored = record.into_record(HistoryId::new(log.last_id));
        log.records.push(stored.clone());
        Ok(stored)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.log.read().expect("history log poisoned").records.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn append(&self, record: NewHistoryRecord) -> Result<HistoryRecord, StoreError> {
        self.insert(record)
    }

    async fn query(&self, filter: &HistoryFilter) -> Result<Vec<HistoryRecord>, StoreError> {
        let log = self.log.read().map_err(|_| StoreError::poisoned())?;
        Ok(filter.apply(&log.records))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn poisoned_log_is_an_error_not_an_empty_ledger() {
        let store = Arc::new(InMemoryHistoryStore::new());
        let poisoner = store.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.log.write().unwrap();
            panic!("poison the history log");
        })
        .join();

        assert!(store.query(&HistoryFilter::default()).await.is_err());
    }
}
