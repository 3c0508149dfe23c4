//! Audit history records.
//!
//! A record's shape is fixed by the change that produced it: inserts carry only
//! the new snapshot, deletes only the old one, updates both. [`ItemChange`]
//! is the only way to build a [`NewHistoryRecord`], so a mismatched shape
//! cannot be constructed.

use core::cmp::Ordering;
use core::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use warehouse_core::{DomainError, HistoryId, ItemId};

use crate::Item;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HistoryAction {
    Insert,
    Update,
    Delete,
}

impl HistoryAction {
    pub const fn as_str(&self) -> &'static str {
        match self {
            HistoryAction::Insert => "INSERT",
            HistoryAction::Update => "UPDATE",
            HistoryAction::Delete => "DELETE",
        }
    }
}

impl core::fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HistoryAction {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INSERT" => Ok(HistoryAction::Insert),
            "UPDATE" => Ok(HistoryAction::Update),
            "DELETE" => Ok(HistoryAction::Delete),
            _ => Err(DomainError::validation(format!("unknown history action '{s}'"))),
        }
    }
}

/// One mutation of one item, with the snapshots it touched.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemChange {
    Insert { new: Item },
    Update { old: Item, new: Item },
    Delete { old: Item },
}

impl ItemChange {
    pub fn action(&self) -> HistoryAction {
        match self {
            ItemChange::Insert { .. } => HistoryAction::Insert,
            ItemChange::Update { .. } => HistoryAction::Update,
            ItemChange::Delete { .. } => HistoryAction::Delete,
        }
    }

    pub fn item_id(&self) -> ItemId {
        match self {
            ItemChange::Insert { new } | ItemChange::Update { new, .. } => new.id,
            ItemChange::Delete { old } => old.id,
        }
    }
}

/// Who made a change and when.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditStamp {
    pub actor: String,
    pub changed_at: DateTime<Utc>,
}

impl AuditStamp {
    /// Timestamps are truncated to microseconds, the precision Postgres keeps,
    /// so a record returned by a mutation equals the same record read back.
    pub fn new(actor: impl Into<String>, changed_at: DateTime<Utc>) -> Self {
        Self {
            actor: actor.into(),
            changed_at: changed_at.trunc_subsecs(6),
        }
    }
}

/// A record that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewHistoryRecord {
    item_id: ItemId,
    action: HistoryAction,
    username: String,
    old_data: Option<Item>,
    new_data: Option<Item>,
    changed_at: DateTime<Utc>,
}

impl NewHistoryRecord {
    pub fn new(change: ItemChange, stamp: &AuditStamp) -> Self {
        let item_id = change.item_id();
        let action = change.action();
        let (old_data, new_data) = match change {
            ItemChange::Insert { new } => (None, Some(new)),
            ItemChange::Update { old, new } => (Some(old), Some(new)),
            ItemChange::Delete { old } => (Some(old), None),
        };

        Self {
            item_id,
            action,
            username: stamp.actor.clone(),
            old_data,
            new_data,
            changed_at: stamp.changed_at,
        }
    }

    pub fn item_id(&self) -> ItemId {
        self.item_id
    }

    pub fn action(&self) -> HistoryAction {
        self.action
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn old_data(&self) -> Option<&Item> {
        self.old_data.as_ref()
    }

    pub fn new_data(&self) -> Option<&Item> {
        self.new_data.as_ref()
    }

    pub fn changed_at(&self) -> DateTime<Utc> {
        self.changed_at
    }

    pub fn into_record(self, id: HistoryId) -> HistoryRecord {
        HistoryRecord {
            id,
            item_id: self.item_id,
            action: self.action,
            username: self.username,
            old_data: self.old_data,
            new_data: self.new_data,
            changed_at: self.changed_at,
        }
    }
}

/// One immutable audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: HistoryId,
    pub item_id: ItemId,
    pub action: HistoryAction,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_data: Option<Item>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_data: Option<Item>,
    pub changed_at: DateTime<Utc>,
}

/// Ordering used for every history listing: latest change first, higher id
/// first among equal timestamps.
pub fn newest_first(a: &HistoryRecord, b: &HistoryRecord) -> Ordering {
    b.changed_at.cmp(&a.changed_at).then_with(|| b.id.cmp(&a.id))
}

#[derive(Debug, Error)]
#[error("corrupt item snapshot: {0}")]
pub struct SnapshotError(#[from] serde_json::Error);

/// Decode a stored snapshot column. Absent, empty and JSON `null` all mean
/// "no snapshot"; anything else must parse.
pub fn decode_snapshot(raw: Option<&str>) -> Result<Option<Item>, SnapshotError> {
    match raw.map(str::trim) {
        None | Some("") | Some("null") => Ok(None),
        Some(text) => Ok(Some(serde_json::from_str(text)?)),
    }
}

pub fn encode_snapshot(item: Option<&Item>) -> Result<Option<serde_json::Value>, SnapshotError> {
    item.map(serde_json::to_value).transpose().map_err(SnapshotError::from)
}
