//! Inventory domain module.
//!
//! Stock items, their audit history records and the filter used to query that
//! history. Pure domain logic: no IO, no HTTP, no storage.

pub mod filter;
pub mod history;
pub mod item;

pub use filter::{HistoryFilter, HistoryPredicate, DEFAULT_HISTORY_LIMIT};
pub use history::{
    decode_snapshot, encode_snapshot, newest_first, AuditStamp, HistoryAction, HistoryRecord,
    ItemChange, NewHistoryRecord, SnapshotError,
};
pub use item::{Item, ItemDraft};
