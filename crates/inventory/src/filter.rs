//! History query filter.
//!
//! Every field is optional; absent fields impose no constraint and the present
//! ones are AND-ed together. Stores consume the filter as a list of
//! [`HistoryPredicate`]s so in-memory and SQL backends agree on semantics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use warehouse_core::ItemId;

use crate::{newest_first, HistoryAction, HistoryRecord};

/// Page size when the caller does not ask for one.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryFilter {
    pub item_id: Option<ItemId>,
    pub username: Option<String>,
    pub action: Option<HistoryAction>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    /// Unset means [`DEFAULT_HISTORY_LIMIT`]; zero or negative means unbounded.
    pub limit: Option<i64>,
    /// Negative values are treated as zero.
    pub offset: Option<i64>,
}

/// A single constraint on a history record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryPredicate {
    ItemIs(ItemId),
    UsernameIs(String),
    ActionIs(HistoryAction),
    ChangedFrom(DateTime<Utc>),
    ChangedUntil(DateTime<Utc>),
}

impl HistoryPredicate {
    pub fn matches(&self, record: &HistoryRecord) -> bool {
        match self {
            HistoryPredicate::ItemIs(id) => record.item_id == *id,
            HistoryPredicate::UsernameIs(name) => record.username == *name,
            HistoryPredicate::ActionIs(action) => record.action == *action,
            HistoryPredicate::ChangedFrom(from) => record.changed_at >= *from,
            HistoryPredicate::ChangedUntil(to) => record.changed_at <= *to,
        }
    }
}

impl HistoryFilter {
    pub fn for_item(item_id: ItemId) -> Self {
        Self {
            item_id: Some(item_id),
            ..Self::default()
        }
    }

    pub fn predicates(&self) -> Vec<HistoryPredicate> {
        let mut out = Vec::new();
        if let Some(id) = self.item_id {
            out.push(HistoryPredicate::ItemIs(id));
        }
        if let Some(name) = &self.username {
            out.push(HistoryPredicate::UsernameIs(name.clone()));
        }
        if let Some(action) = self.action {
            out.push(HistoryPredicate::ActionIs(action));
        }
        if let Some(from) = self.date_from {
            out.push(HistoryPredicate::ChangedFrom(from));
        }
        if let Some(to) = self.date_to {
            out.push(HistoryPredicate::ChangedUntil(to));
        }
        out
    }

    pub fn matches(&self, record: &HistoryRecord) -> bool {
        self.predicates().iter().all(|p| p.matches(record))
    }

    pub fn effective_limit(&self) -> Option<usize> {
        match self.limit {
            None => Some(DEFAULT_HISTORY_LIMIT),
            Some(n) if n <= 0 => None,
            Some(n) => Some(usize::try_from(n).unwrap_or(usize::MAX)),
        }
    }

    pub fn effective_offset(&self) -> usize {
        self.offset
            .map(|n| usize::try_from(n.max(0)).unwrap_or(usize::MAX))
            .unwrap_or(0)
    }

    /// Evaluate the filter over an unordered set of records: match, order
    /// newest first, then skip `offset` and take `limit`.
    pub fn apply<'a, I>(&self, records: I) -> Vec<HistoryRecord>
    where
        I: IntoIterator<Item = &'a HistoryRecord>,
    {
        let predicates = self.predicates();
        let mut matched: Vec<HistoryRecord> = records
            .into_iter()
            .filter(|r| predicates.iter().all(|p| p.matches(r)))
            .cloned()
            .collect();
        matched.sort_by(newest_first);

        let page = matched.into_iter().skip(self.effective_offset());
        match self.effective_limit() {
            Some(limit) => page.take(limit).collect(),
            None => page.collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AuditStamp, Item, ItemChange, ItemDraft, NewHistoryRecord};
    use proptest::prelude::*;
    use warehouse_core::HistoryId;

    const USERS: [&str; 3] = ["alice", "bob", "carol"];
    const ACTIONS: [HistoryAction; 3] = [HistoryAction::Insert, HistoryAction::Update, HistoryAction::Delete];

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn record(id: i64, item: i64, user: &str, action: HistoryAction, secs: i64) -> HistoryRecord {
        let snapshot = Item::create(
            ItemId::new(item),
            ItemDraft {
                name: format!("item-{item}"),
                description: String::new(),
                quantity: 1,
                price: 1.0,
            },
            at(0),
        );
        let change = match action {
            HistoryAction::Insert => ItemChange::Insert { new: snapshot },
            HistoryAction::Update => ItemChange::Update {
                old: snapshot.clone(),
                new: snapshot,
            },
            HistoryAction::Delete => ItemChange::Delete { old: snapshot },
        };
        NewHistoryRecord::new(change, &AuditStamp::new(user, at(secs))).into_record(HistoryId::new(id))
    }

    #[test]
    fn empty_filter_matches_everything_with_default_limit() {
        let records: Vec<HistoryRecord> = (1..=150)
            .map(|i| record(i, i % 7, "alice", HistoryAction::Update, i))
            .collect();

        let out = HistoryFilter::default().apply(&records);
        assert_eq!(out.len(), DEFAULT_HISTORY_LIMIT);
        assert_eq!(out[0].id, HistoryId::new(150));
    }

    #[test]
    fn limit_edge_cases() {
        let f = |limit, offset| HistoryFilter {
            limit,
            offset,
            ..HistoryFilter::default()
        };
        assert_eq!(f(None, None).effective_limit(), Some(100));
        assert_eq!(f(Some(0), None).effective_limit(), None);
        assert_eq!(f(Some(-5), None).effective_limit(), None);
        assert_eq!(f(Some(3), None).effective_limit(), Some(3));
        assert_eq!(f(None, Some(-10)).effective_offset(), 0);
        assert_eq!(f(None, Some(4)).effective_offset(), 4);
    }

    #[test]
    fn item_and_action_are_anded() {
        let records = vec![
            record(1, 42, "bob", HistoryAction::Insert, 10),
            record(2, 42, "bob", HistoryAction::Update, 20),
            record(3, 42, "bob", HistoryAction::Update, 30),
            record(4, 7, "bob", HistoryAction::Update, 40),
        ];
        let filter = HistoryFilter {
            item_id: Some(ItemId::new(42)),
            action: Some(HistoryAction::Update),
            ..HistoryFilter::default()
        };

        let ids: Vec<HistoryId> = filter.apply(&records).into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![HistoryId::new(3), HistoryId::new(2)]);
    }

    #[test]
    fn date_range_is_inclusive() {
        let records = vec![
            record(1, 1, "a", HistoryAction::Insert, 10),
            record(2, 1, "a", HistoryAction::Update, 20),
            record(3, 1, "a", HistoryAction::Update, 30),
        ];
        let filter = HistoryFilter {
            date_from: Some(at(10)),
            date_to: Some(at(20)),
            ..HistoryFilter::default()
        };
        assert_eq!(filter.apply(&records).len(), 2);
    }

    fn arb_record() -> impl Strategy<Value = (i64, usize, usize, i64)> {
        (1i64..5, 0usize..USERS.len(), 0usize..ACTIONS.len(), 0i64..50)
    }

    proptest! {
        #[test]
        fn results_satisfy_every_predicate_and_are_ordered(
            rows in prop::collection::vec(arb_record(), 0..60),
            item in prop::option::of(1i64..5),
            user in prop::option::of(0usize..USERS.len()),
            action in prop::option::of(0usize..ACTIONS.len()),
            from in prop::option::of(0i64..50),
            limit in prop::option::of(-2i64..20),
            offset in prop::option::of(-2i64..20),
        ) {
            let records: Vec<HistoryRecord> = rows
                .iter()
                .enumerate()
                .map(|(i, (item, u, a, t))| record(i as i64 + 1, *item, USERS[*u], ACTIONS[*a], *t))
                .collect();

            let filter = HistoryFilter {
                item_id: item.map(ItemId::new),
                username: user.map(|u| USERS[u].to_string()),
                action: action.map(|a| ACTIONS[a]),
                date_from: from.map(at),
                date_to: None,
                limit,
                offset,
            };

            let out = filter.apply(&records);
            for r in &out {
                prop_assert!(filter.matches(r));
            }
            for pair in out.windows(2) {
                prop_assert_ne!(newest_first(&pair[0], &pair[1]), core::cmp::Ordering::Greater);
            }

            let matching = records.iter().filter(|r| filter.matches(r)).count();
            let after_offset = matching.saturating_sub(filter.effective_offset());
            let expected = filter.effective_limit().map_or(after_offset, |l| after_offset.min(l));
            prop_assert_eq!(out.len(), expected);
        }
    }
}
