//! Postgres-backed history store.
//!
//! `items_history` is append-only at the database level as well: the schema
//! installs rules that turn UPDATE and DELETE into no-ops (see
//! [`crate::schema`]).

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder, Row};
use tracing::instrument;

use warehouse_core::{HistoryId, ItemId};
use warehouse_inventory::{
    decode_snapshot, encode_snapshot, HistoryAction, HistoryFilter, HistoryPredicate, HistoryRecord,
    NewHistoryRecord,
};

use super::HistoryStore;
use crate::pg::map_sqlx_error;
use crate::StoreError;

const SELECT_HISTORY: &str = r#"
    SELECT
        id,
        item_id,
        action,
        username,
        old_data::text AS old_data,
        new_data::text AS new_data,
        changed_at
    FROM items_history
    WHERE TRUE"#;

#[derive(Debug, Clone)]
pub struct PostgresHistoryStore {
    pool: PgPool,
}

impl PostgresHistoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Insert one record on an open connection (usually a transaction that also
/// carries the item mutation).
pub(crate) async fn insert_record(
    conn: &mut PgConnection,
    record: NewHistoryRecord,
) -> Result<HistoryRecord, StoreError> {
    let old_data = encode_snapshot(record.old_data())?;
    let new_data = encode_snapshot(record.new_data())?;

    let row = sqlx::query(
        r#"
        INSERT INTO items_history (item_id, action, username, old_data, new_data, changed_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(record.item_id().get())
    .bind(record.action().as_str())
    .bind(record.username())
    .bind(old_data)
    .bind(new_data)
    .bind(record.changed_at())
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("insert_history", e))?;

    let id: i64 = row
        .try_get("id")
        .map_err(|e| StoreError::backend(format!("failed to read history id: {}", e)))?;

    Ok(record.into_record(HistoryId::new(id)))
}

fn push_predicate(qb: &mut QueryBuilder<'_, Postgres>, predicate: HistoryPredicate) {
    match predicate {
        HistoryPredicate::ItemIs(id) => {
            qb.push(" AND item_id = ").push_bind(id.get());
        }
        HistoryPredicate::UsernameIs(name) => {
            qb.push(" AND username = ").push_bind(name);
        }
        HistoryPredicate::ActionIs(action) => {
            qb.push(" AND action = ").push_bind(action.as_str());
        }
        HistoryPredicate::ChangedFrom(from) => {
            qb.push(" AND changed_at >= ").push_bind(from);
        }
        HistoryPredicate::ChangedUntil(to) => {
            qb.push(" AND changed_at <= ").push_bind(to);
        }
    }
}

#[async_trait::async_trait]
impl HistoryStore for PostgresHistoryStore {
    #[instrument(skip(self, record), fields(item_id = %record.item_id(), action = %record.action()), err)]
    async fn append(&self, record: NewHistoryRecord) -> Result<HistoryRecord, StoreError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("acquire", e))?;
        insert_record(&mut *conn, record).await
    }

    #[instrument(skip(self), err)]
    async fn query(&self, filter: &HistoryFilter) -> Result<Vec<HistoryRecord>, StoreError> {
        let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(SELECT_HISTORY);
        for predicate in filter.predicates() {
            push_predicate(&mut qb, predicate);
        }
        qb.push(" ORDER BY changed_at DESC, id DESC");

        if let Some(limit) = filter.effective_limit() {
            qb.push(" LIMIT ").push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        let offset = filter.effective_offset();
        if offset > 0 {
            qb.push(" OFFSET ").push_bind(i64::try_from(offset).unwrap_or(i64::MAX));
        }

        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("query_history", e))?;

        rows.iter().map(history_from_row).collect()
    }
}

fn history_from_row(row: &PgRow) -> Result<HistoryRecord, StoreError> {
    let read = |e: sqlx::Error| StoreError::backend(format!("failed to deserialize history row: {}", e));

    let id: i64 = row.try_get("id").map_err(read)?;
    let item_id: i64 = row.try_get("item_id").map_err(read)?;
    let action: String = row.try_get("action").map_err(read)?;
    let username: String = row.try_get("username").map_err(read)?;
    let old_data: Option<String> = row.try_get("old_data").map_err(read)?;
    let new_data: Option<String> = row.try_get("new_data").map_err(read)?;
    let changed_at: DateTime<Utc> = row.try_get("changed_at").map_err(read)?;

    let action: HistoryAction = action
        .parse()
        .map_err(|e| StoreError::backend(format!("history row {}: {}", id, e)))?;

    Ok(HistoryRecord {
        id: HistoryId::new(id),
        item_id: ItemId::new(item_id),
        action,
        username,
        old_data: decode_snapshot(old_data.as_deref())?,
        new_data: decode_snapshot(new_data.as_deref())?,
        changed_at,
    })
}
