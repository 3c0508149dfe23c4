use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use warehouse_core::{DomainError, DomainResult, ItemId};

/// A stock item as stored and returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub quantity: i64,
    pub price: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Materialize a validated draft as a new row.
    pub fn create(id: ItemId, draft: ItemDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: draft.name,
            description: draft.description,
            quantity: draft.quantity,
            price: draft.price,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the editable fields, keeping id and `created_at`.
    pub fn revised(&self, draft: ItemDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: self.id,
            name: draft.name,
            description: draft.description,
            quantity: draft.quantity,
            price: draft.price,
            created_at: self.created_at,
            updated_at: now,
        }
    }
}

/// Client-supplied fields for create and update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub quantity: i64,
    pub price: f64,
}

impl ItemDraft {
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if self.quantity < 0 {
            return Err(DomainError::validation("quantity cannot be negative"));
        }
        if !self.price.is_finite() {
            return Err(DomainError::validation("price must be a finite number"));
        }
        if self.price < 0.0 {
            return Err(DomainError::validation("price cannot be negative"));
        }
        Ok(())
    }
}
