use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use warehouse_auth::{Role, User};
use warehouse_core::ItemId;
use warehouse_inventory::{HistoryAction, HistoryFilter};

use crate::app::errors::ApiError;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub role: String,
}

impl RegisterRequest {
    pub fn role(&self) -> Result<Role, ApiError> {
        self.role
            .parse::<Role>()
            .map_err(|_| ApiError::validation("role must be one of: admin, manager, viewer"))
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Query string of `GET /api/history`.
///
/// Every field arrives as text so that malformed values surface as a
/// `validation_error` instead of a framework rejection. Blank values are
/// treated as absent.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub item_id: Option<String>,
    pub username: Option<String>,
    pub action: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl HistoryQuery {
    pub fn into_filter(self) -> Result<HistoryFilter, ApiError> {
        let item_id = present(self.item_id)
            .map(|raw| parse_item_id(&raw))
            .transpose()?;

        let action = present(self.action)
            .map(|raw| {
                raw.parse::<HistoryAction>()
                    .map_err(|_| ApiError::validation("action must be one of: INSERT, UPDATE, DELETE"))
            })
            .transpose()?;

        let date_from = present(self.date_from)
            .map(|raw| parse_timestamp("date_from", &raw))
            .transpose()?;
        let date_to = present(self.date_to)
            .map(|raw| parse_timestamp("date_to", &raw))
            .transpose()?;

        // Range handling (zero/negative limit, negative offset) is the filter's job.
        let limit = present(self.limit)
            .map(|raw| parse_integer("limit", &raw))
            .transpose()?;
        let offset = present(self.offset)
            .map(|raw| parse_integer("offset", &raw))
            .transpose()?;

        Ok(HistoryFilter {
            item_id,
            username: present(self.username),
            action,
            date_from,
            date_to,
            limit,
            offset,
        })
    }
}

pub fn parse_item_id(raw: &str) -> Result<ItemId, ApiError> {
    raw.parse::<ItemId>()
        .map_err(|_| ApiError::validation("invalid item id"))
}

fn parse_integer(field: &str, raw: &str) -> Result<i64, ApiError> {
    raw.parse::<i64>()
        .map_err(|_| ApiError::validation(format!("{field} must be an integer")))
}

fn parse_timestamp(field: &str, raw: &str) -> Result<DateTime<Utc>, ApiError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| ApiError::validation(format!("{field} must be an RFC 3339 timestamp")))
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id.get(),
            username: user.username,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> HistoryQuery {
        let mut q = HistoryQuery::default();
        for (k, v) in pairs {
            let v = Some(v.to_string());
            match *k {
                "item_id" => q.item_id = v,
                "username" => q.username = v,
                "action" => q.action = v,
                "date_from" => q.date_from = v,
                "date_to" => q.date_to = v,
                "limit" => q.limit = v,
                "offset" => q.offset = v,
                other => panic!("unknown key {other}"),
            }
        }
        q
    }

    #[test]
    fn empty_query_is_an_unfiltered_default_page() {
        let filter = HistoryQuery::default().into_filter().unwrap();
        assert_eq!(filter, HistoryFilter::default());
        assert_eq!(filter.effective_limit(), Some(100));
    }

    #[test]
    fn all_fields_parse() {
        let filter = query(&[
            ("item_id", "42"),
            ("username", "bob"),
            ("action", "update"),
            ("date_from", "2024-01-01T00:00:00Z"),
            ("date_to", "2024-01-31T23:59:59+00:00"),
            ("limit", "10"),
            ("offset", "5"),
        ])
        .into_filter()
        .unwrap();

        assert_eq!(filter.item_id, Some(ItemId::new(42)));
        assert_eq!(filter.username.as_deref(), Some("bob"));
        assert_eq!(filter.action, Some(HistoryAction::Update));
        assert_eq!(filter.limit, Some(10));
        assert_eq!(filter.offset, Some(5));
        assert!(filter.date_from < filter.date_to);
    }

    #[test]
    fn blank_values_are_ignored() {
        let filter = query(&[("username", "  "), ("item_id", "")]).into_filter().unwrap();
        assert_eq!(filter, HistoryFilter::default());
    }

    #[test]
    fn malformed_values_are_rejected() {
        for (k, v) in [
            ("item_id", "abc"),
            ("action", "UPSERT"),
            ("date_from", "yesterday"),
            ("date_to", "2024-13-01"),
            ("limit", "ten"),
            ("limit", "1.5"),
            ("offset", "many"),
        ] {
            let err = query(&[(k, v)]).into_filter().unwrap_err();
            assert!(matches!(err, ApiError::Validation(_)), "{k}={v} should be rejected");
        }
    }

    #[test]
    fn out_of_range_paging_is_left_to_the_filter() {
        let filter = query(&[("limit", "0"), ("offset", "-4")]).into_filter().unwrap();
        assert_eq!(filter.effective_limit(), None);
        assert_eq!(filter.effective_offset(), 0);
    }

    #[test]
    fn register_role_is_case_insensitive() {
        let req = RegisterRequest {
            username: "carol".into(),
            password: "secret1".into(),
            role: "Manager".into(),
        };
        assert_eq!(req.role().unwrap(), Role::Manager);

        let req = RegisterRequest { role: "owner".into(), ..req };
        assert!(matches!(req.role(), Err(ApiError::Validation(_))));
    }
}
