//! Infrastructure layer: storage backends, the audit ledger and the
//! application services composed from them.

pub mod account_service;
pub mod audit;
pub mod error;
pub mod inventory_service;
pub mod items;
pub mod pg;
pub mod schema;
pub mod service_error;
pub mod users;


pub use account_service::{AccountService, LoginOutcome};
pub use audit::{AuditLedger, HistoryStore, InMemoryHistoryStore, LedgerError, PostgresHistoryStore};
pub use error::StoreError;
pub use inventory_service::InventoryService;
pub use items::{Audited, InMemoryItemStore, ItemStore, PostgresItemStore};
pub use service_error::ServiceError;
pub use users::{InMemoryUserStore, PostgresUserStore, UserStore};
