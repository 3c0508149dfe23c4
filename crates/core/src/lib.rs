//! `warehouse-core`: shared building blocks for the warehouse services.
//!
//! This crate holds the pieces every layer needs (errors, identifiers, the
//! clock seam and request scoping) and nothing that touches storage or HTTP.

pub mod clock;
pub mod error;
pub mod id;
pub mod scope;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{DomainError, DomainResult};
pub use id::{HistoryId, ItemId, UserId};
pub use scope::{CancelHandle, Cancelled, RequestScope};
