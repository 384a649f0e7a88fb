//! Persistence operations, all generic over [`sea_orm::ConnectionTrait`] so
//! the coordinator can run them inside or outside a transaction. Every state
//! change is a conditional write; nothing in here does read-then-write.

pub mod assignments;
pub mod drivers;
pub mod trips;

use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;

pub(crate) fn now() -> DateTimeWithTimeZone {
    Utc::now().into()
}
