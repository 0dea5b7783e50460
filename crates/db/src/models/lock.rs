use serde::Serialize;
use slotline_core::types::{RunId, Timestamp};
use sqlx::FromRow;

/// A row from the `booking_locks` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BookingLock {
    pub lock_key: String,
    pub locked_until: Timestamp,
    pub owner_run_id: RunId,
}
