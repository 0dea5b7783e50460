//! Queue entry rows.

use serde::Serialize;
use slotline_core::queue::QueueEntry;
use slotline_core::types::{DbId, Timestamp};
use sqlx::FromRow;

use super::decode_error;

/// A row from the `queue_entries` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QueueEntryRow {
    pub id: DbId,
    pub customer_id: DbId,
    pub created_at: Timestamp,
    pub status: String,
    pub deposit_status: String,
    pub deposit_required_at: Option<Timestamp>,
    pub deposit_paid_at: Option<Timestamp>,
    pub deposit_expires_at: Option<Timestamp>,
    pub booked_at: Option<Timestamp>,
    pub booked_location_id: Option<DbId>,
    pub booked_slot_at: Option<Timestamp>,
}

impl TryFrom<QueueEntryRow> for QueueEntry {
    type Error = sqlx::Error;

    fn try_from(row: QueueEntryRow) -> Result<Self, Self::Error> {
        Ok(QueueEntry {
            id: row.id,
            customer_id: row.customer_id,
            created_at: row.created_at,
            status: row.status.parse().map_err(decode_error)?,
            deposit_status: row.deposit_status.parse().map_err(decode_error)?,
            deposit_required_at: row.deposit_required_at,
            deposit_paid_at: row.deposit_paid_at,
            deposit_expires_at: row.deposit_expires_at,
            booked_at: row.booked_at,
            booked_location_id: row.booked_location_id,
            booked_slot_at: row.booked_slot_at,
        })
    }
}
