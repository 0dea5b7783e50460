//! Opened slots from the upstream availability feed.

use serde::Serialize;
use slotline_core::slot_key::slot_key;
use slotline_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from `slot_states` that opened since the watermark.
///
/// `slot_time` is normalized to `HH:MM:SS` when fetched.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct OpenedSlot {
    pub location_id: DbId,
    pub slot_date: String,
    pub slot_time: String,
    pub first_seen: Timestamp,
    pub last_seen: Timestamp,
}

impl OpenedSlot {
    /// Lock identity for this slot.
    pub fn key(&self) -> String {
        slot_key(self.location_id, &self.slot_date, &self.slot_time)
    }
}
