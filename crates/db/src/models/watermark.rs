use serde::Serialize;
use slotline_core::types::Timestamp;
use sqlx::FromRow;

/// Watermark stream for opened-slot events.
pub const SLOT_OPENED: &str = "slot_opened";

/// A row from the `queue_watermarks` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QueueWatermark {
    pub key: String,
    pub last_processed_at: Timestamp,
}
