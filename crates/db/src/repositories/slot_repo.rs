//! Read-only access to `slot_states`, written by the availability feed.

use slotline_core::slot_key::normalize_time;
use slotline_core::types::Timestamp;
use sqlx::PgPool;

use crate::models::slot::OpenedSlot;

/// Provides the opened-slot feed.
pub struct SlotRepo;

impl SlotRepo {
    /// Slots first seen after `watermark` and still seen within the last
    /// `lookback_minutes` (database clock), oldest first.
    ///
    /// Rows with a missing date or time are skipped and `slot_time` is
    /// normalized to `HH:MM:SS`.
    pub async fn fetch_opened_since(
        pool: &PgPool,
        watermark: Timestamp,
        lookback_minutes: i32,
    ) -> Result<Vec<OpenedSlot>, sqlx::Error> {
        let rows = sqlx::query_as::<_, OpenedSlot>(
            "SELECT location_id, slot_date, slot_time, first_seen, last_seen \
             FROM slot_states \
             WHERE first_seen > $1 \
               AND last_seen > NOW() - make_interval(mins => $2) \
               AND NULLIF(slot_date, '') IS NOT NULL \
               AND NULLIF(slot_time, '') IS NOT NULL \
             ORDER BY first_seen ASC",
        )
        .bind(watermark)
        .bind(lookback_minutes)
        .fetch_all(pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|slot| OpenedSlot {
                slot_time: normalize_time(&slot.slot_time),
                ..slot
            })
            .collect())
    }
}
