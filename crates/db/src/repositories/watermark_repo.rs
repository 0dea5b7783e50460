//! Repository for the `queue_watermarks` table.

use slotline_core::types::Timestamp;
use sqlx::PgPool;

use crate::models::watermark::QueueWatermark;

/// Provides read/advance for per-stream high-water marks.
pub struct WatermarkRepo;

impl WatermarkRepo {
    pub async fn find(pool: &PgPool, key: &str) -> Result<Option<QueueWatermark>, sqlx::Error> {
        sqlx::query_as::<_, QueueWatermark>(
            "SELECT key, last_processed_at FROM queue_watermarks WHERE key = $1",
        )
        .bind(key)
        .fetch_optional(pool)
        .await
    }

    /// Advance the watermark. Never moves it backwards.
    pub async fn advance(
        pool: &PgPool,
        key: &str,
        last_processed_at: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO queue_watermarks (key, last_processed_at) \
             VALUES ($1, $2) \
             ON CONFLICT (key) DO UPDATE \
             SET last_processed_at = GREATEST(queue_watermarks.last_processed_at, EXCLUDED.last_processed_at)",
        )
        .bind(key)
        .bind(last_processed_at)
        .execute(pool)
        .await?;
        Ok(())
    }
}
