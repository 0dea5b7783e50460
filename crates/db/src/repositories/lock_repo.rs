//! Repository for the `booking_locks` table.

use slotline_core::types::RunId;
use sqlx::PgPool;

use crate::models::lock::BookingLock;

/// Per-slot short-lived exclusive locks.
pub struct LockRepo;

impl LockRepo {
    /// Atomically acquire `lock_key` for `ttl_secs`.
    ///
    /// A single upsert: succeeds when no row exists or the existing row has
    /// expired, compared against the database clock. Contention returns
    /// `Ok(false)` rather than an error.
    pub async fn acquire(
        pool: &PgPool,
        lock_key: &str,
        owner_run_id: RunId,
        ttl_secs: u64,
    ) -> Result<bool, sqlx::Error> {
        let acquired: Option<String> = sqlx::query_scalar(
            "INSERT INTO booking_locks (lock_key, locked_until, owner_run_id) \
             VALUES ($1, NOW() + make_interval(secs => $3), $2) \
             ON CONFLICT (lock_key) DO UPDATE \
             SET locked_until = EXCLUDED.locked_until, owner_run_id = EXCLUDED.owner_run_id \
             WHERE booking_locks.locked_until < NOW() \
             RETURNING lock_key",
        )
        .bind(lock_key)
        .bind(owner_run_id)
        .bind(ttl_secs as f64)
        .fetch_optional(pool)
        .await?;
        Ok(acquired.is_some())
    }

    /// Release a lock by expiring it now, so the slot is immediately
    /// acquirable again.
    pub async fn release(pool: &PgPool, lock_key: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE booking_locks SET locked_until = NOW() WHERE lock_key = $1")
            .bind(lock_key)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn find(pool: &PgPool, lock_key: &str) -> Result<Option<BookingLock>, sqlx::Error> {
        sqlx::query_as::<_, BookingLock>(
            "SELECT lock_key, locked_until, owner_run_id FROM booking_locks WHERE lock_key = $1",
        )
        .bind(lock_key)
        .fetch_optional(pool)
        .await
    }
}
