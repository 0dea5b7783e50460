//! Repository for the `queue_entries` table.
//!
//! Every state change goes through [`QueueRepo::apply_transition`], which
//! turns the transition's table rule into a conditional `UPDATE`. A writer
//! that lost a race against a concurrent change affects zero rows.

use slotline_core::queue::{QueueTransition, StatusGuard};
use slotline_core::status::QueueStatus;
use slotline_core::types::DbId;
use sqlx::PgPool;

use crate::models::queue_entry::QueueEntryRow;

const COLUMNS: &str = "id, customer_id, created_at, status, deposit_status, \
     deposit_required_at, deposit_paid_at, deposit_expires_at, \
     booked_at, booked_location_id, booked_slot_at";

/// Provides queue reads and guarded state transitions.
pub struct QueueRepo;

impl QueueRepo {
    /// Entries holding a rank (`queued`, `deposit_required`, `active`),
    /// oldest first. Ties on `created_at` fall back to `id`.
    pub async fn list_ranked(pool: &PgPool) -> Result<Vec<QueueEntryRow>, sqlx::Error> {
        let ranked: Vec<&str> = QueueStatus::RANKED.iter().map(|s| s.as_str()).collect();
        let query = format!(
            "SELECT {COLUMNS} FROM queue_entries \
             WHERE status = ANY($1) \
             ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, QueueEntryRow>(&query)
            .bind(&ranked)
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<QueueEntryRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM queue_entries WHERE id = $1");
        sqlx::query_as::<_, QueueEntryRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_customer(
        pool: &PgPool,
        customer_id: DbId,
    ) -> Result<Option<QueueEntryRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM queue_entries WHERE customer_id = $1");
        sqlx::query_as::<_, QueueEntryRow>(&query)
            .bind(customer_id)
            .fetch_optional(pool)
            .await
    }

    /// Add a customer to the back of the queue.
    pub async fn enqueue(pool: &PgPool, customer_id: DbId) -> Result<QueueEntryRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO queue_entries (customer_id) VALUES ($1) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, QueueEntryRow>(&query)
            .bind(customer_id)
            .fetch_one(pool)
            .await
    }

    /// Apply a transition if the row still satisfies its guard.
    ///
    /// Timestamps use the database clock. Returns `true` if the row changed.
    pub async fn apply_transition(
        pool: &PgPool,
        entry_id: DbId,
        transition: &QueueTransition,
    ) -> Result<bool, sqlx::Error> {
        let rule = transition.rule();
        let (status_op, guard_status) = match rule.from_status {
            StatusGuard::Is(s) => ("=", s),
            StatusGuard::IsNot(s) => ("<>", s),
        };

        let (stamps, extra_guard) = match transition {
            QueueTransition::RequireDeposit { .. } => (
                "deposit_required_at = NOW(), deposit_expires_at = $6",
                "",
            ),
            QueueTransition::ExpireDeposit => ("", "AND deposit_expires_at < NOW()"),
            QueueTransition::Book { .. } => (
                "booked_at = NOW(), booked_location_id = $6, booked_slot_at = $7",
                "",
            ),
        };
        let stamps = if stamps.is_empty() {
            String::new()
        } else {
            format!(", {stamps}")
        };

        let query = format!(
            "UPDATE queue_entries \
             SET status = $2, deposit_status = $3{stamps} \
             WHERE id = $1 AND deposit_status = $4 AND status {status_op} $5 {extra_guard}"
        );

        let mut q = sqlx::query(&query)
            .bind(entry_id)
            .bind(rule.to_status.as_str())
            .bind(rule.to_deposit.as_str())
            .bind(rule.from_deposit.as_str())
            .bind(guard_status.as_str());
        match *transition {
            QueueTransition::RequireDeposit { expires_at } => {
                q = q.bind(expires_at);
            }
            QueueTransition::ExpireDeposit => {}
            QueueTransition::Book {
                location_id,
                slot_at,
            } => {
                q = q.bind(location_id).bind(slot_at);
            }
        }

        let result = q.execute(pool).await?;
        let applied = result.rows_affected() > 0;
        tracing::debug!(
            entry_id,
            transition = transition.name(),
            applied,
            "Queue transition"
        );
        Ok(applied)
    }

    /// Record a paid deposit and activate the entry.
    pub async fn mark_deposit_paid(pool: &PgPool, entry_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE queue_entries \
             SET status = 'active', deposit_status = 'paid', deposit_paid_at = NOW() \
             WHERE id = $1 AND deposit_status = 'required' AND status = 'deposit_required'",
        )
        .bind(entry_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
