//! Repository for the `message_log` table.

use slotline_core::types::DbId;
use sqlx::PgPool;

use crate::is_unique_violation;
use crate::models::message::{MessageLogEntry, NewMessage};

const COLUMNS: &str = "id, customer_id, message_type, sent_at, dedupe_key, meta_json";

/// Deduplicated customer message log.
pub struct MessageRepo;

impl MessageRepo {
    /// Insert a message unless its dedupe key was already logged.
    ///
    /// Returns `None` when the unique constraint on `dedupe_key` rejects
    /// the insert: the message counts as already sent.
    pub async fn insert_with_dedupe(
        pool: &PgPool,
        input: &NewMessage,
    ) -> Result<Option<MessageLogEntry>, sqlx::Error> {
        let query = format!(
            "INSERT INTO message_log (customer_id, message_type, dedupe_key, meta_json) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        let inserted = sqlx::query_as::<_, MessageLogEntry>(&query)
            .bind(input.customer_id)
            .bind(input.template.kind.as_str())
            .bind(&input.dedupe_key)
            .bind(input.meta_json())
            .fetch_one(pool)
            .await;

        match inserted {
            Ok(entry) => Ok(Some(entry)),
            Err(e) if is_unique_violation(&e) => {
                tracing::debug!(dedupe_key = %input.dedupe_key, "Message already logged");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Messages for a customer, newest first.
    pub async fn list_for_customer(
        pool: &PgPool,
        customer_id: DbId,
        limit: Option<i64>,
    ) -> Result<Vec<MessageLogEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM message_log \
             WHERE customer_id = $1 \
             ORDER BY sent_at DESC, id DESC \
             LIMIT $2"
        );
        sqlx::query_as::<_, MessageLogEntry>(&query)
            .bind(customer_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    pub async fn has_been_sent(pool: &PgPool, dedupe_key: &str) -> Result<bool, sqlx::Error> {
        let found: Option<DbId> =
            sqlx::query_scalar("SELECT id FROM message_log WHERE dedupe_key = $1")
                .bind(dedupe_key)
                .fetch_optional(pool)
                .await?;
        Ok(found.is_some())
    }
}
