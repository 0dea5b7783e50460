//! Repository for the `user_target_window_selections` table.

use slotline_core::types::DbId;
use sqlx::PgPool;

use crate::models::selection::{SelectionRow, UpsertSelection};

const COLUMNS: &str = "customer_id, timezone, date_horizon_key, weekday_rule_key, \
     custom_weekdays, time_block_keys, updated_at";

/// Provides access to customer target-window selections.
pub struct SelectionRepo;

impl SelectionRepo {
    pub async fn find_by_customer(
        pool: &PgPool,
        customer_id: DbId,
    ) -> Result<Option<SelectionRow>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM user_target_window_selections WHERE customer_id = $1");
        sqlx::query_as::<_, SelectionRow>(&query)
            .bind(customer_id)
            .fetch_optional(pool)
            .await
    }

    /// Batch-fetch selections for many customers in one query.
    pub async fn list_for_customers(
        pool: &PgPool,
        customer_ids: &[DbId],
    ) -> Result<Vec<SelectionRow>, sqlx::Error> {
        if customer_ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!(
            "SELECT {COLUMNS} FROM user_target_window_selections WHERE customer_id = ANY($1)"
        );
        sqlx::query_as::<_, SelectionRow>(&query)
            .bind(customer_ids)
            .fetch_all(pool)
            .await
    }

    /// Create or replace a customer's selection.
    pub async fn upsert(
        pool: &PgPool,
        input: &UpsertSelection,
    ) -> Result<SelectionRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO user_target_window_selections \
                (customer_id, timezone, date_horizon_key, weekday_rule_key, \
                 custom_weekdays, time_block_keys, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, NOW()) \
             ON CONFLICT (customer_id) DO UPDATE SET \
                timezone = EXCLUDED.timezone, \
                date_horizon_key = EXCLUDED.date_horizon_key, \
                weekday_rule_key = EXCLUDED.weekday_rule_key, \
                custom_weekdays = EXCLUDED.custom_weekdays, \
                time_block_keys = EXCLUDED.time_block_keys, \
                updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SelectionRow>(&query)
            .bind(input.customer_id)
            .bind(&input.timezone)
            .bind(&input.date_horizon_key)
            .bind(&input.weekday_rule_key)
            .bind(&input.custom_weekdays)
            .bind(&input.time_block_keys)
            .fetch_one(pool)
            .await
    }
}
