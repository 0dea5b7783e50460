//! Repository for `locations` and `user_location_preferences`.

use slotline_core::types::DbId;
use sqlx::PgPool;

use crate::models::location::Location;
use crate::models::selection::LocationPreference;

/// Provides access to locations and per-customer location preferences.
pub struct LocationRepo;

impl LocationRepo {
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Location>, sqlx::Error> {
        sqlx::query_as::<_, Location>("SELECT id, name, created_at FROM locations WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_preferences(
        pool: &PgPool,
        customer_id: DbId,
    ) -> Result<Vec<LocationPreference>, sqlx::Error> {
        sqlx::query_as::<_, LocationPreference>(
            "SELECT customer_id, location_id, created_at FROM user_location_preferences \
             WHERE customer_id = $1 \
             ORDER BY created_at ASC",
        )
        .bind(customer_id)
        .fetch_all(pool)
        .await
    }

    /// Batch-fetch preferences for many customers in one query.
    pub async fn list_preferences_for_customers(
        pool: &PgPool,
        customer_ids: &[DbId],
    ) -> Result<Vec<LocationPreference>, sqlx::Error> {
        if customer_ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_as::<_, LocationPreference>(
            "SELECT customer_id, location_id, created_at FROM user_location_preferences \
             WHERE customer_id = ANY($1)",
        )
        .bind(customer_ids)
        .fetch_all(pool)
        .await
    }

    /// Add a preference. Returns `false` if it already existed.
    pub async fn add_preference(
        pool: &PgPool,
        customer_id: DbId,
        location_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO user_location_preferences (customer_id, location_id) \
             VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(customer_id)
        .bind(location_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove a preference. Returns `true` if a row was removed.
    pub async fn remove_preference(
        pool: &PgPool,
        customer_id: DbId,
        location_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM user_location_preferences WHERE customer_id = $1 AND location_id = $2",
        )
        .bind(customer_id)
        .bind(location_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
