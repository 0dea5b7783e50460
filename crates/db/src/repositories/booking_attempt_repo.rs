//! Repository for the append-only `booking_attempts` table.

use slotline_core::types::DbId;
use sqlx::PgPool;

use crate::models::booking_attempt::{BookingAttempt, NewBookingAttempt};

const COLUMNS: &str = "id, customer_id, location_id, slot_date, slot_time, slot_at, \
     attempt_at, result, error_code, error_message, dispatcher_run_id";

/// Booking attempt audit trail.
pub struct BookingAttemptRepo;

impl BookingAttemptRepo {
    pub async fn insert(
        pool: &PgPool,
        input: &NewBookingAttempt,
    ) -> Result<BookingAttempt, sqlx::Error> {
        let query = format!(
            "INSERT INTO booking_attempts \
                (customer_id, location_id, slot_date, slot_time, slot_at, \
                 result, error_code, error_message, dispatcher_run_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, BookingAttempt>(&query)
            .bind(input.customer_id)
            .bind(input.location_id)
            .bind(&input.slot_date)
            .bind(&input.slot_time)
            .bind(input.slot_at)
            .bind(input.result.as_str())
            .bind(&input.error_code)
            .bind(&input.error_message)
            .bind(input.dispatcher_run_id)
            .fetch_one(pool)
            .await
    }

    /// Attempts for a customer, newest first.
    pub async fn list_for_customer(
        pool: &PgPool,
        customer_id: DbId,
        limit: Option<i64>,
    ) -> Result<Vec<BookingAttempt>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM booking_attempts \
             WHERE customer_id = $1 \
             ORDER BY attempt_at DESC, id DESC \
             LIMIT $2"
        );
        sqlx::query_as::<_, BookingAttempt>(&query)
            .bind(customer_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
