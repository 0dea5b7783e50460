//! Booking attempt audit rows. Append-only.

use serde::Serialize;
use slotline_core::status::BookingResult;
use slotline_core::types::{DbId, RunId, Timestamp};
use sqlx::FromRow;

/// A row from the `booking_attempts` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BookingAttempt {
    pub id: DbId,
    pub customer_id: DbId,
    pub location_id: DbId,
    pub slot_date: String,
    pub slot_time: String,
    pub slot_at: Timestamp,
    pub attempt_at: Timestamp,
    pub result: String,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub dispatcher_run_id: RunId,
}

/// DTO for recording an attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewBookingAttempt {
    pub customer_id: DbId,
    pub location_id: DbId,
    pub slot_date: String,
    pub slot_time: String,
    pub slot_at: Timestamp,
    pub result: BookingResult,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub dispatcher_run_id: RunId,
}
