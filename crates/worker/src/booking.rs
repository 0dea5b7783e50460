//! The upstream reservation call.

use async_trait::async_trait;
use slotline_core::types::{DbId, Timestamp};

/// Error code reported by [`StubBookingClient`].
pub const NOT_IMPLEMENTED: &str = "NOT_IMPLEMENTED";

/// Result of one reservation call. Any non-success is treated the same way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingOutcome {
    pub success: bool,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}

impl BookingOutcome {
    pub fn succeeded() -> Self {
        Self {
            success: true,
            error_code: None,
            error_message: None,
        }
    }

    pub fn failed(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_code: Some(code.into()),
            error_message: Some(message.into()),
        }
    }
}

/// Reserves a slot with the upstream scheduling site.
///
/// Failures are reported in the outcome, never as an error: the dispatcher
/// records them and moves on.
#[async_trait]
pub trait BookingClient: Send + Sync {
    async fn book_slot(
        &self,
        customer_id: DbId,
        location_id: DbId,
        slot_at: Timestamp,
    ) -> BookingOutcome;
}

/// Placeholder until the upstream integration exists. Always fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct StubBookingClient;

#[async_trait]
impl BookingClient for StubBookingClient {
    async fn book_slot(
        &self,
        customer_id: DbId,
        location_id: DbId,
        slot_at: Timestamp,
    ) -> BookingOutcome {
        tracing::debug!(customer_id, location_id, slot_at = %slot_at, "Stub booking call");
        BookingOutcome::failed(NOT_IMPLEMENTED, "Booking stub - not yet implemented")
    }
}
