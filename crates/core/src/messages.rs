//! Customer message templates and dedupe keys.
//!
//! Every message is logged under a dedupe key that names the semantic event
//! it reports. The message log's unique constraint turns a repeated send of
//! the same event into a no-op.

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::status::MessageKind;
use crate::types::{DbId, Timestamp};

/// Display name used when a location cannot be resolved.
pub const UNKNOWN_LOCATION: &str = "Unknown Location";

/// A rendered message, stored verbatim in the log's `meta_json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageTemplate {
    pub kind: MessageKind,
    pub subject: Option<String>,
    pub body: String,
}

/// Sent when an entry crosses into the deposit band.
pub fn deposit_needed(pay_url: &str) -> MessageTemplate {
    MessageTemplate {
        kind: MessageKind::DepositNeeded,
        subject: Some("Deposit required to activate booking".to_string()),
        body: format!(
            "You are near the front of the queue. A deposit is required to hold your place \
             and activate managed booking.\n\
             Pay link: {pay_url}\n\
             Once paid, we will attempt to book the earliest available appointment that \
             matches your preferences."
        ),
    }
}

/// Sent after a successful booking.
pub fn booked(location_name: &str, slot_at: Timestamp, zone: Tz) -> MessageTemplate {
    MessageTemplate {
        kind: MessageKind::Booked,
        subject: Some("Appointment booked".to_string()),
        body: format!(
            "Your appointment is booked at {location_name}.\n\
             Date and time: {}\n\
             Next steps: Bring required documents and arrive early.",
            format_local_datetime(slot_at, zone)
        ),
    }
}

/// Sent at most once per customer per local day when an opening passed them by.
pub fn opportunity_passed() -> MessageTemplate {
    MessageTemplate {
        kind: MessageKind::OpportunityPassed,
        subject: Some("Appointment opening missed".to_string()),
        body: "An opening appeared outside your selected availability, so we did not book it.\n\
               Consider widening your availability to improve your chances.\n\
               We will never book outside your approved preferences."
            .to_string(),
    }
}

/// Human-readable local time, e.g. `Tue, Jan 13, 2026, 8:30 AM HST`.
pub fn format_local_datetime(at: Timestamp, zone: Tz) -> String {
    at.with_timezone(&zone)
        .format("%a, %b %d, %Y, %-I:%M %p %Z")
        .to_string()
}

/* --------------------------------------------------------------------------
   Dedupe keys
   -------------------------------------------------------------------------- */

pub fn deposit_needed_key(queue_entry_id: DbId) -> String {
    format!("deposit_needed:{queue_entry_id}")
}

/// `slot_time` should already be normalized (see [`crate::slot_key`]).
pub fn booked_key(customer_id: DbId, slot_date: &str, slot_time: &str) -> String {
    format!("booked:{customer_id}:{slot_date}:{slot_time}")
}

pub fn opportunity_passed_key(customer_id: DbId, local_date: NaiveDate) -> String {
    format!("opportunity_passed:{customer_id}:{}", local_date.format("%Y-%m-%d"))
}
