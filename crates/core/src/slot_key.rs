//! Canonical identity for a `(location, date, time)` slot.
//!
//! The key doubles as the lock identity in `booking_locks` and as part of
//! the `booked:` dedupe key, so two raw spellings of the same time must
//! produce the same key.

use crate::types::DbId;

/// Separator between key components. Never appears in a date or time.
const SEPARATOR: char = '|';

/// Build the slot key: `location|YYYY-MM-DD|HH:MM:SS`.
pub fn slot_key(location_id: DbId, slot_date: &str, slot_time: &str) -> String {
    format!(
        "{location_id}{SEPARATOR}{}{SEPARATOR}{}",
        slot_date.trim(),
        normalize_time(slot_time)
    )
}

/// Normalize a time-of-day string to `HH:MM:SS`.
///
/// Missing minutes or seconds default to `00`, single-digit components are
/// zero-padded, and an empty string becomes midnight. A value with more
/// than three components is returned trimmed but otherwise as written, so it
/// never shares a key with a well-formed time.
pub fn normalize_time(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return "00:00:00".to_string();
    }
    if raw.split(':').count() > 3 {
        return raw.to_string();
    }

    let mut parts = raw.split(':');
    let mut next = || {
        let part = parts.next().map(str::trim).unwrap_or("");
        if part.is_empty() {
            "00".to_string()
        } else {
            format!("{part:0>2}")
        }
    };

    let hours = next();
    let minutes = next();
    let seconds = next();
    format!("{hours}:{minutes}:{seconds}")
}
