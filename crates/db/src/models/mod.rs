//! Row models and insert DTOs.
//!
//! Each submodule contains a `FromRow` struct matching the table row and,
//! where the dispatcher consumes the row, a conversion into the matching
//! `slotline_core` domain type. Conversion failures surface as
//! [`sqlx::Error::Decode`].

pub mod booking_attempt;
pub mod location;
pub mod lock;
pub mod message;
pub mod preset;
pub mod queue_entry;
pub mod selection;
pub mod slot;
pub mod watermark;

/// Wrap a domain decoding error as a `sqlx` decode error.
pub(crate) fn decode_error(err: slotline_core::error::CoreError) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(err))
}
