//! Domain logic for the slot dispatcher.
//!
//! Everything in this crate is pure: no database, no clock reads except
//! where a caller omits `now`, no network. The `db` crate maps rows into
//! these types and the `worker` crate orchestrates them.

pub mod error;
pub mod messages;
pub mod preset;
pub mod queue;
pub mod slot_key;
pub mod status;
pub mod target_window;
pub mod types;
