//! Queue dispatch worker.
//!
//! [`cycle::QueueDispatcher`] runs one dispatch cycle over a
//! [`store::DispatchStore`]; [`scheduler::run`] repeats it on an interval.

pub mod booking;
pub mod config;
pub mod cycle;
pub mod error;
pub mod pg_store;
pub mod scheduler;
pub mod store;
