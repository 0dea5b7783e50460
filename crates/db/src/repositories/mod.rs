//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod booking_attempt_repo;
pub mod location_repo;
pub mod lock_repo;
pub mod message_repo;
pub mod preset_repo;
pub mod queue_repo;
pub mod selection_repo;
pub mod slot_repo;
pub mod watermark_repo;

pub use booking_attempt_repo::BookingAttemptRepo;
pub use location_repo::LocationRepo;
pub use lock_repo::LockRepo;
pub use message_repo::MessageRepo;
pub use preset_repo::PresetRepo;
pub use queue_repo::QueueRepo;
pub use selection_repo::SelectionRepo;
pub use slot_repo::SlotRepo;
pub use watermark_repo::WatermarkRepo;
