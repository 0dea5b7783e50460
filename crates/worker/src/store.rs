//! The dispatcher's view of persistent state.
//!
//! [`DispatchStore`] is the seam between the dispatch cycle and storage.
//! [`crate::pg_store::PgDispatchStore`] implements it over the repositories;
//! tests substitute an in-memory implementation.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use slotline_core::preset::Preset;
use slotline_core::queue::{QueueEntry, QueueTransition};
use slotline_core::target_window::CustomerSelection;
use slotline_core::types::{DbId, RunId, Timestamp};
use slotline_db::models::booking_attempt::NewBookingAttempt;
use slotline_db::models::message::NewMessage;
use slotline_db::models::slot::OpenedSlot;

use crate::error::StoreError;

/// Customer id -> acceptable location ids.
pub type LocationPreferences = HashMap<DbId, HashSet<DbId>>;

#[async_trait]
pub trait DispatchStore: Send + Sync {
    /// Last processed instant for a watermark stream.
    async fn watermark(&self, key: &str) -> Result<Option<Timestamp>, StoreError>;

    /// Advance a watermark stream. Never moves it backwards.
    async fn advance_watermark(&self, key: &str, at: Timestamp) -> Result<(), StoreError>;

    /// Slots first seen after `since` and last seen within the lookback,
    /// ordered by `first_seen`, with normalized `slot_time`.
    async fn opened_slots(
        &self,
        since: Timestamp,
        lookback_minutes: i32,
    ) -> Result<Vec<OpenedSlot>, StoreError>;

    /// Queue entries in ranked statuses, oldest first.
    async fn ranked_queue(&self) -> Result<Vec<QueueEntry>, StoreError>;

    /// Conditionally apply a transition. `Ok(false)` if the guard no longer holds.
    async fn apply_transition(
        &self,
        entry_id: DbId,
        transition: &QueueTransition,
    ) -> Result<bool, StoreError>;

    async fn selections(
        &self,
        customer_ids: &[DbId],
    ) -> Result<Vec<CustomerSelection>, StoreError>;

    async fn location_preferences(
        &self,
        customer_ids: &[DbId],
    ) -> Result<LocationPreferences, StoreError>;

    /// Active presets whose rules decode. Malformed presets are left out.
    async fn active_presets(&self) -> Result<Vec<Preset>, StoreError>;

    async fn location_name(&self, location_id: DbId) -> Result<Option<String>, StoreError>;

    /// Atomically acquire a slot lock. `Ok(false)` on contention.
    async fn acquire_lock(
        &self,
        lock_key: &str,
        owner: RunId,
        ttl_secs: u64,
    ) -> Result<bool, StoreError>;

    async fn release_lock(&self, lock_key: &str) -> Result<(), StoreError>;

    async fn record_attempt(&self, attempt: &NewBookingAttempt) -> Result<(), StoreError>;

    /// Log a message under its dedupe key. `Ok(false)` if already sent.
    async fn send_message(&self, message: &NewMessage) -> Result<bool, StoreError>;
}
