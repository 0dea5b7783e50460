//! [`DispatchStore`] backed by Postgres.

use async_trait::async_trait;
use slotline_core::preset::Preset;
use slotline_core::queue::{QueueEntry, QueueTransition};
use slotline_core::target_window::CustomerSelection;
use slotline_core::types::{DbId, RunId, Timestamp};
use slotline_db::models::booking_attempt::NewBookingAttempt;
use slotline_db::models::message::NewMessage;
use slotline_db::models::slot::OpenedSlot;
use slotline_db::repositories::{
    BookingAttemptRepo, LocationRepo, LockRepo, MessageRepo, PresetRepo, QueueRepo,
    SelectionRepo, SlotRepo, WatermarkRepo,
};
use slotline_db::DbPool;

use crate::error::StoreError;
use crate::store::{DispatchStore, LocationPreferences};

pub struct PgDispatchStore {
    pool: DbPool,
}

impl PgDispatchStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DispatchStore for PgDispatchStore {
    async fn watermark(&self, key: &str) -> Result<Option<Timestamp>, StoreError> {
        Ok(WatermarkRepo::find(&self.pool, key)
            .await?
            .map(|w| w.last_processed_at))
    }

    async fn advance_watermark(&self, key: &str, at: Timestamp) -> Result<(), StoreError> {
        WatermarkRepo::advance(&self.pool, key, at).await?;
        Ok(())
    }

    async fn opened_slots(
        &self,
        since: Timestamp,
        lookback_minutes: i32,
    ) -> Result<Vec<OpenedSlot>, StoreError> {
        Ok(SlotRepo::fetch_opened_since(&self.pool, since, lookback_minutes).await?)
    }

    async fn ranked_queue(&self) -> Result<Vec<QueueEntry>, StoreError> {
        let entries = QueueRepo::list_ranked(&self.pool)
            .await?
            .into_iter()
            .map(QueueEntry::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    async fn apply_transition(
        &self,
        entry_id: DbId,
        transition: &QueueTransition,
    ) -> Result<bool, StoreError> {
        Ok(QueueRepo::apply_transition(&self.pool, entry_id, transition).await?)
    }

    async fn selections(
        &self,
        customer_ids: &[DbId],
    ) -> Result<Vec<CustomerSelection>, StoreError> {
        Ok(SelectionRepo::list_for_customers(&self.pool, customer_ids)
            .await?
            .into_iter()
            .map(CustomerSelection::from)
            .collect())
    }

    async fn location_preferences(
        &self,
        customer_ids: &[DbId],
    ) -> Result<LocationPreferences, StoreError> {
        let mut by_customer = LocationPreferences::new();
        for pref in LocationRepo::list_preferences_for_customers(&self.pool, customer_ids).await? {
            by_customer
                .entry(pref.customer_id)
                .or_default()
                .insert(pref.location_id);
        }
        Ok(by_customer)
    }

    async fn active_presets(&self) -> Result<Vec<Preset>, StoreError> {
        let rows = PresetRepo::list_active(&self.pool).await?;
        let presets = rows
            .into_iter()
            .filter_map(|row| {
                let (id, key) = (row.id, row.key.clone());
                match Preset::try_from(row) {
                    Ok(preset) => Some(preset),
                    Err(e) => {
                        tracing::warn!(preset_id = id, key = %key, error = %e, "Skipping malformed preset");
                        None
                    }
                }
            })
            .collect();
        Ok(presets)
    }

    async fn location_name(&self, location_id: DbId) -> Result<Option<String>, StoreError> {
        Ok(LocationRepo::find_by_id(&self.pool, location_id)
            .await?
            .map(|l| l.name))
    }

    async fn acquire_lock(
        &self,
        lock_key: &str,
        owner: RunId,
        ttl_secs: u64,
    ) -> Result<bool, StoreError> {
        Ok(LockRepo::acquire(&self.pool, lock_key, owner, ttl_secs).await?)
    }

    async fn release_lock(&self, lock_key: &str) -> Result<(), StoreError> {
        LockRepo::release(&self.pool, lock_key).await?;
        Ok(())
    }

    async fn record_attempt(&self, attempt: &NewBookingAttempt) -> Result<(), StoreError> {
        BookingAttemptRepo::insert(&self.pool, attempt).await?;
        Ok(())
    }

    async fn send_message(&self, message: &NewMessage) -> Result<bool, StoreError> {
        Ok(MessageRepo::insert_with_dedupe(&self.pool, message)
            .await?
            .is_some())
    }
}
