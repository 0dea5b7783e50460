//! The queue dispatch cycle.
//!
//! One cycle reads the opened-slot feed since the watermark, runs the
//! deposit gate over the ranked queue, then offers each slot (under its
//! lock) to the best-ranked eligible customer whose target window accepts
//! it. Outcomes are recorded as booking attempts and deduplicated messages.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use slotline_core::error::CoreError;
use slotline_core::messages::{self, UNKNOWN_LOCATION};
use slotline_core::preset::PresetCatalog;
use slotline_core::queue::{plan_deposit_gate, rank_queue, within_rank, QueueEntry, QueueTransition};
use slotline_core::slot_key::normalize_time;
use slotline_core::status::BookingResult;
use slotline_core::target_window::ResolvedWindow;
use slotline_core::types::{DbId, RunId, Timestamp};
use slotline_db::models::booking_attempt::NewBookingAttempt;
use slotline_db::models::message::NewMessage;
use slotline_db::models::slot::OpenedSlot;
use slotline_db::models::watermark::SLOT_OPENED;

use crate::booking::BookingClient;
use crate::config::DispatchConfig;
use crate::error::{DispatchError, StoreError};
use crate::store::{DispatchStore, LocationPreferences};

/// Counters for one cycle, logged as `queue_dispatch_summary`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleSummary {
    pub run_id: RunId,
    pub old_watermark: Timestamp,
    pub new_watermark: Timestamp,
    pub opened_slots_count: usize,
    pub deposit_required_set_count: usize,
    pub booking_attempt_count: usize,
    pub booking_success_count: usize,
    pub booked_sent_count: usize,
    pub opportunity_passed_sent_count: usize,
}

/// Runs dispatch cycles against a store and a booking client.
pub struct QueueDispatcher {
    store: Arc<dyn DispatchStore>,
    booking: Arc<dyn BookingClient>,
    config: DispatchConfig,
}

impl QueueDispatcher {
    pub fn new(
        store: Arc<dyn DispatchStore>,
        booking: Arc<dyn BookingClient>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            store,
            booking,
            config,
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Run one cycle with `now` as the reference instant.
    ///
    /// Any store failure, or a configured window that does not fit around
    /// `now`, aborts the cycle before the watermark advances.
    pub async fn run_cycle(&self, now: Timestamp) -> Result<CycleSummary, DispatchError> {
        let run_id = uuid::Uuid::new_v4();
        let config = &self.config;

        let old_watermark = match self.store.watermark(SLOT_OPENED).await? {
            Some(at) => at,
            None => minutes_before(now, config.watermark_fallback_minutes)?,
        };

        let opened = self
            .store
            .opened_slots(old_watermark, config.lookback_minutes)
            .await?;
        let mut queue = rank_queue(self.store.ranked_queue().await?);

        let mut summary = CycleSummary {
            run_id,
            old_watermark,
            new_watermark: old_watermark,
            opened_slots_count: opened.len(),
            deposit_required_set_count: 0,
            booking_attempt_count: 0,
            booking_success_count: 0,
            booked_sent_count: 0,
            opportunity_passed_sent_count: 0,
        };

        summary.deposit_required_set_count = self.enforce_deposits(&mut queue, now).await?;

        let eligible: Vec<DbId> = queue
            .iter()
            .filter(|e| e.is_eligible())
            .map(|e| e.customer_id)
            .collect();
        let selections = self.store.selections(&eligible).await?;
        let preferences = self.store.location_preferences(&eligible).await?;
        let catalog = PresetCatalog::new(self.store.active_presets().await?);

        let windows: HashMap<DbId, ResolvedWindow<'_>> = selections
            .iter()
            .filter_map(|selection| match catalog.resolve(selection) {
                Some(window) => Some((selection.customer_id, window)),
                None => {
                    tracing::debug!(
                        customer_id = selection.customer_id,
                        "Selection does not resolve to a target window"
                    );
                    None
                }
            })
            .collect();
        let candidates = Candidates {
            windows,
            preferences,
        };

        let mut missed: BTreeSet<(DbId, NaiveDate)> = BTreeSet::new();
        let mut location_names: HashMap<DbId, String> = HashMap::new();

        for slot in &opened {
            let Some(slot_at) = slot_datetime(&slot.slot_date, &slot.slot_time, config.slot_timezone)
            else {
                tracing::warn!(
                    location_id = slot.location_id,
                    slot_date = %slot.slot_date,
                    slot_time = %slot.slot_time,
                    "Skipping slot with unparseable date/time"
                );
                continue;
            };

            let lock_key = slot.key();
            if !self
                .store
                .acquire_lock(&lock_key, run_id, config.lock_ttl_secs)
                .await?
            {
                tracing::debug!(lock_key = %lock_key, "Slot locked by another run");
                continue;
            }

            let scan = scan_queue(
                &queue,
                &candidates,
                slot.location_id,
                slot_at,
                config.opportunity_rank_threshold,
                now,
            );
            missed.extend(scan.missed);

            let Some(index) = scan.winner else {
                self.store.release_lock(&lock_key).await?;
                continue;
            };

            let entry = &mut queue[index];
            summary.booking_attempt_count += 1;
            if !self.attempt_booking(run_id, slot, slot_at, entry, now).await? {
                continue;
            }
            summary.booking_success_count += 1;

            let location_name = self
                .location_name(slot.location_id, &mut location_names)
                .await?;
            let zone = candidates
                .windows
                .get(&entry.customer_id)
                .map_or(config.notice_timezone, |window| window.timezone);
            let message = NewMessage::new(
                entry.customer_id,
                messages::booked_key(entry.customer_id, &slot.slot_date, &slot.slot_time),
                messages::booked(&location_name, slot_at, zone),
            );
            if self.store.send_message(&message).await? {
                summary.booked_sent_count += 1;
            }
        }

        for (customer_id, day) in missed {
            let message = NewMessage::new(
                customer_id,
                messages::opportunity_passed_key(customer_id, day),
                messages::opportunity_passed(),
            );
            if self.store.send_message(&message).await? {
                summary.opportunity_passed_sent_count += 1;
            }
        }

        if let Some(latest) = opened.iter().map(|slot| slot.first_seen).max() {
            self.store.advance_watermark(SLOT_OPENED, latest).await?;
            summary.new_watermark = latest;
        }

        tracing::info!(
            run_id = %summary.run_id,
            old_watermark = %summary.old_watermark,
            new_watermark = %summary.new_watermark,
            opened_slots_count = summary.opened_slots_count,
            deposit_required_set_count = summary.deposit_required_set_count,
            booking_attempt_count = summary.booking_attempt_count,
            booking_success_count = summary.booking_success_count,
            booked_sent_count = summary.booked_sent_count,
            opportunity_passed_sent_count = summary.opportunity_passed_sent_count,
            "queue_dispatch_summary"
        );

        Ok(summary)
    }

    /// Apply the deposit gate and send deposit requests.
    ///
    /// Returns how many entries were newly asked for a deposit. The in-memory
    /// queue is updated for every transition the store accepted.
    async fn enforce_deposits(
        &self,
        queue: &mut [QueueEntry],
        now: Timestamp,
    ) -> Result<usize, DispatchError> {
        let grace = Duration::try_minutes(self.config.deposit_grace_minutes).ok_or_else(|| {
            CoreError::Validation(format!(
                "Deposit grace of {} minutes is out of range",
                self.config.deposit_grace_minutes
            ))
        })?;
        let actions = plan_deposit_gate(queue, self.config.deposit_rank_threshold, grace, now)?;

        let mut required = 0;
        for action in actions {
            if !self
                .store
                .apply_transition(action.entry_id, &action.transition)
                .await?
            {
                tracing::debug!(
                    entry_id = action.entry_id,
                    transition = action.transition.name(),
                    "Queue entry changed concurrently, transition skipped"
                );
                continue;
            }

            let entry = &mut queue[action.index];
            if let Err(err) = action.transition.apply(entry, now) {
                tracing::warn!(entry_id = entry.id, error = %err, "Queue snapshot out of sync");
            }
            tracing::info!(
                entry_id = entry.id,
                customer_id = entry.customer_id,
                rank = action.rank,
                transition = action.transition.name(),
                "Deposit gate transition"
            );

            if let QueueTransition::RequireDeposit { .. } = action.transition {
                required += 1;
                let message = NewMessage::new(
                    entry.customer_id,
                    messages::deposit_needed_key(entry.id),
                    messages::deposit_needed(&self.config.deposit_pay_url),
                );
                self.store.send_message(&message).await?;
            }
        }
        Ok(required)
    }

    /// Call the booking client for the winning entry and record the attempt.
    ///
    /// Returns `true` if the booking succeeded. A failed booking leaves the
    /// entry unchanged and the slot lock held until it expires.
    async fn attempt_booking(
        &self,
        run_id: RunId,
        slot: &OpenedSlot,
        slot_at: Timestamp,
        entry: &mut QueueEntry,
        now: Timestamp,
    ) -> Result<bool, StoreError> {
        let outcome = self
            .booking
            .book_slot(entry.customer_id, slot.location_id, slot_at)
            .await;

        let attempt = NewBookingAttempt {
            customer_id: entry.customer_id,
            location_id: slot.location_id,
            slot_date: slot.slot_date.clone(),
            slot_time: slot.slot_time.clone(),
            slot_at,
            result: if outcome.success {
                BookingResult::Success
            } else {
                BookingResult::Fail
            },
            error_code: outcome.error_code.clone(),
            error_message: outcome.error_message.clone(),
            dispatcher_run_id: run_id,
        };
        self.store.record_attempt(&attempt).await?;

        if !outcome.success {
            tracing::info!(
                customer_id = entry.customer_id,
                location_id = slot.location_id,
                error_code = outcome.error_code.as_deref().unwrap_or(""),
                "Booking attempt failed"
            );
            return Ok(false);
        }

        let transition = QueueTransition::Book {
            location_id: slot.location_id,
            slot_at,
        };
        if !self.store.apply_transition(entry.id, &transition).await? {
            tracing::warn!(
                entry_id = entry.id,
                "Slot booked but queue entry changed concurrently"
            );
        }
        if let Err(err) = transition.apply(entry, now) {
            tracing::warn!(entry_id = entry.id, error = %err, "Queue snapshot out of sync");
        }
        tracing::info!(
            entry_id = entry.id,
            customer_id = entry.customer_id,
            location_id = slot.location_id,
            slot_at = %slot_at,
            "Slot booked"
        );
        Ok(true)
    }

    async fn location_name(
        &self,
        location_id: DbId,
        cache: &mut HashMap<DbId, String>,
    ) -> Result<String, StoreError> {
        if let Some(name) = cache.get(&location_id) {
            return Ok(name.clone());
        }
        let name = self
            .store
            .location_name(location_id)
            .await?
            .unwrap_or_else(|| UNKNOWN_LOCATION.to_string());
        cache.insert(location_id, name.clone());
        Ok(name)
    }
}

/// `now` minus `minutes`, or an error if either step is out of range.
fn minutes_before(now: Timestamp, minutes: i64) -> Result<Timestamp, CoreError> {
    Duration::try_minutes(minutes)
        .and_then(|span| now.checked_sub_signed(span))
        .ok_or_else(|| {
            CoreError::Validation(format!("Watermark fallback of {minutes} minutes is out of range"))
        })
}

/// Interpret a feed date (`YYYY-MM-DD`) and time as civil time in `zone`.
///
/// Returns `None` for an unparseable value or a local time that does not
/// exist in `zone`.
pub fn slot_datetime(slot_date: &str, slot_time: &str, zone: Tz) -> Option<Timestamp> {
    let date = NaiveDate::parse_from_str(slot_date.trim(), "%Y-%m-%d").ok()?;
    let time = NaiveTime::parse_from_str(&normalize_time(slot_time), "%H:%M:%S").ok()?;
    zone.from_local_datetime(&date.and_time(time))
        .earliest()
        .map(|local| local.with_timezone(&Utc))
}

/// Per-cycle lookups for the customers eligible to receive a slot.
pub(crate) struct Candidates<'a> {
    pub windows: HashMap<DbId, ResolvedWindow<'a>>,
    pub preferences: LocationPreferences,
}

/// Result of scanning the ranked queue for one slot.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct SlotScan {
    /// Index into the ranked queue of the entry that gets the slot.
    pub winner: Option<usize>,
    /// Customers within the opportunity band whose window rejected the
    /// slot, with the customer's local day.
    pub missed: Vec<(DbId, NaiveDate)>,
}

/// Scan the queue in rank order for the first entry that accepts the slot.
///
/// Entries that are not eligible, exclude the slot's location, or lack a
/// resolvable window are skipped without counting as a miss.
pub(crate) fn scan_queue(
    queue: &[QueueEntry],
    candidates: &Candidates<'_>,
    location_id: DbId,
    slot_at: Timestamp,
    opportunity_rank: usize,
    now: Timestamp,
) -> SlotScan {
    let mut scan = SlotScan::default();
    for (index, entry) in queue.iter().enumerate() {
        if !entry.is_eligible() {
            continue;
        }
        let wants_location = candidates
            .preferences
            .get(&entry.customer_id)
            .is_some_and(|locations| locations.contains(&location_id));
        if !wants_location {
            continue;
        }
        let Some(window) = candidates.windows.get(&entry.customer_id) else {
            continue;
        };

        if window.matches(slot_at, Some(now)) {
            scan.winner = Some(index);
            break;
        }
        if within_rank(index + 1, opportunity_rank) {
            let day = now.with_timezone(&window.timezone).date_naive();
            scan.missed.push((entry.customer_id, day));
        }
    }
    scan
}
