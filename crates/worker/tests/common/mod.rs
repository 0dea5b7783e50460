#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use slotline_core::preset::{
    DateHorizonRule, Preset, PresetRule, TimeBlockRule, WeekdayMode, WeekdayRule,
};
use slotline_core::queue::{QueueEntry, QueueTransition};
use slotline_core::slot_key::normalize_time;
use slotline_core::status::{DepositStatus, QueueStatus};
use slotline_core::target_window::CustomerSelection;
use slotline_core::types::{DbId, RunId, Timestamp};
use slotline_db::models::booking_attempt::NewBookingAttempt;
use slotline_db::models::message::NewMessage;
use slotline_db::models::slot::OpenedSlot;
use slotline_worker::booking::{BookingClient, BookingOutcome, StubBookingClient};
use slotline_worker::config::DispatchConfig;
use slotline_worker::cycle::QueueDispatcher;
use slotline_worker::error::StoreError;
use slotline_worker::store::{DispatchStore, LocationPreferences};

pub const HONOLULU: chrono_tz::Tz = chrono_tz::Pacific::Honolulu;

/// Civil time in Honolulu, January 2026.
pub fn hst(day: u32, hour: u32, minute: u32) -> Timestamp {
    HONOLULU
        .with_ymd_and_hms(2026, 1, day, hour, minute, 0)
        .single()
        .unwrap()
        .with_timezone(&Utc)
}

/// Tuesday 2026-01-06, 10:00 HST.
pub fn now() -> Timestamp {
    hst(6, 10, 0)
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct HeldLock {
    pub locked_until: Timestamp,
    pub owner: RunId,
}

/// Everything the in-memory store holds. Tests read and seed it directly.
#[derive(Debug)]
pub struct State {
    /// The store's clock, used where Postgres would use `NOW()`.
    pub clock: Timestamp,
    pub watermarks: HashMap<String, Timestamp>,
    pub watermark_reads: usize,
    pub slots: Vec<OpenedSlot>,
    pub queue: Vec<QueueEntry>,
    pub selections: HashMap<DbId, CustomerSelection>,
    pub preferences: LocationPreferences,
    pub presets: Vec<Preset>,
    pub locations: HashMap<DbId, String>,
    pub locks: HashMap<String, HeldLock>,
    pub attempts: Vec<NewBookingAttempt>,
    pub messages: Vec<NewMessage>,
    /// Name of a store operation that should fail.
    pub fail_on: Option<&'static str>,
}

pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new(clock: Timestamp) -> Self {
        Self {
            state: Mutex::new(State {
                clock,
                watermarks: HashMap::new(),
                watermark_reads: 0,
                slots: Vec::new(),
                queue: Vec::new(),
                selections: HashMap::new(),
                preferences: LocationPreferences::new(),
                presets: standard_presets(),
                locations: HashMap::new(),
                locks: HashMap::new(),
                attempts: Vec::new(),
                messages: Vec::new(),
                fail_on: None,
            }),
        }
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub fn entry(&self, id: DbId) -> QueueEntry {
        self.with_state(|s| s.queue.iter().find(|e| e.id == id).cloned().unwrap())
    }

    pub fn messages_of_kind(&self, kind: &str) -> Vec<NewMessage> {
        self.with_state(|s| {
            s.messages
                .iter()
                .filter(|m| m.template.kind.as_str() == kind)
                .cloned()
                .collect()
        })
    }

    /// Seed a paid, active customer who accepts `location` and has the
    /// standard weekday-morning selection.
    pub fn add_paid_customer(&self, id: DbId, created_at: Timestamp, location: DbId) {
        self.with_state(|s| {
            s.queue.push(entry(
                id,
                created_at,
                QueueStatus::Active,
                DepositStatus::Paid,
            ));
            s.selections.insert(customer_of(id), weekday_mornings(customer_of(id)));
            s.preferences
                .entry(customer_of(id))
                .or_default()
                .insert(location);
        });
    }

    pub fn add_slot(&self, location: DbId, date: &str, time: &str, first_seen: Timestamp) {
        self.with_state(|s| {
            s.slots.push(OpenedSlot {
                location_id: location,
                slot_date: date.to_string(),
                slot_time: time.to_string(),
                first_seen,
                last_seen: s.clock,
            })
        });
    }

    fn check(&self, state: &State, op: &'static str) -> Result<(), StoreError> {
        match state.fail_on {
            Some(failing) if failing == op => {
                Err(StoreError::Unavailable(format!("{op} failed")))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl DispatchStore for MemoryStore {
    async fn watermark(&self, key: &str) -> Result<Option<Timestamp>, StoreError> {
        let mut s = self.state.lock().unwrap();
        self.check(&s, "watermark")?;
        s.watermark_reads += 1;
        Ok(s.watermarks.get(key).copied())
    }

    async fn advance_watermark(&self, key: &str, at: Timestamp) -> Result<(), StoreError> {
        let mut s = self.state.lock().unwrap();
        self.check(&s, "advance_watermark")?;
        let current = s.watermarks.entry(key.to_string()).or_insert(at);
        *current = (*current).max(at);
        Ok(())
    }

    async fn opened_slots(
        &self,
        since: Timestamp,
        lookback_minutes: i32,
    ) -> Result<Vec<OpenedSlot>, StoreError> {
        let s = self.state.lock().unwrap();
        self.check(&s, "opened_slots")?;
        let horizon = s.clock - Duration::minutes(i64::from(lookback_minutes));
        let mut slots: Vec<OpenedSlot> = s
            .slots
            .iter()
            .filter(|slot| slot.first_seen > since && slot.last_seen > horizon)
            .filter(|slot| !slot.slot_date.is_empty() && !slot.slot_time.is_empty())
            .map(|slot| OpenedSlot {
                slot_time: normalize_time(&slot.slot_time),
                ..slot.clone()
            })
            .collect();
        slots.sort_by_key(|slot| slot.first_seen);
        Ok(slots)
    }

    async fn ranked_queue(&self) -> Result<Vec<QueueEntry>, StoreError> {
        let s = self.state.lock().unwrap();
        self.check(&s, "ranked_queue")?;
        let mut entries: Vec<QueueEntry> = s
            .queue
            .iter()
            .filter(|e| e.status.is_ranked())
            .cloned()
            .collect();
        entries.sort_by_key(|e| (e.created_at, e.id));
        Ok(entries)
    }

    async fn apply_transition(
        &self,
        entry_id: DbId,
        transition: &QueueTransition,
    ) -> Result<bool, StoreError> {
        let mut s = self.state.lock().unwrap();
        self.check(&s, "apply_transition")?;
        let clock = s.clock;
        Ok(s.queue
            .iter_mut()
            .find(|e| e.id == entry_id)
            .is_some_and(|entry| transition.apply(entry, clock).is_ok()))
    }

    async fn selections(
        &self,
        customer_ids: &[DbId],
    ) -> Result<Vec<CustomerSelection>, StoreError> {
        let s = self.state.lock().unwrap();
        self.check(&s, "selections")?;
        Ok(customer_ids
            .iter()
            .filter_map(|id| s.selections.get(id).cloned())
            .collect())
    }

    async fn location_preferences(
        &self,
        customer_ids: &[DbId],
    ) -> Result<LocationPreferences, StoreError> {
        let s = self.state.lock().unwrap();
        self.check(&s, "location_preferences")?;
        Ok(customer_ids
            .iter()
            .filter_map(|id| s.preferences.get(id).map(|locs| (*id, locs.clone())))
            .collect())
    }

    async fn active_presets(&self) -> Result<Vec<Preset>, StoreError> {
        let s = self.state.lock().unwrap();
        self.check(&s, "active_presets")?;
        Ok(s.presets.iter().filter(|p| p.active).cloned().collect())
    }

    async fn location_name(&self, location_id: DbId) -> Result<Option<String>, StoreError> {
        let s = self.state.lock().unwrap();
        self.check(&s, "location_name")?;
        Ok(s.locations.get(&location_id).cloned())
    }

    async fn acquire_lock(
        &self,
        lock_key: &str,
        owner: RunId,
        ttl_secs: u64,
    ) -> Result<bool, StoreError> {
        let mut s = self.state.lock().unwrap();
        self.check(&s, "acquire_lock")?;
        let clock = s.clock;
        // Postgres compares against a later NOW(); a lock released at the
        // current clock reading counts as expired here.
        if s.locks
            .get(lock_key)
            .is_some_and(|held| held.locked_until > clock)
        {
            return Ok(false);
        }
        s.locks.insert(
            lock_key.to_string(),
            HeldLock {
                locked_until: clock + Duration::seconds(ttl_secs as i64),
                owner,
            },
        );
        Ok(true)
    }

    async fn release_lock(&self, lock_key: &str) -> Result<(), StoreError> {
        let mut s = self.state.lock().unwrap();
        self.check(&s, "release_lock")?;
        let clock = s.clock;
        if let Some(held) = s.locks.get_mut(lock_key) {
            held.locked_until = clock;
        }
        Ok(())
    }

    async fn record_attempt(&self, attempt: &NewBookingAttempt) -> Result<(), StoreError> {
        let mut s = self.state.lock().unwrap();
        self.check(&s, "record_attempt")?;
        s.attempts.push(attempt.clone());
        Ok(())
    }

    async fn send_message(&self, message: &NewMessage) -> Result<bool, StoreError> {
        let mut s = self.state.lock().unwrap();
        self.check(&s, "send_message")?;
        if s.messages.iter().any(|m| m.dedupe_key == message.dedupe_key) {
            return Ok(false);
        }
        s.messages.push(message.clone());
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Booking clients
// ---------------------------------------------------------------------------

/// Records every call and answers with a fixed outcome.
pub struct RecordingBookingClient {
    outcome: BookingOutcome,
    pub calls: Mutex<Vec<(DbId, DbId, Timestamp)>>,
}

impl RecordingBookingClient {
    pub fn succeeding() -> Self {
        Self {
            outcome: BookingOutcome::succeeded(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(DbId, DbId, Timestamp)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BookingClient for RecordingBookingClient {
    async fn book_slot(
        &self,
        customer_id: DbId,
        location_id: DbId,
        slot_at: Timestamp,
    ) -> BookingOutcome {
        self.calls
            .lock()
            .unwrap()
            .push((customer_id, location_id, slot_at));
        self.outcome.clone()
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Customer ids are derived from entry ids so assertions stay readable.
pub fn customer_of(entry_id: DbId) -> DbId {
    entry_id + 100
}

pub fn entry(
    id: DbId,
    created_at: Timestamp,
    status: QueueStatus,
    deposit_status: DepositStatus,
) -> QueueEntry {
    QueueEntry {
        id,
        customer_id: customer_of(id),
        created_at,
        status,
        deposit_status,
        deposit_required_at: None,
        deposit_paid_at: None,
        deposit_expires_at: None,
        booked_at: None,
        booked_location_id: None,
        booked_slot_at: None,
    }
}

pub fn standard_presets() -> Vec<Preset> {
    let preset = |key: &str, sort_order: i32, rule: PresetRule| Preset {
        key: key.to_string(),
        label: key.to_string(),
        active: true,
        sort_order,
        rule,
    };
    vec![
        preset(
            "within_7_days",
            1,
            PresetRule::DateHorizon(DateHorizonRule { days_ahead: 7 }),
        ),
        preset(
            "weekdays",
            1,
            PresetRule::WeekdayRule(WeekdayRule {
                mode: WeekdayMode::Any,
            }),
        ),
        preset(
            "custom",
            2,
            PresetRule::WeekdayRule(WeekdayRule {
                mode: WeekdayMode::Custom,
            }),
        ),
        preset(
            "morning",
            1,
            PresetRule::TimeBlock(TimeBlockRule {
                start: "08:00".to_string(),
                end: "09:45".to_string(),
            }),
        ),
    ]
}

/// Weekdays, 08:00-09:45, within 7 days, Honolulu.
pub fn weekday_mornings(customer_id: DbId) -> CustomerSelection {
    CustomerSelection {
        customer_id,
        timezone: "Pacific/Honolulu".to_string(),
        date_horizon_key: "within_7_days".to_string(),
        weekday_rule_key: "weekdays".to_string(),
        custom_weekdays: Vec::new(),
        time_block_keys: vec!["morning".to_string()],
    }
}

pub fn dispatcher(store: &Arc<MemoryStore>, booking: Arc<dyn BookingClient>) -> QueueDispatcher {
    QueueDispatcher::new(store.clone(), booking, DispatchConfig::default())
}

pub fn stub_dispatcher(store: &Arc<MemoryStore>) -> QueueDispatcher {
    dispatcher(store, Arc::new(StubBookingClient))
}
