//! Repository tests against a real Postgres.
//!
//! Each test gets a freshly migrated database; `DATABASE_URL` must be set.

use chrono::{Duration, Utc};
use slotline_core::messages;
use slotline_core::preset::{PresetRule, PresetType, WeekdayMode};
use slotline_core::queue::{QueueEntry, QueueTransition};
use slotline_core::target_window::CustomerSelection;
use slotline_core::status::{BookingResult, DepositStatus, QueueStatus};
use slotline_core::types::DbId;
use slotline_db::models::booking_attempt::NewBookingAttempt;
use slotline_db::models::message::NewMessage;
use slotline_db::models::selection::UpsertSelection;
use slotline_db::models::watermark::SLOT_OPENED;
use slotline_db::repositories::{
    BookingAttemptRepo, LocationRepo, LockRepo, MessageRepo, PresetRepo, QueueRepo,
    SelectionRepo, SlotRepo, WatermarkRepo,
};
use sqlx::PgPool;

async fn seed_customer(pool: &PgPool, phone: &str) -> DbId {
    sqlx::query_scalar("INSERT INTO customers (phone) VALUES ($1) RETURNING id")
        .bind(phone)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn seed_location(pool: &PgPool, name: &str) -> DbId {
    sqlx::query_scalar("INSERT INTO locations (name) VALUES ($1) RETURNING id")
        .bind(name)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn load_entry(pool: &PgPool, id: DbId) -> QueueEntry {
    QueueRepo::find_by_id(pool, id)
        .await
        .unwrap()
        .unwrap()
        .try_into()
        .unwrap()
}

// ---------------------------------------------------------------------------
// Locks
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn lock_is_exclusive_until_released(pool: PgPool) {
    let key = "1|2026-01-13|08:30:00";
    let first = uuid::Uuid::new_v4();
    let second = uuid::Uuid::new_v4();

    assert!(LockRepo::acquire(&pool, key, first, 120).await.unwrap());
    assert!(!LockRepo::acquire(&pool, key, second, 120).await.unwrap());

    let held = LockRepo::find(&pool, key).await.unwrap().unwrap();
    assert_eq!(held.owner_run_id, first);

    LockRepo::release(&pool, key).await.unwrap();
    assert!(LockRepo::acquire(&pool, key, second, 120).await.unwrap());
    let held = LockRepo::find(&pool, key).await.unwrap().unwrap();
    assert_eq!(held.owner_run_id, second);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn concurrent_acquire_has_one_winner(pool: PgPool) {
    let key = "2|2026-01-14|09:00:00";
    let attempts = (0..8).map(|_| {
        let pool = pool.clone();
        tokio::spawn(async move { LockRepo::acquire(&pool, key, uuid::Uuid::new_v4(), 120).await })
    });

    let mut winners = 0;
    for handle in attempts {
        if handle.await.unwrap().unwrap() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn expired_lock_can_be_taken_over(pool: PgPool) {
    let key = "3|2026-01-15|10:00:00";
    assert!(LockRepo::acquire(&pool, key, uuid::Uuid::new_v4(), 0).await.unwrap());
    // A zero TTL expires at the insert's NOW(); any later statement sees it lapsed.
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert!(LockRepo::acquire(&pool, key, uuid::Uuid::new_v4(), 120).await.unwrap());
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn duplicate_dedupe_key_is_already_sent(pool: PgPool) {
    let customer = seed_customer(&pool, "+18085550100").await;
    let msg = NewMessage::new(
        customer,
        messages::opportunity_passed_key(customer, Utc::now().date_naive()),
        messages::opportunity_passed(),
    );

    let first = MessageRepo::insert_with_dedupe(&pool, &msg).await.unwrap();
    assert!(first.is_some());
    let second = MessageRepo::insert_with_dedupe(&pool, &msg).await.unwrap();
    assert!(second.is_none());

    let rows = MessageRepo::list_for_customer(&pool, customer, None).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].message_type, "opportunity_passed");
    assert_eq!(
        rows[0].meta_json.as_ref().and_then(|m| m["template"]["kind"].as_str()),
        Some("opportunity_passed")
    );
    assert!(MessageRepo::has_been_sent(&pool, &msg.dedupe_key).await.unwrap());
}

// ---------------------------------------------------------------------------
// Queue transitions
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn require_deposit_applies_once(pool: PgPool) {
    let customer = seed_customer(&pool, "+18085550101").await;
    let entry = QueueRepo::enqueue(&pool, customer).await.unwrap();
    let transition = QueueTransition::RequireDeposit {
        expires_at: Utc::now() + Duration::minutes(120),
    };

    assert!(QueueRepo::apply_transition(&pool, entry.id, &transition).await.unwrap());
    assert!(!QueueRepo::apply_transition(&pool, entry.id, &transition).await.unwrap());

    let loaded = load_entry(&pool, entry.id).await;
    assert_eq!(loaded.status, QueueStatus::DepositRequired);
    assert_eq!(loaded.deposit_status, DepositStatus::Required);
    assert!(loaded.deposit_required_at.is_some());
    assert!(loaded.deposit_expires_at.is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn expire_deposit_waits_for_the_hold_to_lapse(pool: PgPool) {
    let customer = seed_customer(&pool, "+18085550102").await;
    let entry = QueueRepo::enqueue(&pool, customer).await.unwrap();
    let hold = QueueTransition::RequireDeposit {
        expires_at: Utc::now() + Duration::minutes(5),
    };
    assert!(QueueRepo::apply_transition(&pool, entry.id, &hold).await.unwrap());
    assert!(!QueueRepo::apply_transition(&pool, entry.id, &QueueTransition::ExpireDeposit)
        .await
        .unwrap());

    sqlx::query("UPDATE queue_entries SET deposit_expires_at = NOW() - INTERVAL '1 minute' WHERE id = $1")
        .bind(entry.id)
        .execute(&pool)
        .await
        .unwrap();
    assert!(QueueRepo::apply_transition(&pool, entry.id, &QueueTransition::ExpireDeposit)
        .await
        .unwrap());

    let loaded = load_entry(&pool, entry.id).await;
    assert_eq!(loaded.status, QueueStatus::Queued);
    assert_eq!(loaded.deposit_status, DepositStatus::Expired);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn booking_requires_active_paid_entry(pool: PgPool) {
    let customer = seed_customer(&pool, "+18085550103").await;
    let location = seed_location(&pool, "Kapolei").await;
    let entry = QueueRepo::enqueue(&pool, customer).await.unwrap();
    let book = QueueTransition::Book {
        location_id: location,
        slot_at: Utc::now() + Duration::days(2),
    };

    assert!(!QueueRepo::apply_transition(&pool, entry.id, &book).await.unwrap());

    let hold = QueueTransition::RequireDeposit {
        expires_at: Utc::now() + Duration::minutes(120),
    };
    assert!(QueueRepo::apply_transition(&pool, entry.id, &hold).await.unwrap());
    assert!(QueueRepo::mark_deposit_paid(&pool, entry.id).await.unwrap());
    assert!(QueueRepo::apply_transition(&pool, entry.id, &book).await.unwrap());

    let loaded = load_entry(&pool, entry.id).await;
    assert_eq!(loaded.status, QueueStatus::Booked);
    assert_eq!(loaded.booked_location_id, Some(location));

    // A booked entry is never asked for a deposit again.
    assert!(!QueueRepo::apply_transition(&pool, entry.id, &hold).await.unwrap());
    let ranked = QueueRepo::list_ranked(&pool).await.unwrap();
    assert!(ranked.iter().all(|row| row.id != entry.id));
}

// ---------------------------------------------------------------------------
// Slot feed, watermark and audit
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn opened_slots_respect_watermark_and_lookback(pool: PgPool) {
    let location = seed_location(&pool, "Pearl City").await;
    let watermark = Utc::now() - Duration::minutes(10);

    let rows: [(Option<&str>, Option<&str>, i32, i32); 4] = [
        (Some("2026-01-13"), Some("8:30"), 5, 1),     // fresh
        (Some("2026-01-13"), Some("09:00:00"), 20, 1), // before watermark
        (Some("2026-01-13"), Some("10:00:00"), 5, 30), // stale
        (Some("2026-01-13"), None, 5, 1),              // no time
    ];
    for (date, time, first_ago, last_ago) in rows {
        sqlx::query(
            "INSERT INTO slot_states (location_id, slot_date, slot_time, first_seen, last_seen) \
             VALUES ($1, $2, $3, NOW() - make_interval(mins => $4), NOW() - make_interval(mins => $5))",
        )
        .bind(location)
        .bind(date)
        .bind(time)
        .bind(first_ago)
        .bind(last_ago)
        .execute(&pool)
        .await
        .unwrap();
    }

    let opened = SlotRepo::fetch_opened_since(&pool, watermark, 3).await.unwrap();
    assert_eq!(opened.len(), 1);
    assert_eq!(opened[0].slot_time, "08:30:00");
    assert_eq!(opened[0].key(), format!("{location}|2026-01-13|08:30:00"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn watermark_never_moves_backwards(pool: PgPool) {
    assert!(WatermarkRepo::find(&pool, SLOT_OPENED).await.unwrap().is_none());

    let later = Utc::now();
    WatermarkRepo::advance(&pool, SLOT_OPENED, later).await.unwrap();
    WatermarkRepo::advance(&pool, SLOT_OPENED, later - Duration::minutes(5))
        .await
        .unwrap();

    let stored = WatermarkRepo::find(&pool, SLOT_OPENED).await.unwrap().unwrap();
    assert_eq!(
        stored.last_processed_at.timestamp_micros(),
        later.timestamp_micros()
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn booking_attempts_are_listed_newest_first(pool: PgPool) {
    let customer = seed_customer(&pool, "+18085550104").await;
    let location = seed_location(&pool, "Waianae").await;
    let run_id = uuid::Uuid::new_v4();

    for time in ["08:30:00", "09:00:00"] {
        BookingAttemptRepo::insert(
            &pool,
            &NewBookingAttempt {
                customer_id: customer,
                location_id: location,
                slot_date: "2026-01-13".to_string(),
                slot_time: time.to_string(),
                slot_at: Utc::now(),
                result: BookingResult::Fail,
                error_code: Some("NOT_IMPLEMENTED".to_string()),
                error_message: None,
                dispatcher_run_id: run_id,
            },
        )
        .await
        .unwrap();
    }

    let attempts = BookingAttemptRepo::list_for_customer(&pool, customer, Some(1))
        .await
        .unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].slot_time, "09:00:00");
    assert_eq!(attempts[0].result, "fail");
    assert_eq!(attempts[0].dispatcher_run_id, run_id);
}

// ---------------------------------------------------------------------------
// Presets, selections and preferences
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn presets_decode_and_inactive_rows_are_hidden(pool: PgPool) {
    sqlx::query(
        "INSERT INTO target_window_presets (preset_type, key, label, active, sort_order, rules_json) VALUES \
         ('weekday_rule', 'weekdays', 'Weekdays', true, 1, '{\"mode\": \"any\"}'), \
         ('weekday_rule', 'custom', 'Custom', true, 2, '{\"mode\": \"custom\"}'), \
         ('weekday_rule', 'weekends', 'Weekends', false, 3, '{\"mode\": \"any\"}'), \
         ('time_block', 'morning', 'Morning', true, 1, '{\"start\": \"08:00\", \"end\": \"09:45\"}')",
    )
    .execute(&pool)
    .await
    .unwrap();

    let weekday_rules = PresetRepo::list_active_by_type(&pool, PresetType::WeekdayRule)
        .await
        .unwrap();
    let keys: Vec<&str> = weekday_rules.iter().map(|p| p.key.as_str()).collect();
    assert_eq!(keys, vec!["weekdays", "custom"]);

    let custom = PresetRepo::find_active(&pool, PresetType::WeekdayRule, "custom")
        .await
        .unwrap()
        .unwrap();
    assert_matches::assert_matches!(
        custom.rule,
        PresetRule::WeekdayRule(rule) if rule.mode == WeekdayMode::Custom
    );
    assert!(PresetRepo::find_active(&pool, PresetType::WeekdayRule, "weekends")
        .await
        .unwrap()
        .is_none());

    assert_eq!(PresetRepo::list_active(&pool).await.unwrap().len(), 3);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn selection_upsert_replaces_the_previous_choice(pool: PgPool) {
    let customer = seed_customer(&pool, "+18085550105").await;
    let mut input = UpsertSelection {
        customer_id: customer,
        timezone: "Pacific/Honolulu".to_string(),
        date_horizon_key: "within_7_days".to_string(),
        weekday_rule_key: "custom".to_string(),
        custom_weekdays: vec![2, 4],
        time_block_keys: vec!["morning".to_string()],
    };
    SelectionRepo::upsert(&pool, &input).await.unwrap();

    input.custom_weekdays = vec![2, 4, 9];
    input.time_block_keys.push("afternoon".to_string());
    SelectionRepo::upsert(&pool, &input).await.unwrap();

    let row = SelectionRepo::find_by_customer(&pool, customer)
        .await
        .unwrap()
        .unwrap();
    let selection = CustomerSelection::from(row);
    assert_eq!(selection.custom_weekdays, vec![2, 4]);
    assert_eq!(selection.time_block_keys, vec!["morning", "afternoon"]);

    let batch = SelectionRepo::list_for_customers(&pool, &[customer, customer + 1])
        .await
        .unwrap();
    assert_eq!(batch.len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn location_preferences_add_and_remove(pool: PgPool) {
    let customer = seed_customer(&pool, "+18085550106").await;
    let kapolei = seed_location(&pool, "Kapolei").await;
    let waianae = seed_location(&pool, "Waianae").await;

    assert!(LocationRepo::add_preference(&pool, customer, kapolei).await.unwrap());
    assert!(!LocationRepo::add_preference(&pool, customer, kapolei).await.unwrap());
    assert!(LocationRepo::add_preference(&pool, customer, waianae).await.unwrap());
    assert!(LocationRepo::remove_preference(&pool, customer, waianae).await.unwrap());

    let prefs = LocationRepo::list_preferences(&pool, customer).await.unwrap();
    assert_eq!(prefs.len(), 1);
    assert_eq!(prefs[0].location_id, kapolei);

    let batch = LocationRepo::list_preferences_for_customers(&pool, &[customer])
        .await
        .unwrap();
    assert_eq!(batch.len(), 1);

    let location = LocationRepo::find_by_id(&pool, kapolei).await.unwrap().unwrap();
    assert_eq!(location.name, "Kapolei");

    let entry = QueueRepo::enqueue(&pool, customer).await.unwrap();
    let found = QueueRepo::find_by_customer(&pool, customer).await.unwrap().unwrap();
    assert_eq!(found.id, entry.id);
    assert_eq!(found.status, "queued");
}
