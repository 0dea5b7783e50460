//! Target-window matching.
//!
//! A customer's target window is the conjunction of a date horizon, a
//! weekday rule and one or more time blocks, all evaluated in the
//! customer's local civil time. [`matches_target_window`] decides whether a
//! slot falls inside it. The check is pure: no I/O, and `now` is injectable.

use chrono::{Datelike, Days, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::preset::{DateHorizonRule, PresetCatalog, TimeBlockRule, WeekdayMode, WeekdayRule};
use crate::types::{DbId, Timestamp};

/// ISO weekday numbers for Saturday and Sunday.
const WEEKEND: [u32; 2] = [6, 7];

/// A customer's chosen presets, one row per customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerSelection {
    pub customer_id: DbId,
    /// IANA timezone name, e.g. `Pacific/Honolulu`.
    pub timezone: String,
    pub date_horizon_key: String,
    pub weekday_rule_key: String,
    /// ISO weekday numbers (1 = Monday). Only consulted for `custom` rules.
    pub custom_weekdays: Vec<u32>,
    /// Chosen time-block preset keys, in the customer's order.
    pub time_block_keys: Vec<String>,
}

/// Everything the matcher needs for one customer, resolved from the catalog.
#[derive(Debug, Clone)]
pub struct ResolvedWindow<'a> {
    pub selection: &'a CustomerSelection,
    pub date_horizon: &'a DateHorizonRule,
    pub weekday_rule: &'a WeekdayRule,
    pub time_blocks: Vec<&'a TimeBlockRule>,
    pub timezone: Tz,
}

impl PresetCatalog {
    /// Resolve a selection's preset keys and timezone.
    ///
    /// Returns `None` when the selection cannot match anything: an unknown
    /// or inactive date-horizon/weekday preset, no resolvable time block, or
    /// an unrecognized timezone. Unknown time-block keys are dropped.
    pub fn resolve<'a>(&'a self, selection: &'a CustomerSelection) -> Option<ResolvedWindow<'a>> {
        let date_horizon = self.date_horizon(&selection.date_horizon_key)?;
        let weekday_rule = self.weekday_rule(&selection.weekday_rule_key)?;
        let time_blocks: Vec<&TimeBlockRule> = selection
            .time_block_keys
            .iter()
            .filter_map(|key| self.time_block(key))
            .collect();
        if time_blocks.is_empty() {
            return None;
        }
        let timezone = selection.timezone.parse::<Tz>().ok()?;

        Some(ResolvedWindow {
            selection,
            date_horizon,
            weekday_rule,
            time_blocks,
            timezone,
        })
    }
}

/// Input to [`matches_target_window`].
#[derive(Debug, Clone)]
pub struct MatchInput<'a> {
    pub slot_utc: Timestamp,
    pub selection: &'a CustomerSelection,
    pub date_horizon: &'a DateHorizonRule,
    pub time_blocks: &'a [&'a TimeBlockRule],
    pub weekday_rule: &'a WeekdayRule,
    pub timezone: Tz,
    /// Reference instant for "today"; the system clock when `None`.
    pub now: Option<Timestamp>,
}

impl<'a> ResolvedWindow<'a> {
    /// Build matcher input for a slot against this window.
    pub fn input<'s>(&'s self, slot_utc: Timestamp, now: Option<Timestamp>) -> MatchInput<'s> {
        MatchInput {
            slot_utc,
            selection: self.selection,
            date_horizon: self.date_horizon,
            time_blocks: &self.time_blocks,
            weekday_rule: self.weekday_rule,
            timezone: self.timezone,
            now,
        }
    }

    pub fn matches(&self, slot_utc: Timestamp, now: Option<Timestamp>) -> bool {
        matches_target_window(&self.input(slot_utc, now))
    }
}

/// Decide whether a slot falls inside a customer's target window.
///
/// Checks run in order and short-circuit:
/// 1. weekends never match;
/// 2. the slot's local day must lie in `[today, today + days_ahead]`;
/// 3. the weekday rule (`any` = Mon-Fri, `custom` = the selection's set);
/// 4. the slot's local time must lie within at least one time block.
///
/// All bounds are inclusive.
pub fn matches_target_window(input: &MatchInput<'_>) -> bool {
    let local = input.slot_utc.with_timezone(&input.timezone);
    let weekday = local.weekday().number_from_monday();

    if WEEKEND.contains(&weekday) {
        return false;
    }

    let now = input.now.unwrap_or_else(Utc::now);
    let today = now.with_timezone(&input.timezone).date_naive();
    let slot_day = local.date_naive();
    let Some(last_day) = today.checked_add_days(Days::new(u64::from(input.date_horizon.days_ahead)))
    else {
        return false;
    };
    if slot_day < today || slot_day > last_day {
        return false;
    }

    let weekday_ok = match input.weekday_rule.mode {
        WeekdayMode::Any => (1..=5).contains(&weekday),
        WeekdayMode::Custom => input.selection.custom_weekdays.contains(&weekday),
    };
    if !weekday_ok {
        return false;
    }

    let slot_seconds = local.num_seconds_from_midnight();
    input.time_blocks.iter().any(|block| {
        match (parse_time_of_day(&block.start), parse_time_of_day(&block.end)) {
            (Some(start), Some(end)) => start <= slot_seconds && slot_seconds <= end,
            _ => false,
        }
    })
}

/// Parse `HH:MM` or `HH:MM:SS` into seconds since midnight.
pub fn parse_time_of_day(value: &str) -> Option<u32> {
    let mut parts = value.trim().split(':');
    let hours: u32 = parts.next()?.trim().parse().ok()?;
    let minutes: u32 = parts.next()?.trim().parse().ok()?;
    let seconds: u32 = match parts.next() {
        Some(raw) => raw.trim().parse().ok()?,
        None => 0,
    };
    if parts.next().is_some() || hours > 23 || minutes > 59 || seconds > 59 {
        return None;
    }
    Some(hours * 3600 + minutes * 60 + seconds)
}
