//! Customer target-window selections and location preferences.

use serde::{Deserialize, Serialize};
use slotline_core::target_window::CustomerSelection;
use slotline_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `user_target_window_selections` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SelectionRow {
    pub customer_id: DbId,
    pub timezone: String,
    pub date_horizon_key: String,
    pub weekday_rule_key: String,
    pub custom_weekdays: Vec<i32>,
    pub time_block_keys: Vec<String>,
    pub updated_at: Timestamp,
}

impl From<SelectionRow> for CustomerSelection {
    fn from(row: SelectionRow) -> Self {
        CustomerSelection {
            customer_id: row.customer_id,
            timezone: row.timezone,
            date_horizon_key: row.date_horizon_key,
            weekday_rule_key: row.weekday_rule_key,
            // Out-of-range weekday numbers can never match; drop them here.
            custom_weekdays: row
                .custom_weekdays
                .into_iter()
                .filter_map(|d| u32::try_from(d).ok())
                .filter(|d| (1..=7).contains(d))
                .collect(),
            time_block_keys: row.time_block_keys,
        }
    }
}

/// DTO for creating or replacing a customer's selection.
#[derive(Debug, Clone, Deserialize)]
pub struct UpsertSelection {
    pub customer_id: DbId,
    pub timezone: String,
    pub date_horizon_key: String,
    pub weekday_rule_key: String,
    pub custom_weekdays: Vec<i32>,
    pub time_block_keys: Vec<String>,
}

/// A row from the `user_location_preferences` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LocationPreference {
    pub customer_id: DbId,
    pub location_id: DbId,
    pub created_at: Timestamp,
}
