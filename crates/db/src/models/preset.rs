//! Target-window preset rows.

use serde::Serialize;
use slotline_core::preset::{Preset, PresetRule, PresetType};
use slotline_core::types::{DbId, Timestamp};
use sqlx::FromRow;

use super::decode_error;

/// A row from the `target_window_presets` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PresetRow {
    pub id: DbId,
    pub preset_type: String,
    pub key: String,
    pub label: String,
    pub active: bool,
    pub sort_order: i32,
    pub rules_json: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<PresetRow> for Preset {
    type Error = sqlx::Error;

    fn try_from(row: PresetRow) -> Result<Self, Self::Error> {
        let preset_type: PresetType = row.preset_type.parse().map_err(decode_error)?;
        let rule = PresetRule::decode(preset_type, row.rules_json).map_err(decode_error)?;
        Ok(Preset {
            key: row.key,
            label: row.label,
            active: row.active,
            sort_order: row.sort_order,
            rule,
        })
    }
}
