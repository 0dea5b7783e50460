//! Administrator-curated target-window presets.
//!
//! Rows in `target_window_presets` share one shape (`preset_type`, `key`,
//! `rules_json`) but the rule payload differs per type. [`PresetRule`]
//! decodes that payload into a typed variant once, at load time, so the
//! matcher never inspects raw JSON.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/* --------------------------------------------------------------------------
   Preset type
   -------------------------------------------------------------------------- */

/// Axis of the target window a preset parameterizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresetType {
    DateHorizon,
    TimeBlock,
    WeekdayRule,
}

impl PresetType {
    pub fn as_str(self) -> &'static str {
        match self {
            PresetType::DateHorizon => "date_horizon",
            PresetType::TimeBlock => "time_block",
            PresetType::WeekdayRule => "weekday_rule",
        }
    }
}

impl fmt::Display for PresetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PresetType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "date_horizon" => Ok(PresetType::DateHorizon),
            "time_block" => Ok(PresetType::TimeBlock),
            "weekday_rule" => Ok(PresetType::WeekdayRule),
            other => Err(CoreError::Validation(format!(
                "Unknown preset type '{other}'"
            ))),
        }
    }
}

/* --------------------------------------------------------------------------
   Rule payloads
   -------------------------------------------------------------------------- */

/// How far ahead (in local calendar days) a customer will accept a slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateHorizonRule {
    pub days_ahead: u32,
}

/// An inclusive local time-of-day range, e.g. `08:00`..`09:45`.
///
/// Bounds are kept as written and parsed by the matcher, which skips a
/// block whose bounds do not parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBlockRule {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekdayMode {
    /// Any business weekday (Mon-Fri).
    Any,
    /// Only the weekdays listed on the customer's selection.
    Custom,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekdayRule {
    pub mode: WeekdayMode,
}

/// Typed rule payload, one variant per [`PresetType`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PresetRule {
    DateHorizon(DateHorizonRule),
    TimeBlock(TimeBlockRule),
    WeekdayRule(WeekdayRule),
}

impl PresetRule {
    /// Decode a raw `rules_json` payload for the given preset type.
    pub fn decode(preset_type: PresetType, rules_json: serde_json::Value) -> Result<Self, CoreError> {
        let invalid =
            |e: serde_json::Error| CoreError::Validation(format!("Invalid {preset_type} rule: {e}"));
        match preset_type {
            PresetType::DateHorizon => serde_json::from_value(rules_json)
                .map(PresetRule::DateHorizon)
                .map_err(invalid),
            PresetType::TimeBlock => serde_json::from_value(rules_json)
                .map(PresetRule::TimeBlock)
                .map_err(invalid),
            PresetType::WeekdayRule => serde_json::from_value(rules_json)
                .map(PresetRule::WeekdayRule)
                .map_err(invalid),
        }
    }

    pub fn preset_type(&self) -> PresetType {
        match self {
            PresetRule::DateHorizon(_) => PresetType::DateHorizon,
            PresetRule::TimeBlock(_) => PresetType::TimeBlock,
            PresetRule::WeekdayRule(_) => PresetType::WeekdayRule,
        }
    }
}

/* --------------------------------------------------------------------------
   Preset
   -------------------------------------------------------------------------- */

/// A preset row with its decoded rule. Keyed by `(type, key)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preset {
    pub key: String,
    pub label: String,
    pub active: bool,
    pub sort_order: i32,
    pub rule: PresetRule,
}

impl Preset {
    pub fn preset_type(&self) -> PresetType {
        self.rule.preset_type()
    }
}

/* --------------------------------------------------------------------------
   Catalog
   -------------------------------------------------------------------------- */

/// Snapshot of the active presets, indexed per type by key.
///
/// Built once per dispatch cycle and passed explicitly to the matcher.
#[derive(Debug, Clone, Default)]
pub struct PresetCatalog {
    date_horizons: HashMap<String, DateHorizonRule>,
    time_blocks: HashMap<String, TimeBlockRule>,
    weekday_rules: HashMap<String, WeekdayRule>,
}

impl PresetCatalog {
    /// Index the given presets. Inactive presets are ignored.
    pub fn new(presets: impl IntoIterator<Item = Preset>) -> Self {
        let mut catalog = Self::default();
        for preset in presets.into_iter().filter(|p| p.active) {
            match preset.rule {
                PresetRule::DateHorizon(rule) => {
                    catalog.date_horizons.insert(preset.key, rule);
                }
                PresetRule::TimeBlock(rule) => {
                    catalog.time_blocks.insert(preset.key, rule);
                }
                PresetRule::WeekdayRule(rule) => {
                    catalog.weekday_rules.insert(preset.key, rule);
                }
            }
        }
        catalog
    }

    pub fn date_horizon(&self, key: &str) -> Option<&DateHorizonRule> {
        self.date_horizons.get(key)
    }

    pub fn time_block(&self, key: &str) -> Option<&TimeBlockRule> {
        self.time_blocks.get(key)
    }

    pub fn weekday_rule(&self, key: &str) -> Option<&WeekdayRule> {
        self.weekday_rules.get(key)
    }

    pub fn len(&self) -> usize {
        self.date_horizons.len() + self.time_blocks.len() + self.weekday_rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
