//! Repository for the `target_window_presets` table.

use slotline_core::preset::{Preset, PresetType};
use sqlx::PgPool;

use crate::models::preset::PresetRow;

const COLUMNS: &str =
    "id, preset_type, key, label, active, sort_order, rules_json, created_at, updated_at";

/// Read access to the administrator-curated preset catalog.
pub struct PresetRepo;

impl PresetRepo {
    /// All active presets of every type, ordered by type then `sort_order`.
    pub async fn list_active(pool: &PgPool) -> Result<Vec<PresetRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM target_window_presets \
             WHERE active = true \
             ORDER BY preset_type ASC, sort_order ASC, key ASC"
        );
        sqlx::query_as::<_, PresetRow>(&query).fetch_all(pool).await
    }

    /// Active presets of one type, ordered by `sort_order`.
    pub async fn list_active_by_type(
        pool: &PgPool,
        preset_type: PresetType,
    ) -> Result<Vec<Preset>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM target_window_presets \
             WHERE preset_type = $1 AND active = true \
             ORDER BY sort_order ASC, key ASC"
        );
        sqlx::query_as::<_, PresetRow>(&query)
            .bind(preset_type.as_str())
            .fetch_all(pool)
            .await?
            .into_iter()
            .map(Preset::try_from)
            .collect()
    }

    /// Find an active preset by `(type, key)`.
    pub async fn find_active(
        pool: &PgPool,
        preset_type: PresetType,
        key: &str,
    ) -> Result<Option<Preset>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM target_window_presets \
             WHERE preset_type = $1 AND key = $2 AND active = true"
        );
        sqlx::query_as::<_, PresetRow>(&query)
            .bind(preset_type.as_str())
            .bind(key)
            .fetch_optional(pool)
            .await?
            .map(Preset::try_from)
            .transpose()
    }
}
