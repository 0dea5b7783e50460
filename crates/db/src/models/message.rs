//! Message log rows. Append-only, unique on `dedupe_key`.

use serde::Serialize;
use slotline_core::messages::MessageTemplate;
use slotline_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `message_log` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MessageLogEntry {
    pub id: DbId,
    pub customer_id: DbId,
    pub message_type: String,
    pub sent_at: Timestamp,
    pub dedupe_key: String,
    pub meta_json: Option<serde_json::Value>,
}

/// DTO for logging a message under a dedupe key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewMessage {
    pub customer_id: DbId,
    pub dedupe_key: String,
    pub template: MessageTemplate,
}

impl NewMessage {
    pub fn new(customer_id: DbId, dedupe_key: String, template: MessageTemplate) -> Self {
        Self {
            customer_id,
            dedupe_key,
            template,
        }
    }

    /// `meta_json` payload: the rendered template.
    pub fn meta_json(&self) -> serde_json::Value {
        serde_json::json!({ "template": self.template })
    }
}
