use crate::models::OrgId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tables whose changes invalidate a loaded snapshot.
pub const WATCHED_TABLES: [&str; 2] = ["lead_scores", "leads"];

/// Change notification payload - can be single object or array
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RealtimePayload {
    Single(ChangeEvent),
    Batch(Vec<ChangeEvent>),
}

impl RealtimePayload {
    /// Convert to a vec of events for uniform processing
    pub fn into_events(self) -> Vec<ChangeEvent> {
        match self {
            RealtimePayload::Single(event) => vec![event],
            RealtimePayload::Batch(events) => events,
        }
    }
}

/// One row change in the store.
///
/// Only a trigger: the payload rows are never applied, the affected
/// organization is simply reloaded.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChangeEvent {
    /// Table the change happened in
    pub table: String,

    /// Owning organization, when sent at the top level
    #[serde(default)]
    pub org_id: Option<String>,

    /// INSERT / UPDATE / DELETE
    #[serde(default, rename = "type", alias = "event_type")]
    pub event_type: Option<String>,

    /// New row image
    #[serde(default)]
    pub record: Option<Value>,

    /// Previous row image (deletes)
    #[serde(default)]
    pub old_record: Option<Value>,
}

impl ChangeEvent {
    pub fn is_watched(&self) -> bool {
        WATCHED_TABLES.contains(&self.table.as_str())
    }

    /// Organization affected by the change, looked up at the top level and
    /// then in the new and old row images.
    pub fn org_id(&self) -> Option<OrgId> {
        let from_row = |row: &Option<Value>| {
            row.as_ref()
                .and_then(|r| r.get("org_id"))
                .and_then(Value::as_str)
                .and_then(OrgId::parse)
        };

        self.org_id
            .as_deref()
            .and_then(OrgId::parse)
            .or_else(|| from_row(&self.record))
            .or_else(|| from_row(&self.old_record))
    }
}

/// Response sent back to the notifier
#[derive(Debug, Serialize, Deserialize)]
pub struct RealtimeResponse {
    pub status: String,
    pub received: usize,
    pub ignored: usize,
    pub refreshed_orgs: usize,
}
