//! Event stream parsing (C8 support): a thin typed wrapper over the raw
//! `{eventId, eventType, ...}` JSON objects the workflow service hands the
//! decider. Grounded in `pydecider/state_machine.py`'s `EVENT_*` attribute
//! access patterns, translated into explicit field lookups.

use crate::error::CoreError;
use serde_json::Value;

/// One event off the history stream, still in its raw JSON-attribute form.
/// Handlers in `state_machine.rs` pull the type-specific fields they need
/// out of `attrs` directly, matching §4.4's per-event-type attribute table.
#[derive(Debug, Clone)]
pub struct RawEvent {
    pub event_id: u64,
    pub event_type: String,
    attrs: Value,
}

impl RawEvent {
    pub fn from_value(value: &Value) -> Result<Self, CoreError> {
        let obj = value
            .as_object()
            .ok_or_else(|| CoreError::RuntimeAbort("event is not a JSON object".into()))?;

        let event_id = obj
            .get("eventId")
            .and_then(Value::as_u64)
            .ok_or_else(|| CoreError::RuntimeAbort("event missing integer 'eventId'".into()))?;
        let event_type = obj
            .get("eventType")
            .and_then(Value::as_str)
            .ok_or_else(|| CoreError::RuntimeAbort("event missing string 'eventType'".into()))?
            .to_string();

        Ok(Self {
            event_id,
            event_type,
            attrs: value.clone(),
        })
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attrs.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(Value::as_str)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.attrs.get(key).and_then(Value::as_u64)
    }
}
