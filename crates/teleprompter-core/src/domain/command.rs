//! Remote-control command events.
//!
//! A command is whatever the remote client decided to send under the
//! `command` event name: `{"key": "ArrowDown"}`, `{"key": "speed", "value": 3}`
//! and so on.  The relay does not interpret commands; it only checks that the
//! `key` member is present and hands the object on unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Name of the member every command must carry.
pub const COMMAND_KEY_FIELD: &str = "key";

/// Why a `command` payload was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedCommand {
    /// The payload was a JSON array, string, number, boolean or null.
    #[error("command payload is not a JSON object")]
    NotAnObject,

    /// The payload was an object without a `key` member.
    #[error("command payload has no `key` member")]
    MissingKey,
}

/// A validated command received from a remote client.
///
/// Holds the original JSON object untouched; serializing a `CommandEvent`
/// reproduces exactly the object the client sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct CommandEvent {
    payload: Map<String, Value>,
}

impl CommandEvent {
    /// Validates an arbitrary JSON value as a command.
    ///
    /// The `key` member may hold any value, including `null`; only its
    /// presence is checked.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedCommand`] when `value` is not an object or lacks `key`.
    pub fn from_value(value: Value) -> Result<Self, MalformedCommand> {
        match value {
            Value::Object(payload) => Self::from_map(payload),
            _ => Err(MalformedCommand::NotAnObject),
        }
    }

    fn from_map(payload: Map<String, Value>) -> Result<Self, MalformedCommand> {
        if payload.contains_key(COMMAND_KEY_FIELD) {
            Ok(Self { payload })
        } else {
            Err(MalformedCommand::MissingKey)
        }
    }

    /// The value of the `key` member.
    pub fn key(&self) -> &Value {
        // Presence is guaranteed by construction.
        &self.payload[COMMAND_KEY_FIELD]
    }

    /// The full payload, including `key`.
    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    /// Consumes the event and returns the payload.
    pub fn into_payload(self) -> Map<String, Value> {
        self.payload
    }
}

impl TryFrom<Map<String, Value>> for CommandEvent {
    type Error = MalformedCommand;

    fn try_from(payload: Map<String, Value>) -> Result<Self, Self::Error> {
        Self::from_map(payload)
    }
}

impl From<CommandEvent> for Map<String, Value> {
    fn from(event: CommandEvent) -> Self {
        event.payload
    }
}
