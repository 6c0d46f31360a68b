//! Parsing of inbound WebSocket text frames into named events.
//!
//! Remote clients speak a tiny event protocol: each text frame carries one
//! event name plus an optional JSON payload.  Two encodings are accepted so
//! that both hand-written clients and socket.io-style clients work:
//!
//! ```text
//! {"event":"command","data":{"key":"ArrowUp"}}      object form
//! ["command",{"key":"ArrowUp"}]                      array form
//! 42["command",{"key":"ArrowUp"}]                    array form, engine packet prefix
//! ```
//!
//! The parser only extracts the name and payload.  Validating the payload of a
//! `command` event is [`ClientFrame::into_command`]'s job.

use serde_json::Value;
use thiserror::Error;

use crate::domain::command::{CommandEvent, MalformedCommand};

/// Event name under which remote clients send commands.
pub const COMMAND_EVENT: &str = "command";

/// socket.io engine prefix for an EVENT packet on the default namespace.
const ENGINE_EVENT_PREFIX: &str = "42";

/// Why a text frame could not be read as a named event.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The frame is not valid JSON.
    #[error("frame is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Valid JSON, but neither the object nor the array form.
    #[error("unsupported frame shape: {0}")]
    UnsupportedShape(&'static str),
}

/// A named event received from a remote client.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientFrame {
    /// Event name, e.g. `command`.
    pub event: String,
    /// Event payload; `Null` when the frame carried none.
    pub data: Value,
}

impl ClientFrame {
    pub fn is_command(&self) -> bool {
        self.event == COMMAND_EVENT
    }

    /// Validates the payload as a [`CommandEvent`].
    ///
    /// # Errors
    ///
    /// Returns [`MalformedCommand`] when the payload is not an object with a
    /// `key` member.  The event name is not checked here.
    pub fn into_command(self) -> Result<CommandEvent, MalformedCommand> {
        CommandEvent::from_value(self.data)
    }
}

/// Parses one inbound text frame.
///
/// # Errors
///
/// - [`FrameError::InvalidJson`] if the text is not JSON.
/// - [`FrameError::UnsupportedShape`] if the JSON is not one of the accepted forms.
///
/// # Example
///
/// ```rust
/// use teleprompter_core::parse_client_frame;
///
/// let frame = parse_client_frame(r#"["command",{"key":"Space"}]"#).unwrap();
/// assert!(frame.is_command());
/// assert_eq!(frame.data["key"], "Space");
/// ```
pub fn parse_client_frame(text: &str) -> Result<ClientFrame, FrameError> {
    let text = text.trim();
    let text = match text.strip_prefix(ENGINE_EVENT_PREFIX) {
        Some(rest) if rest.starts_with('[') => rest,
        _ => text,
    };

    match serde_json::from_str::<Value>(text)? {
        Value::Object(mut obj) => {
            let event = match obj.remove("event") {
                Some(Value::String(name)) => name,
                Some(_) => return Err(FrameError::UnsupportedShape("`event` is not a string")),
                None => return Err(FrameError::UnsupportedShape("object without `event`")),
            };
            let data = obj.remove("data").unwrap_or(Value::Null);
            Ok(ClientFrame { event, data })
        }
        Value::Array(items) => {
            let mut items = items.into_iter();
            let event = match items.next() {
                Some(Value::String(name)) => name,
                Some(_) => return Err(FrameError::UnsupportedShape("event name is not a string")),
                None => return Err(FrameError::UnsupportedShape("empty array")),
            };
            let data = items.next().unwrap_or(Value::Null);
            Ok(ClientFrame { event, data })
        }
        _ => Err(FrameError::UnsupportedShape("expected an object or an array")),
    }
}
