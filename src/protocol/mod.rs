// src/protocol/mod.rs

//! JSON wire format spoken over a client connection.
//!
//! Outbound:
//! - broadcast: `{"event": "<kind>", "path": "...", "contents"?: "..."}`
//! - settings acknowledgement: `{"event": "settings", "settings": {...}}`
//!   with every field resolved.
//!
//! Inbound:
//! - settings request: `{"event": "settings", "settings": {...partial...}}`
//!
//! Anything else a client sends is reported as [`ControlMessage::Unrecognized`]
//! so newer clients can talk to older servers.

pub mod settings;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::types::WatchEventKind;

pub use settings::{EffectiveSettings, Settings};

/// `event` value of settings requests and acknowledgements.
pub const SETTINGS_EVENT: &str = "settings";

/// One change notification, tailored for a single client.
#[derive(Debug, Clone, Serialize)]
pub struct BroadcastPayload<'a> {
    pub event: WatchEventKind,
    pub path: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contents: Option<&'a str>,
}

impl BroadcastPayload<'_> {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Serialize)]
struct SettingsAck<'a> {
    event: &'static str,
    settings: &'a EffectiveSettings,
}

/// Serialize the acknowledgement sent after a settings request.
pub fn settings_ack_json(settings: &EffectiveSettings) -> serde_json::Result<String> {
    serde_json::to_string(&SettingsAck {
        event: SETTINGS_EVENT,
        settings,
    })
}

/// A parsed inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    /// Partial settings update for the sending client.
    Settings(Settings),
    /// Well-formed JSON we don't understand. Carries the `event` name, if any.
    Unrecognized(Option<String>),
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed control message: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("invalid settings in control message: {0}")]
    InvalidSettings(#[source] serde_json::Error),
}

/// Parse one inbound text frame.
pub fn parse_control_message(text: &str) -> Result<ControlMessage, ProtocolError> {
    let value: Value = serde_json::from_str(text).map_err(ProtocolError::Malformed)?;

    let event = value.get("event").and_then(Value::as_str);
    if event != Some(SETTINGS_EVENT) {
        return Ok(ControlMessage::Unrecognized(event.map(str::to_string)));
    }

    let settings = match value.get("settings") {
        None | Some(Value::Null) => Settings::default(),
        Some(raw) => {
            serde_json::from_value(raw.clone()).map_err(ProtocolError::InvalidSettings)?
        }
    };

    Ok(ControlMessage::Settings(settings))
}
