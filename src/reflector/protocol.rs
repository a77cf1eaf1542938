//! Wire types and event-name derivation for one bridge instance.
//!
//! | Purpose      | Event name                      | Payload                              |
//! |--------------|---------------------------------|--------------------------------------|
//! | Sync request | `<name>:reflect-sync`           | `{id, async, eventName, eventData}`  |
//! | Response     | `<name>:reflect-response:<id>`  | handler result                       |
//! | Error        | `<name>:reflect-error:<id>`     | `{message}`                          |
//! | Ready        | `<name>:reflector-ready`        | `{}`                                 |

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ReflectorError;

/// Whether the extension handler's result comes back as an event
/// (`Async`) or as the direct return value of the dispatch (`Sync`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallMode {
    #[default]
    Async,
    Sync,
}

impl CallMode {
    pub fn is_async(self) -> bool {
        matches!(self, Self::Async)
    }
}

impl std::str::FromStr for CallMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "async" | "asynchronous" => Ok(Self::Async),
            "sync" | "synchronous" => Ok(Self::Sync),
            _ => Err(format!("unsupported call mode: {value}")),
        }
    }
}

/// Request emitted on `<name>:reflect-sync`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRequest {
    pub id: String,
    #[serde(rename = "async")]
    pub is_async: bool,
    #[serde(rename = "eventName")]
    pub event_name: String,
    #[serde(rename = "eventData", default)]
    pub event_data: Value,
}

impl SyncRequest {
    pub fn mode(&self) -> CallMode {
        if self.is_async {
            CallMode::Async
        } else {
            CallMode::Sync
        }
    }
}

/// Payload of `<name>:reflect-error:<id>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteErrorPayload {
    pub message: String,
}

impl RemoteErrorPayload {
    /// Pull a message out of whatever the extension sent. Well-behaved
    /// senders use `{message}`; bare strings and other shapes are tolerated.
    pub fn message_from(payload: &Value) -> String {
        match payload {
            Value::Object(map) => match map.get("message") {
                Some(Value::String(message)) => message.clone(),
                Some(other) => other.to_string(),
                None => payload.to_string(),
            },
            Value::String(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Event names derived from a bridge name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelNames {
    bridge: String,
}

impl ChannelNames {
    pub fn new(bridge: impl Into<String>) -> Result<Self, ReflectorError> {
        let bridge = bridge.into();
        if bridge.trim().is_empty() {
            return Err(ReflectorError::InvalidBridgeName(bridge));
        }
        Ok(Self { bridge })
    }

    pub fn bridge(&self) -> &str {
        &self.bridge
    }

    pub fn sync_request(&self) -> String {
        format!("{}:reflect-sync", self.bridge)
    }

    pub fn response(&self, id: &str) -> String {
        format!("{}:reflect-response:{}", self.bridge, id)
    }

    pub fn error(&self, id: &str) -> String {
        format!("{}:reflect-error:{}", self.bridge, id)
    }

    pub fn ready(&self) -> String {
        format!("{}:reflector-ready", self.bridge)
    }
}

impl fmt::Display for ChannelNames {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.bridge)
    }
}
