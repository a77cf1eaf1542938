use std::time::Duration;

use thiserror::Error;

use crate::bus::BusError;

/// Failures surfaced by the reflector to the immediate caller.
///
/// Remote handler failures cross the channel as a bare message string and are
/// re-wrapped here so callers can branch on the kind rather than the text.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReflectorError {
    /// No response or error event arrived within the call's window.
    #[error("reflected call '{event_name}' timed out after {}ms", .timeout.as_millis())]
    Timeout {
        event_name: String,
        timeout: Duration,
    },

    /// The extension-side handler failed.
    #[error("remote handler '{event_name}' failed: {message}")]
    RemoteHandler { event_name: String, message: String },

    /// The extension side never announced readiness and nobody waited for it.
    #[error("bridge '{bridge}' is not ready")]
    NotReady { bridge: String },

    #[error("malformed payload for '{event_name}': {message}")]
    MalformedPayload { event_name: String, message: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid bridge name: {0:?}")]
    InvalidBridgeName(String),

    #[error("bus error: {0}")]
    Bus(#[from] BusError),

    #[error("extension host error: {0}")]
    Host(String),
}

impl ReflectorError {
    pub fn malformed(event_name: &str, err: impl std::fmt::Display) -> Self {
        Self::MalformedPayload {
            event_name: event_name.to_string(),
            message: err.to_string(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    pub fn is_not_ready(&self) -> bool {
        matches!(self, Self::NotReady { .. })
    }

    /// Message carried back from the extension, if this is a remote failure.
    pub fn remote_message(&self) -> Option<&str> {
        match self {
            Self::RemoteHandler { message, .. } => Some(message),
            _ => None,
        }
    }
}
