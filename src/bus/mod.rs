//! Event channel used as the only link between backend and UI extension.
//!
//! The bus layer provides:
//! - `EventChannel`: the named-event publish/subscribe seam
//! - `EventBus`: in-process implementation with a broadcast tap for observers
//! - `TauriChannel` (feature `tauri-host`): adapter over a Tauri app handle
//!
//! # Architecture
//!
//! Events flow backend → EventChannel → listeners in the extension context,
//! and back the same way. Nothing on the channel is correlated or ordered;
//! the reflector builds request/response on top of it.

mod channel;
mod event_bus;
#[cfg(feature = "tauri-host")]
mod tauri_channel;

pub use channel::{BusError, EventChannel, ListenerFn, ListenerId};
pub use event_bus::{BusEvent, EventBus};
#[cfg(feature = "tauri-host")]
pub use tauri_channel::TauriChannel;
