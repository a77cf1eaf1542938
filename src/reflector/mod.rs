//! Request/response bridge ("reflector") over a one-way event channel.
//!
//! The backend side ([`Reflector`]) emits a sync request carrying a fresh
//! correlation id and races three outcomes: a response event scoped to that
//! id, an error event scoped to that id, or its own timeout. The extension
//! side ([`HandlerSide`]) answers requests from a [`HandlerRegistry`] and
//! announces itself with a ready event once installed.
//!
//! # Example
//! ```rust,ignore
//! let bus: Arc<dyn EventChannel> = EventBus::shared();
//! let bridge = Reflector::new("demo", bus.clone())?;
//! bridge.arm_readiness();
//!
//! let mut registry = HandlerRegistry::new();
//! registry.register("ping", |_: Value| Ok(json!({"ok": true})))?;
//! let _side = HandlerSide::install("demo", bus.clone(), registry)?;
//!
//! bridge.await_ready(Duration::from_secs(1)).await;
//! let pong = bridge.call("ping", json!({}), CallMode::Async, Duration::from_secs(1)).await?;
//! ```

mod backend;
mod correlation;
mod error;
mod handler_side;
mod protocol;
mod readiness;
mod registry;

pub use backend::{Reflector, DEFAULT_CALL_TIMEOUT};
pub use correlation::{unique_bridge_name, CorrelationIdGenerator};
pub use error::ReflectorError;
pub use handler_side::HandlerSide;
pub use protocol::{CallMode, ChannelNames, RemoteErrorPayload, SyncRequest};
pub use readiness::{ReadinessGate, ReadyOutcome};
pub use registry::{HandlerRegistry, HandlerResult, ReflectedHandler, RegistryError};
