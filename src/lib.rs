//! Request/response bridge over a one-way event bus.
//!
//! The host application's event bus only carries fire-and-forget messages.
//! This crate layers correlated calls on top of it so a backend can invoke
//! handlers living in the host's UI extension context and await their
//! results, and uses that bridge to fetch the list of loaded extensions once
//! per process.
//!
//! # Architecture
//!
//! - `bus`: event channel abstraction and the in-process [`bus::EventBus`]
//! - `reflector`: the bridge itself (backend caller, extension-side
//!   dispatcher, wire protocol, readiness)
//! - `host`: how extensions get loaded into the UI runtime
//! - `extensions`: single-flight cache for the loaded extensions list
//! - `config`: timeouts, naming and default call mode

pub mod bus;
pub mod config;
pub mod extensions;
pub mod host;
pub mod reflector;

#[cfg(test)]
mod testing;

pub use bus::{EventBus, EventChannel};
pub use config::{ConfigError, ReflectorConfig};
pub use extensions::{ExtensionManifest, LoadedExtensions, LoadedExtensionsFetcher};
pub use host::{ExtensionHost, FrontendExtension, InProcessHost};
pub use reflector::{CallMode, HandlerRegistry, HandlerSide, Reflector, ReflectorError};

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

const DEFAULT_LOG_FILTER: &str = "reflector=debug,info";

/// Install the global `tracing` subscriber, honouring `RUST_LOG`.
///
/// Safe to call more than once; only the first call installs anything.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
