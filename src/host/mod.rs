//! Registration surface of the host UI runtime.
//!
//! The extension side of a bridge has to run inside the host's UI context.
//! The core only sees that context through [`ExtensionHost`]: it hands over
//! a [`FrontendExtension`] whose factory, given the shared channel, installs
//! the handler side and announces readiness.

mod in_process;

use std::sync::Arc;

use crate::bus::EventChannel;
use crate::reflector::{HandlerRegistry, HandlerSide, ReflectorError};

pub use in_process::InProcessHost;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HostError {
    #[error("extension already registered: {0}")]
    Duplicate(String),
    #[error("extension host unavailable: {0}")]
    Unavailable(String),
}

impl From<HostError> for ReflectorError {
    fn from(value: HostError) -> Self {
        ReflectorError::Host(value.to_string())
    }
}

type ExtensionFactory =
    Box<dyn FnOnce(Arc<dyn EventChannel>) -> Result<HandlerSide, ReflectorError> + Send>;

/// An extension to be loaded into the host UI runtime.
pub struct FrontendExtension {
    name: String,
    factory: ExtensionFactory,
}

impl FrontendExtension {
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: FnOnce(Arc<dyn EventChannel>) -> Result<HandlerSide, ReflectorError> + Send + 'static,
    {
        Self {
            name: name.into(),
            factory: Box::new(factory),
        }
    }

    /// Extension that serves `registry` on the bridge named `bridge`.
    pub fn reflector(bridge: impl Into<String>, registry: HandlerRegistry) -> Self {
        let bridge = bridge.into();
        let name = bridge.clone();
        Self::new(name, move |channel| HandlerSide::install(&bridge, channel, registry))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the factory against the host's channel.
    pub fn activate(self, channel: Arc<dyn EventChannel>) -> Result<HandlerSide, ReflectorError> {
        (self.factory)(channel)
    }
}

impl std::fmt::Debug for FrontendExtension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrontendExtension")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Host UI runtime able to load extensions. Registration is fire-and-forget:
/// success means the host accepted the extension, not that it is running.
pub trait ExtensionHost: Send + Sync {
    fn register_extension(&self, extension: FrontendExtension) -> Result<(), HostError>;

    /// Unload the extension registered under `name`, or stop it from loading
    /// if it has not come up yet. Unknown names are ignored.
    fn unregister_extension(&self, _name: &str) {}
}
