//! Extension host whose loading is driven by the test.

use std::sync::{Arc, Mutex};

use reflector_lib::bus::EventChannel;
use reflector_lib::host::{ExtensionHost, FrontendExtension, HostError};
use reflector_lib::reflector::HandlerSide;

/// Queues registered extensions until [`StagedHost::load_pending`] is called,
/// so tests can observe the bridge before its extension side exists.
pub struct StagedHost {
    channel: Arc<dyn EventChannel>,
    pending: Mutex<Vec<FrontendExtension>>,
    loaded: Mutex<Vec<HandlerSide>>,
    reject_with: Option<String>,
}

impl StagedHost {
    pub fn new(channel: Arc<dyn EventChannel>) -> Self {
        Self {
            channel,
            pending: Mutex::new(Vec::new()),
            loaded: Mutex::new(Vec::new()),
            reject_with: None,
        }
    }

    /// Host that refuses every registration.
    pub fn unavailable(channel: Arc<dyn EventChannel>, message: &str) -> Self {
        Self {
            reject_with: Some(message.to_string()),
            ..Self::new(channel)
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    /// Load every queued extension. Returns how many came up.
    pub fn load_pending(&self) -> usize {
        let pending: Vec<FrontendExtension> = self.pending.lock().unwrap().drain(..).collect();
        let mut loaded = self.loaded.lock().unwrap();
        let before = loaded.len();
        for extension in pending {
            let side = extension
                .activate(self.channel.clone())
                .expect("extension activation");
            loaded.push(side);
        }
        loaded.len() - before
    }

    pub fn unload_all(&self) {
        self.loaded.lock().unwrap().clear();
    }
}

impl ExtensionHost for StagedHost {
    fn register_extension(&self, extension: FrontendExtension) -> Result<(), HostError> {
        if let Some(message) = &self.reject_with {
            return Err(HostError::Unavailable(message.clone()));
        }
        self.pending.lock().unwrap().push(extension);
        Ok(())
    }
}
