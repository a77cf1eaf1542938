use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::runtime::Handle;

use crate::bus::EventChannel;
use crate::reflector::HandlerSide;

use super::{ExtensionHost, FrontendExtension, HostError};

type Registered = Arc<Mutex<HashSet<String>>>;
type Active = Arc<Mutex<Vec<(String, HandlerSide)>>>;

/// Host that loads extensions into the current process, sharing one channel
/// with the backend. Useful for tests, the demo binary, and embedding the
/// extension side next to the backend.
pub struct InProcessHost {
    channel: Arc<dyn EventChannel>,
    load_delay: Option<Duration>,
    never_load: bool,
    registered: Registered,
    active: Active,
}

impl InProcessHost {
    pub fn new(channel: Arc<dyn EventChannel>) -> Self {
        Self {
            channel,
            load_delay: None,
            never_load: false,
            registered: Arc::new(Mutex::new(HashSet::new())),
            active: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Load extensions on a background task after `delay`, the way a UI
    /// context that is still starting up would.
    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = Some(delay);
        self
    }

    /// Accept registrations but never load them.
    pub fn never_load(mut self) -> Self {
        self.never_load = true;
        self
    }

    pub fn registered_names(&self) -> Vec<String> {
        let guard = self.registered.lock().expect("host registry mutex poisoned");
        let mut names: Vec<String> = guard.iter().cloned().collect();
        names.sort();
        names
    }

    /// Number of extensions currently loaded and serving requests.
    pub fn active_count(&self) -> usize {
        self.active.lock().expect("host active mutex poisoned").len()
    }

    /// Unload every extension. Pending deferred handlers never answer.
    pub fn teardown_all(&self) {
        let sides: Vec<(String, HandlerSide)> = {
            let mut guard = self.active.lock().expect("host active mutex poisoned");
            guard.drain(..).collect()
        };
        self.registered
            .lock()
            .expect("host registry mutex poisoned")
            .clear();
        for (_, mut side) in sides {
            side.teardown();
        }
    }
}

fn activate(
    extension: FrontendExtension,
    channel: Arc<dyn EventChannel>,
    registered: &Mutex<HashSet<String>>,
    active: &Mutex<Vec<(String, HandlerSide)>>,
) {
    let name = extension.name().to_string();
    if !registered
        .lock()
        .expect("host registry mutex poisoned")
        .contains(&name)
    {
        tracing::debug!("extension {name} unregistered before it loaded");
        return;
    }
    match extension.activate(channel) {
        Ok(side) => {
            tracing::debug!("extension {name} loaded");
            active
                .lock()
                .expect("host active mutex poisoned")
                .push((name, side));
        }
        Err(e) => tracing::warn!("extension {name} failed to load: {e}"),
    }
}

impl ExtensionHost for InProcessHost {
    fn register_extension(&self, extension: FrontendExtension) -> Result<(), HostError> {
        {
            let mut guard = self.registered.lock().expect("host registry mutex poisoned");
            if !guard.insert(extension.name().to_string()) {
                return Err(HostError::Duplicate(extension.name().to_string()));
            }
        }

        if self.never_load {
            tracing::debug!("extension {} accepted but not loaded", extension.name());
            return Ok(());
        }

        match self.load_delay {
            None => activate(extension, self.channel.clone(), &self.registered, &self.active),
            Some(delay) => {
                let runtime = Handle::try_current()
                    .map_err(|e| HostError::Unavailable(format!("no tokio runtime: {e}")))?;
                let channel = self.channel.clone();
                let registered = self.registered.clone();
                let active = self.active.clone();
                runtime.spawn(async move {
                    tokio::time::sleep(delay).await;
                    activate(extension, channel, &registered, &active);
                });
            }
        }
        Ok(())
    }

    fn unregister_extension(&self, name: &str) {
        self.registered
            .lock()
            .expect("host registry mutex poisoned")
            .remove(name);
        let removed: Vec<(String, HandlerSide)> = {
            let mut guard = self.active.lock().expect("host active mutex poisoned");
            let (gone, kept): (Vec<_>, Vec<_>) =
                guard.drain(..).partition(|(loaded, _)| loaded == name);
            *guard = kept;
            gone
        };
        for (_, mut side) in removed {
            side.teardown();
            tracing::debug!("extension {name} unloaded");
        }
    }
}
