use std::sync::Arc;

use serde_json::json;

use crate::bus::EventChannel;
use crate::config::ReflectorConfig;
use crate::host::{ExtensionHost, FrontendExtension};
use crate::reflector::{unique_bridge_name, CallMode, HandlerRegistry, ReflectorError, Reflector};

use super::cache::SingleFlightCache;
use super::manifest::{normalize_extension_list, ExtensionManifest};
use super::LIST_LOADED_EXTENSIONS;

/// Builds the handler set the extension side serves. Called once per fetch,
/// since each fetch loads a fresh extension into the host.
pub type HandlerFactory = Arc<dyn Fn() -> HandlerRegistry + Send + Sync>;

/// Performs one bridged `list-loaded-extensions` round trip.
#[derive(Clone)]
pub struct LoadedExtensionsFetcher {
    channel: Arc<dyn EventChannel>,
    host: Arc<dyn ExtensionHost>,
    handlers: HandlerFactory,
    config: ReflectorConfig,
}

impl LoadedExtensionsFetcher {
    pub fn new(
        channel: Arc<dyn EventChannel>,
        host: Arc<dyn ExtensionHost>,
        handlers: HandlerFactory,
        config: ReflectorConfig,
    ) -> Self {
        Self {
            channel,
            host,
            handlers,
            config,
        }
    }

    /// Load a freshly named bridge extension into the host, wait for it, ask
    /// it for the loaded extensions, then unload it again.
    pub async fn fetch(&self) -> Result<Vec<ExtensionManifest>, ReflectorError> {
        let name = unique_bridge_name(&self.config.bridge_prefix);
        let bridge = Reflector::new(name.clone(), self.channel.clone())?;
        bridge.arm_readiness();

        self.host
            .register_extension(FrontendExtension::reflector(name.clone(), (self.handlers)()))?;
        let _loaded = LoadedGuard {
            host: self.host.clone(),
            name,
        };
        bridge.await_ready(self.config.ready_timeout()).await;

        let raw = bridge
            .call(
                LIST_LOADED_EXTENSIONS,
                json!({}),
                CallMode::Async,
                self.config.call_timeout(),
            )
            .await?;
        let extensions = normalize_extension_list(raw)?;
        tracing::info!("bridge {} listed {} loaded extensions", bridge.name(), extensions.len());
        Ok(extensions)
    }
}

/// Unloads a fetch's bridge extension once the fetch is over, however it
/// ended.
struct LoadedGuard {
    host: Arc<dyn ExtensionHost>,
    name: String,
}

impl Drop for LoadedGuard {
    fn drop(&mut self) {
        self.host.unregister_extension(&self.name);
    }
}

/// Process-lifetime cache of the loaded extensions list. The list is fetched
/// through the bridge at most once until [`LoadedExtensions::reset`];
/// concurrent first callers share the same fetch.
#[derive(Clone)]
pub struct LoadedExtensions {
    fetcher: LoadedExtensionsFetcher,
    cache: Arc<SingleFlightCache<Vec<ExtensionManifest>>>,
}

impl LoadedExtensions {
    pub fn new(fetcher: LoadedExtensionsFetcher) -> Self {
        Self::with_cache(fetcher, Arc::new(SingleFlightCache::new()))
    }

    /// Share an existing cache, e.g. one owned by the application state.
    pub fn with_cache(
        fetcher: LoadedExtensionsFetcher,
        cache: Arc<SingleFlightCache<Vec<ExtensionManifest>>>,
    ) -> Self {
        Self { fetcher, cache }
    }

    pub async fn fetch_once(&self) -> Result<Vec<ExtensionManifest>, ReflectorError> {
        let fetcher = self.fetcher.clone();
        self.cache
            .get_or_fetch(move || async move { fetcher.fetch().await })
            .await
    }

    pub fn cached(&self) -> Option<Vec<ExtensionManifest>> {
        self.cache.get()
    }

    /// Drop the cached list so the next `fetch_once` asks the extension again.
    pub fn reset(&self) {
        self.cache.reset();
    }

    pub fn cache(&self) -> &Arc<SingleFlightCache<Vec<ExtensionManifest>>> {
        &self.cache
    }
}
