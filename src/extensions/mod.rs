//! Loaded-extensions list, fetched once through the reflector and memoized.

mod cache;
mod loaded;
mod manifest;

pub use cache::SingleFlightCache;
pub use loaded::{HandlerFactory, LoadedExtensions, LoadedExtensionsFetcher};
pub use manifest::{normalize_extension_list, ExtensionManifest};

/// Logical event served by the extension side to list loaded extensions.
pub const LIST_LOADED_EXTENSIONS: &str = "list-loaded-extensions";
