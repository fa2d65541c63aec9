//! Archive collection client.
//!
//! Re-exports the workspace crates and wires the default stack: the HTTP
//! connector behind caching decorators, driven by the collection sync engine.
//! Hosts that need a different transport build the pieces themselves.

use std::sync::Arc;

pub use bridge_traits;
pub use core_library;
pub use core_runtime;
pub use core_sync;
pub use provider_archive;

use bridge_traits::http::HttpClient;
use bridge_traits::time::{Clock, SystemClock};
use core_runtime::config::ArchiveConfig;
use core_sync::{CachingMetadataSource, CachingQuerySource, CollectionSyncEngine};
use provider_archive::ArchiveConnector;

/// Engine over `http` with cached metadata and search lookups.
pub fn build_engine(
    config: Arc<ArchiveConfig>,
    http: Arc<dyn HttpClient>,
    clock: Arc<dyn Clock>,
) -> CollectionSyncEngine {
    let metadata = CachingMetadataSource::new(
        ArchiveConnector::from_config(http.clone(), &config),
        config.cache,
        clock.clone(),
    );
    let search = CachingQuerySource::new(
        ArchiveConnector::from_config(http, &config),
        config.cache,
        clock,
    );
    CollectionSyncEngine::new(Arc::new(metadata), Arc::new(search), config)
}

/// Engine over the platform HTTP client and the system clock.
///
/// # Errors
///
/// Fails when no HTTP client is available for this build (see
/// [`core_runtime::config::default_http_client`]).
pub fn default_engine(config: Arc<ArchiveConfig>) -> core_runtime::Result<CollectionSyncEngine> {
    let http = core_runtime::config::default_http_client()?;
    Ok(build_engine(config, http, Arc::new(SystemClock)))
}
