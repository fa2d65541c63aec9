//! # Metadata Loader
//!
//! Fetches an entity's authoritative metadata, and its playlist when the
//! item needs one, before anything pages through it.
//!
//! ## Contract
//!
//! - Zero network calls when metadata is already held or the entity is
//!   known dark.
//! - Pseudo identifiers (`home`, `settings`...) are answered from the
//!   configuration, unless a mirror is configured to serve them.
//! - Fail-fast: transport, integrity and playlist failures propagate. An
//!   entity without valid metadata cannot be paged meaningfully.
//! - A dark response marks the entity dark for good; later calls fail the
//!   same way without asking again.

use std::sync::Arc;

use bridge_traits::{FetchOptions, MetadataResponse, MetadataSource};
use core_library::{item::prepare_item, playlist::process_playlist, Entity};
use core_runtime::config::ArchiveConfig;
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, SyncError};

/// Options for [`MetadataLoader::fetch_metadata`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Accept a dark response instead of failing
    pub allow_dark: bool,
    /// Bypass caches on the way
    pub no_cache: bool,
}

impl LoadOptions {
    pub fn allow_dark(mut self, allow_dark: bool) -> Self {
        self.allow_dark = allow_dark;
        self
    }

    pub fn no_cache(mut self, no_cache: bool) -> Self {
        self.no_cache = no_cache;
        self
    }
}

pub struct MetadataLoader {
    source: Arc<dyn MetadataSource>,
    config: Arc<ArchiveConfig>,
}

impl MetadataLoader {
    pub fn new(source: Arc<dyn MetadataSource>, config: Arc<ArchiveConfig>) -> Self {
        Self { source, config }
    }

    /// Load metadata into `entity` if it is not already loaded.
    ///
    /// # Errors
    ///
    /// - [`SyncError::Dark`] if the item is dark and `allow_dark` is false
    /// - [`SyncError::Integrity`] if the response is for another identifier
    ///   or cannot be decoded
    /// - [`SyncError::Transport`] if the metadata or playlist fetch fails
    #[instrument(skip(self, entity), fields(identifier = ?entity.identifier()))]
    pub async fn fetch_metadata(&self, entity: &mut Entity, options: LoadOptions) -> Result<()> {
        let Some(identifier) = entity.identifier().map(str::to_string) else {
            // Ad-hoc searches have nothing to load
            return Ok(());
        };

        if entity.is_dark() {
            debug!("Entity already known dark");
            return if options.allow_dark {
                Ok(())
            } else {
                Err(SyncError::Dark { identifier })
            };
        }

        if entity.metadata().is_some() {
            debug!("Metadata already loaded");
            return Ok(());
        }

        if self.config.routes.mirror.is_none() {
            if let Some(special) = self.config.special(&identifier) {
                debug!("Answering pseudo identifier from configuration");
                let response = MetadataResponse {
                    metadata: Some(special.clone()),
                    ..MetadataResponse::default()
                };
                entity.apply_loaded(prepare_item(&identifier, response, &self.config));
                return Ok(());
            }
        }

        let fetch = FetchOptions::default()
            .no_cache(options.no_cache)
            .with_timeout(self.config.metadata_timeout);
        let mut response = self
            .source
            .fetch_metadata(&identifier, fetch)
            .await
            .map_err(|e| SyncError::from_bridge(format!("metadata for {}", identifier), e))?;

        if response.is_dark && !options.allow_dark {
            warn!("Item is dark");
            entity.mark_dark();
            return Err(SyncError::Dark { identifier });
        }

        if !response.is_dark && response.identifier() != Some(identifier.as_str()) {
            return Err(SyncError::integrity(
                &identifier,
                format!(
                    "metadata response is for {:?}",
                    response.identifier().unwrap_or_default()
                ),
            ));
        }

        let carried_playlist = response.playlist.take();
        let mut loaded = prepare_item(&identifier, response, &self.config);

        if let Some(raw) = carried_playlist {
            loaded.playlist = Some(process_playlist(raw)?);
        } else if loaded.needs_playlist(&self.config) {
            debug!(mediatype = ?loaded.mediatype(), "Fetching playlist");
            let raw = self
                .source
                .fetch_playlist(&identifier, FetchOptions::default().no_cache(options.no_cache))
                .await
                .map_err(|e| SyncError::from_bridge(format!("playlist for {}", identifier), e))?;
            loaded.playlist = Some(process_playlist(raw)?);
        }

        let dark = loaded.is_dark;
        entity.apply_loaded(loaded);
        info!(
            kind = ?entity.kind(),
            files = entity.files().len(),
            tracks = entity.playlist().map(|p| p.len()).unwrap_or(0),
            dark,
            "Metadata loaded"
        );
        Ok(())
    }
}
