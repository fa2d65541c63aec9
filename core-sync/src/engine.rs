//! # Collection Sync Engine
//!
//! Pages through the members of an entity against a search index that can
//! change between requests.
//!
//! ## Workflow
//!
//! `fetch_page` for the entity's current page:
//! 1. Make sure metadata is loaded (hard failure if not)
//! 2. Expand favorite stubs, best effort
//! 3. Serve from held records if they already cover the page
//! 4. Derive the query and sort; no query means nothing more to fetch
//! 5. Pick a request shape from how many search results are held
//!    ([`FetchPlan`]) and issue it
//! 6. If the answer repeats identifiers already held, the index has
//!    drifted: refetch the whole window once and replace what is held
//! 7. Otherwise append the new records
//!
//! Search failures degrade to the records already held. Only metadata
//! problems and undecodable answers reach the caller.
//!
//! ## Limitations
//!
//! Drift is only noticed through repeated identifiers. A re-index that
//! shifts results without producing a duplicate goes unnoticed.
//!
//! When less than half of the expected results are held, the whole window
//! is requested again and the held results are dropped only once that
//! request succeeds. A failed rebuild keeps serving the stale results
//! instead of leaving the entity empty.
//!
//! ## Concurrency
//!
//! The engine is shared freely; each entity is borrowed mutably for the
//! duration of a call, so two fetches on one entity cannot interleave.

use std::sync::Arc;

use bridge_traits::{FetchOptions, MetadataSource, QuerySource, SearchParams, SearchResponse};
use core_library::{
    Entity, FetchPlan, FieldRules, MemberPage, MemberRecord, PageInfo, QueryBuilder, SortPolicy,
};
use core_runtime::config::ArchiveConfig;
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, SyncError};
use crate::expander::BatchExpander;
use crate::loader::{LoadOptions, MetadataLoader};

/// Options for [`CollectionSyncEngine::fetch_page`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageOptions {
    /// Return the page with its `numFound`/`start` bookkeeping
    pub want_full_response: bool,
    pub no_cache: bool,
}

impl PageOptions {
    pub fn full_response(mut self, want: bool) -> Self {
        self.want_full_response = want;
        self
    }

    pub fn no_cache(mut self, no_cache: bool) -> Self {
        self.no_cache = no_cache;
        self
    }

    fn fetch(&self) -> FetchOptions {
        FetchOptions::default().no_cache(self.no_cache)
    }
}

pub struct CollectionSyncEngine {
    loader: MetadataLoader,
    expander: BatchExpander,
    metadata: Arc<dyn MetadataSource>,
    search: Arc<dyn QuerySource>,
    config: Arc<ArchiveConfig>,
    rules: FieldRules,
}

impl CollectionSyncEngine {
    pub fn new(
        metadata: Arc<dyn MetadataSource>,
        search: Arc<dyn QuerySource>,
        config: Arc<ArchiveConfig>,
    ) -> Self {
        Self {
            loader: MetadataLoader::new(metadata.clone(), config.clone()),
            expander: BatchExpander::new(search.clone(), config.clone()),
            rules: FieldRules::member(&config.required_member_fields),
            metadata,
            search,
            config,
        }
    }

    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    pub fn loader(&self) -> &MetadataLoader {
        &self.loader
    }

    pub fn expander(&self) -> &BatchExpander {
        &self.expander
    }

    /// A new entity for `identifier` with the configured page size.
    pub fn entity(&self, identifier: impl Into<String>) -> Entity {
        Entity::new(identifier).with_rows(self.config.default_rows as u32)
    }

    /// A new ad-hoc search with the configured page size.
    pub fn search_entity(&self, query: impl Into<String>) -> Entity {
        Entity::for_query(query).with_rows(self.config.default_rows as u32)
    }

    pub async fn fetch_metadata(&self, entity: &mut Entity, options: LoadOptions) -> Result<()> {
        self.loader.fetch_metadata(entity, options).await
    }

    /// Fetch the entity's current page.
    ///
    /// A short or stale page is a normal outcome: search failures are
    /// logged and the held records are served instead.
    ///
    /// # Errors
    ///
    /// - Any [`MetadataLoader::fetch_metadata`] failure
    /// - [`SyncError::Integrity`] if the search answer cannot be decoded or
    ///   contains a record without identifier
    #[instrument(
        skip(self, entity),
        fields(identifier = ?entity.identifier(), page = entity.page(), rows = entity.rows())
    )]
    pub async fn fetch_page(&self, entity: &mut Entity, options: PageOptions) -> Result<MemberPage> {
        self.loader
            .fetch_metadata(entity, LoadOptions::default().no_cache(options.no_cache))
            .await?;

        self.expander
            .expand_favorites(entity, options.fetch())
            .await;

        let request = entity.page_request();
        if entity.held_total() >= request.end() {
            debug!(held = entity.held_total(), "Page already held");
            return Ok(entity.current_page(options.want_full_response));
        }

        let Some(query) = QueryBuilder.build(entity) else {
            debug!("No query derivable, serving held records");
            return Ok(entity.current_page(options.want_full_response));
        };
        let sort = SortPolicy::new(&self.config.sort).resolve(entity);

        let plan = request.plan(entity.search_members().len());
        let params = self.search_params(entity, &query, &sort, plan);
        debug!(?plan, q = %query, sort = ?sort, "Searching");

        let response = match self.search.search(&params, options.fetch()).await {
            Ok(response) => response,
            Err(e) if e.is_decode() => {
                return Err(SyncError::from_bridge(self.label(entity), e));
            }
            Err(e) => {
                warn!(error = %e, "Search failed, serving held records");
                return Ok(entity.current_page(options.want_full_response));
            }
        };
        let (records, info) = self.records_from(entity, response)?;

        if plan.replaces_held() {
            info!(received = records.len(), "Rebuilt search results");
            entity.replace_search_results(records, info);
        } else if entity.overlaps_search_results(records.iter().map(MemberRecord::identifier)) {
            warn!("Search results repeat held identifiers, index drifted");
            self.resync(entity, &query, &sort, options).await;
        } else {
            let added = entity.append_search_results(records, info);
            info!(added, num_found = info.num_found, "Appended search results");
        }

        Ok(entity.current_page(options.want_full_response))
    }

    /// Advance to the next page and fetch it. The page is restored if the
    /// fetch fails.
    pub async fn more(&self, entity: &mut Entity, options: PageOptions) -> Result<MemberPage> {
        let previous = entity.page();
        entity.advance_page();
        match self.fetch_page(entity, options).await {
            Ok(page) => Ok(page),
            Err(e) => {
                entity.restore_page(previous);
                Err(e)
            }
        }
    }

    /// Members of items related to `identifier`.
    #[instrument(skip(self))]
    pub async fn related_members(
        &self,
        identifier: &str,
        no_cache: bool,
    ) -> Result<Vec<MemberRecord>> {
        let response = self
            .metadata
            .fetch_related(identifier, FetchOptions::default().no_cache(no_cache))
            .await
            .map_err(|e| SyncError::from_bridge(format!("related items for {}", identifier), e))?;

        let related = response
            .hits
            .hits
            .iter()
            .map(|hit| MemberRecord::from_related(hit, &self.rules))
            .collect::<core_library::Result<Vec<_>>>()?;
        debug!(count = related.len(), "Related items fetched");
        Ok(related)
    }

    /// Refetch the whole window once and replace the held search results.
    /// Failures leave the held results untouched.
    async fn resync(&self, entity: &mut Entity, query: &str, sort: &[String], options: PageOptions) {
        let plan = entity.page_request().rebuild();
        let params = self.search_params(entity, query, sort, plan);

        let response = match self.search.search(&params, options.fetch()).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Corrective search failed, keeping held records");
                return;
            }
        };
        match self.records_from(entity, response) {
            Ok((records, info)) => {
                info!(received = records.len(), "Replaced drifted search results");
                entity.replace_search_results(records, info);
            }
            Err(e) => warn!(error = %e, "Corrective search unusable, keeping held records"),
        }
    }

    fn search_params(
        &self,
        entity: &Entity,
        query: &str,
        sort: &[String],
        plan: FetchPlan,
    ) -> SearchParams {
        let (page, rows) = plan.params();
        let mut params = SearchParams::new(query, rows as usize, page as usize)
            .with_and(entity.filters().to_vec())
            .with_fields(self.config.default_fields.clone());
        for s in sort {
            params = params.with_sort(s.clone());
        }
        params
    }

    fn records_from(
        &self,
        entity: &Entity,
        response: SearchResponse,
    ) -> Result<(Vec<MemberRecord>, PageInfo)> {
        let result = response.response;
        let records = result
            .docs
            .iter()
            .map(|doc| MemberRecord::from_doc(doc, &self.rules))
            .collect::<core_library::Result<Vec<_>>>()
            .map_err(|e| SyncError::integrity(self.label(entity), e.to_string()))?;
        Ok((
            records,
            PageInfo {
                num_found: result.num_found,
                start: result.start,
            },
        ))
    }

    fn label(&self, entity: &Entity) -> String {
        entity
            .identifier()
            .or(entity.query())
            .unwrap_or("search")
            .to_string()
    }
}
