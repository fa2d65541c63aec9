//! # Batch Expander
//!
//! Promotes stub member records to expanded ones with a single search
//! request, however many stubs there are.
//!
//! Expansion is best effort. [`BatchExpander::expand_members`] never fails;
//! records that could not be expanded come back as the stubs they were, in
//! the same position.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use bridge_traits::{FetchOptions, QuerySource, SearchParams};
use core_library::{Entity, FieldRules, MemberRecord, QueryBuilder};
use core_runtime::config::ArchiveConfig;
use tracing::{debug, instrument, warn};

use crate::error::{Result, SyncError};

pub struct BatchExpander {
    source: Arc<dyn QuerySource>,
    config: Arc<ArchiveConfig>,
    rules: FieldRules,
}

impl BatchExpander {
    pub fn new(source: Arc<dyn QuerySource>, config: Arc<ArchiveConfig>) -> Self {
        let rules = FieldRules::member(&config.required_member_fields);
        Self {
            source,
            config,
            rules,
        }
    }

    /// Look up `identifiers` in one request and return the records that came
    /// back fully populated, keyed by identifier.
    ///
    /// Makes no request for an empty list. Entries missing required fields
    /// are left out rather than returned half-filled.
    #[instrument(skip(self, identifiers), fields(count = identifiers.len()))]
    pub async fn expand(
        &self,
        identifiers: &[String],
        options: FetchOptions,
    ) -> Result<HashMap<String, MemberRecord>> {
        if identifiers.is_empty() {
            return Ok(HashMap::new());
        }

        let params = SearchParams::new(
            QueryBuilder.identifier_batch(identifiers),
            identifiers.len(),
            1,
        )
        .with_sort("identifier")
        .with_fields(self.config.default_fields.clone());

        let response = self
            .source
            .search(&params, options)
            .await
            .map_err(|e| SyncError::from_bridge("identifier batch", e))?;

        let mut expanded = HashMap::new();
        for doc in &response.response.docs {
            match MemberRecord::from_doc(doc, &self.rules) {
                Ok(record) if record.is_expanded() => {
                    expanded.insert(record.identifier().to_string(), record);
                }
                Ok(record) => {
                    debug!(identifier = record.identifier(), "Lookup returned a partial record");
                }
                Err(e) => warn!(error = %e, "Ignoring lookup result without identifier"),
            }
        }
        debug!(requested = identifiers.len(), expanded = expanded.len(), "Batch lookup done");
        Ok(expanded)
    }

    /// Expand every stub in `records`, preserving order and length.
    ///
    /// Already expanded records pass through, pseudo identifiers are filled
    /// from the configuration, and all remaining stubs share one lookup. A
    /// failed lookup is logged and leaves the stubs as they were.
    pub async fn expand_members(
        &self,
        mut records: Vec<MemberRecord>,
        options: FetchOptions,
    ) -> Vec<MemberRecord> {
        let mut pending: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for record in records.iter_mut().filter(|r| !r.is_expanded()) {
            if let Some(special) = self.config.special(record.identifier()) {
                match MemberRecord::from_table(special, &self.rules) {
                    Ok(resolved) => {
                        record.promote(&resolved);
                    }
                    Err(e) => warn!(
                        identifier = record.identifier(),
                        error = %e,
                        "Pseudo identifier table entry unusable"
                    ),
                }
            } else if seen.insert(record.identifier().to_string()) {
                pending.push(record.identifier().to_string());
            }
        }

        if pending.is_empty() {
            return records;
        }

        match self.expand(&pending, options).await {
            Ok(expanded) => {
                for record in records.iter_mut() {
                    if let Some(full) = expanded.get(record.identifier()) {
                        record.promote(full);
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, stubs = pending.len(), "Expansion failed, keeping stubs");
            }
        }
        records
    }

    /// Expand the favorites of `entity` in place.
    ///
    /// The entity is only written once the lookup has finished, so dropping
    /// the future part way leaves its favorites as they were.
    pub async fn expand_favorites(&self, entity: &mut Entity, options: FetchOptions) {
        if entity.favorites().iter().all(MemberRecord::is_expanded) {
            return;
        }
        let expanded = self
            .expand_members(entity.favorites().to_vec(), options)
            .await;
        for (held, fresh) in entity.favorites_mut().iter_mut().zip(&expanded) {
            held.promote(fresh);
        }
    }
}
