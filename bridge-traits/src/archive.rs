//! Archive Source Capabilities
//!
//! Wire types for the metadata, search, playlist and related-items endpoints,
//! and the two capability traits the sync engine is written against. A caching
//! layer composes by wrapping a [`MetadataSource`] or [`QuerySource`] rather
//! than by replacing methods on an engine instance.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

use crate::error::Result;

/// Untyped JSON object as returned by the archive APIs.
pub type FieldMap = Map<String, Value>;

/// Per-call fetch options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Skip any cache on the read path and ask upstream caches to revalidate.
    pub no_cache: bool,
    /// Upper bound for the whole call; `None` inherits the transport default.
    pub timeout: Option<Duration>,
}

impl FetchOptions {
    pub fn no_cache(mut self, no_cache: bool) -> Self {
        self.no_cache = no_cache;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Response of the metadata endpoint.
///
/// Only the fields the sync layer interprets are typed; everything else
/// (`dir`, `server`, `files_count`, `reviews`...) lands in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<FieldMap>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FieldMap>,

    /// Explicit member list of favorites-style collections (`fav-*`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<FieldMap>>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_dark: bool,

    /// Present only in re-exported responses that carry their playlist.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playlist: Option<Vec<Value>>,

    #[serde(flatten)]
    pub extra: FieldMap,
}

impl MetadataResponse {
    /// Identifier echoed back in `metadata.identifier`, if it is a string.
    pub fn identifier(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get("identifier"))
            .and_then(Value::as_str)
    }
}

/// Parameters of one paginated search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    pub q: String,
    pub rows: usize,
    pub page: usize,
    pub sort: Vec<String>,
    pub and: Vec<String>,
    pub fl: Vec<String>,
    pub save: bool,
}

impl SearchParams {
    pub fn new(q: impl Into<String>, rows: usize, page: usize) -> Self {
        Self {
            q: q.into(),
            rows,
            page,
            sort: Vec::new(),
            and: Vec::new(),
            fl: Vec::new(),
            save: true,
        }
    }

    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort.push(sort.into());
        self
    }

    pub fn with_and(mut self, clauses: Vec<String>) -> Self {
        self.and = clauses;
        self
    }

    pub fn with_fields(mut self, fl: Vec<String>) -> Self {
        self.fl = fl;
        self
    }

    /// Query-string pairs in the order the search endpoint documents them.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("output".to_string(), "json".to_string()),
            ("q".to_string(), self.q.clone()),
            ("rows".to_string(), self.rows.to_string()),
            ("page".to_string(), self.page.to_string()),
        ];
        pairs.extend(self.sort.iter().map(|s| ("sort[]".to_string(), s.clone())));
        pairs.extend(self.and.iter().map(|a| ("and[]".to_string(), a.clone())));
        if self.save {
            pairs.push(("save".to_string(), "yes".to_string()));
        }
        if !self.fl.is_empty() {
            pairs.push(("fl".to_string(), self.fl.join(",")));
        }
        pairs
    }
}

/// Envelope of the paginated search endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub response: SearchResult,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(rename = "numFound", default)]
    pub num_found: u64,
    #[serde(default)]
    pub start: u64,
    pub docs: Vec<FieldMap>,
}

/// Envelope of the related-items endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelatedResponse {
    pub hits: RelatedHits,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelatedHits {
    #[serde(default)]
    pub hits: Vec<RelatedHit>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedHit {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_source", default)]
    pub source: FieldMap,
}

/// Item-keyed endpoints: metadata, playlist and related items.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Fetch the metadata document for `identifier`.
    async fn fetch_metadata(
        &self,
        identifier: &str,
        options: FetchOptions,
    ) -> Result<MetadataResponse>;

    /// Fetch the raw playlist (ordered track descriptors) for `identifier`.
    async fn fetch_playlist(&self, identifier: &str, options: FetchOptions) -> Result<Vec<Value>>;

    /// Fetch items related to `identifier`.
    async fn fetch_related(
        &self,
        identifier: &str,
        options: FetchOptions,
    ) -> Result<RelatedResponse>;
}

/// The paginated search endpoint.
#[async_trait]
pub trait QuerySource: Send + Sync {
    async fn search(&self, params: &SearchParams, options: FetchOptions) -> Result<SearchResponse>;
}
