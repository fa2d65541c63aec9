//! Integration tests for collection synchronization
//!
//! These tests drive the engine against an in-memory archive whose search
//! index can be mutated between calls, and verify:
//! - Metadata idempotence and dark stickiness
//! - Page stability against an unchanged index
//! - Gap-filling request shapes
//! - Drift detection and wholesale replacement
//! - Degrade-on-failure for search, fail-fast for metadata
//! - Page rollback on failed `more()`
//! - Best-effort expansion of favorites

use bridge_traits::{
    error::BridgeError, FetchOptions, MetadataResponse, MetadataSource, QuerySource,
    RelatedResponse, SearchParams, SearchResponse,
};
use core_library::{Entity, FieldRules, Kind, MemberRecord};
use core_runtime::config::{ArchiveConfig, CacheConfig};
use core_sync::{
    BatchExpander, CachingQuerySource, CollectionSyncEngine, LoadOptions, PageOptions,
};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;

// ============================================================================
// Fake archive
// ============================================================================

/// In-memory archive: a metadata table plus a search index served page by
/// page. Scripted responses, when queued, take precedence over the index.
struct FakeArchive {
    metadata: AsyncMutex<HashMap<String, Value>>,
    index: AsyncMutex<Vec<String>>,
    scripted: AsyncMutex<VecDeque<bridge_traits::error::Result<Value>>>,
    searches: AsyncMutex<Vec<SearchParams>>,
    metadata_calls: AtomicUsize,
    fail_metadata: AsyncMutex<bool>,
    fail_lookups: AsyncMutex<bool>,
}

impl FakeArchive {
    fn new() -> Self {
        Self {
            metadata: AsyncMutex::new(HashMap::new()),
            index: AsyncMutex::new(Vec::new()),
            scripted: AsyncMutex::new(VecDeque::new()),
            searches: AsyncMutex::new(Vec::new()),
            metadata_calls: AtomicUsize::new(0),
            fail_metadata: AsyncMutex::new(false),
            fail_lookups: AsyncMutex::new(false),
        }
    }

    async fn add_collection(&self, identifier: &str) {
        self.metadata.lock().await.insert(
            identifier.to_string(),
            json!({"metadata": {"identifier": identifier, "mediatype": "collection", "collection": []}}),
        );
    }

    async fn add_item(&self, identifier: &str, metadata: Value) {
        self.metadata
            .lock()
            .await
            .insert(identifier.to_string(), json!({ "metadata": metadata }));
    }

    async fn set_index(&self, ids: Vec<String>) {
        *self.index.lock().await = ids;
    }

    async fn script(&self, response: bridge_traits::error::Result<Value>) {
        self.scripted.lock().await.push_back(response);
    }

    async fn searches(&self) -> Vec<SearchParams> {
        self.searches.lock().await.clone()
    }

    async fn search_count(&self) -> usize {
        self.searches.lock().await.len()
    }

    fn metadata_calls(&self) -> usize {
        self.metadata_calls.load(Ordering::SeqCst)
    }
}

fn full_doc(identifier: &str) -> Value {
    json!({
        "identifier": identifier,
        "title": format!("Title of {}", identifier),
        "mediatype": "movies",
        "collection": ["test_collection"],
        "downloads": 7,
        "publicdate": "2020-01-01T00:00:00Z",
    })
}

fn ids(prefix: &str, range: std::ops::Range<usize>) -> Vec<String> {
    range.map(|i| format!("{}{:03}", prefix, i)).collect()
}

fn page_of(docs: Vec<Value>, num_found: usize, start: usize) -> Value {
    json!({"response": {"numFound": num_found, "start": start, "docs": docs}})
}

#[async_trait::async_trait]
impl MetadataSource for FakeArchive {
    async fn fetch_metadata(
        &self,
        identifier: &str,
        _options: FetchOptions,
    ) -> bridge_traits::error::Result<MetadataResponse> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail_metadata.lock().await {
            return Err(BridgeError::OperationFailed("metadata endpoint down".into()));
        }
        let value = self
            .metadata
            .lock()
            .await
            .get(identifier)
            .cloned()
            .ok_or_else(|| BridgeError::HttpStatus {
                url: format!("https://archive.org/metadata/{}", identifier),
                status: 404,
            })?;
        serde_json::from_value(value).map_err(|e| BridgeError::Decode(e.to_string()))
    }

    async fn fetch_playlist(
        &self,
        _identifier: &str,
        _options: FetchOptions,
    ) -> bridge_traits::error::Result<Vec<Value>> {
        Ok(Vec::new())
    }

    async fn fetch_related(
        &self,
        identifier: &str,
        _options: FetchOptions,
    ) -> bridge_traits::error::Result<RelatedResponse> {
        let value = json!({"hits": {"hits": [
            {"_id": format!("{}-related-1", identifier), "_source": {"title": ["One"], "mediatype": ["texts"]}},
            {"_id": format!("{}-related-2", identifier), "_source": {"title": ["Two"], "mediatype": ["audio"]}},
        ]}});
        serde_json::from_value(value).map_err(|e| BridgeError::Decode(e.to_string()))
    }
}

#[async_trait::async_trait]
impl QuerySource for FakeArchive {
    async fn search(
        &self,
        params: &SearchParams,
        _options: FetchOptions,
    ) -> bridge_traits::error::Result<SearchResponse> {
        self.searches.lock().await.push(params.clone());

        if let Some(scripted) = self.scripted.lock().await.pop_front() {
            return scripted.and_then(|v| {
                serde_json::from_value(v).map_err(|e| BridgeError::Decode(e.to_string()))
            });
        }

        let value = if let Some(list) = params
            .q
            .strip_prefix("identifier:(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            if *self.fail_lookups.lock().await {
                return Err(BridgeError::Timeout("lookup".into()));
            }
            let mut requested: Vec<&str> = list.split(" OR ").collect();
            requested.sort();
            let docs: Vec<Value> = requested.iter().map(|id| full_doc(id)).collect();
            page_of(docs.clone(), docs.len(), 0)
        } else {
            let index = self.index.lock().await;
            let start = (params.page.max(1) - 1) * params.rows;
            let docs: Vec<Value> = index
                .iter()
                .skip(start)
                .take(params.rows)
                .map(|id| full_doc(id))
                .collect();
            page_of(docs, index.len(), start)
        };
        serde_json::from_value(value).map_err(|e| BridgeError::Decode(e.to_string()))
    }
}

fn config(rows: usize) -> Arc<ArchiveConfig> {
    Arc::new(ArchiveConfig::builder().rows(rows).build().unwrap())
}

fn engine(archive: Arc<FakeArchive>, rows: usize) -> CollectionSyncEngine {
    CollectionSyncEngine::new(archive.clone(), archive, config(rows))
}

fn held_ids(entity: &Entity) -> Vec<String> {
    entity
        .search_members()
        .iter()
        .map(|m| m.identifier().to_string())
        .collect()
}

fn shape(params: &SearchParams) -> (usize, usize) {
    (params.page, params.rows)
}

// ============================================================================
// Metadata
// ============================================================================

#[tokio::test]
async fn test_metadata_load_is_idempotent() {
    let archive = Arc::new(FakeArchive::new());
    archive.add_collection("prelinger").await;
    let engine = engine(archive.clone(), 10);
    let mut entity = engine.entity("prelinger");

    engine.fetch_metadata(&mut entity, LoadOptions::default()).await.unwrap();
    engine.fetch_metadata(&mut entity, LoadOptions::default()).await.unwrap();

    assert_eq!(archive.metadata_calls(), 1);
    assert_eq!(entity.kind(), Kind::Collection);
}

#[tokio::test]
async fn test_dark_entity_fails_without_refetching() {
    let archive = Arc::new(FakeArchive::new());
    archive
        .metadata
        .lock()
        .await
        .insert("taken_down".into(), json!({"is_dark": true}));
    let engine = engine(archive.clone(), 10);
    let mut entity = engine.entity("taken_down");

    let first = engine.fetch_page(&mut entity, PageOptions::default()).await;
    assert!(first.unwrap_err().is_dark());

    let second = engine.fetch_page(&mut entity, PageOptions::default()).await;
    assert!(second.unwrap_err().is_dark());

    assert_eq!(archive.metadata_calls(), 1);
    assert_eq!(archive.search_count().await, 0);
}

// ============================================================================
// Paging
// ============================================================================

#[tokio::test]
async fn test_steady_paging_is_stable() {
    let archive = Arc::new(FakeArchive::new());
    archive.add_collection("prelinger").await;
    archive.set_index(ids("film", 0..35)).await;
    let engine = engine(archive.clone(), 10);
    let mut entity = engine.entity("prelinger");

    let first = engine.fetch_page(&mut entity, PageOptions::default()).await.unwrap();
    assert_eq!(first.len(), 10);
    assert_eq!(shape(&archive.searches().await[0]), (1, 10));

    let again = engine.fetch_page(&mut entity, PageOptions::default()).await.unwrap();
    assert_eq!(again, first);
    assert_eq!(archive.search_count().await, 1, "held page needs no request");

    let second = engine.more(&mut entity, PageOptions::default()).await.unwrap();
    assert_eq!(entity.page(), 2);
    assert_eq!(second.identifiers()[0], "film010");
    let searches = archive.searches().await;
    assert_eq!(searches.len(), 2, "no corrective request without drift");
    assert_eq!(shape(&searches[1]), (2, 10));
    assert_eq!(held_ids(&entity), ids("film", 0..20));
}

#[tokio::test]
async fn test_query_sort_and_fields_are_sent() {
    let archive = Arc::new(FakeArchive::new());
    archive.add_collection("prelinger").await;
    archive.set_index(ids("film", 0..3)).await;
    let engine = engine(archive.clone(), 10);
    let mut entity = engine.entity("prelinger");

    engine.fetch_page(&mut entity, PageOptions::default()).await.unwrap();

    let params = &archive.searches().await[0];
    assert_eq!(
        params.q,
        "collection:prelinger OR simplelists__items:prelinger OR simplelists__holdings:prelinger"
    );
    assert_eq!(params.sort, vec!["-downloads".to_string()]);
    assert!(params.fl.contains(&"identifier".to_string()));
    assert!(params.save);
    assert_eq!(entity.query(), Some(params.q.as_str()));
}

#[tokio::test]
async fn test_caller_sort_beats_identifier_table() {
    let archive = Arc::new(FakeArchive::new());
    archive.add_collection("librivoxaudio").await;
    archive.set_index(ids("book", 0..3)).await;
    let engine = engine(archive.clone(), 10);
    let mut entity = engine.entity("librivoxaudio").with_sort("titleSorter");

    engine.fetch_page(&mut entity, PageOptions::default()).await.unwrap();
    assert_eq!(archive.searches().await[0].sort, vec!["titleSorter".to_string()]);

    let mut unsorted = engine.entity("librivoxaudio");
    engine.fetch_page(&mut unsorted, PageOptions::default()).await.unwrap();
    assert_eq!(archive.searches().await[1].sort, vec!["-reviewdate".to_string()]);
}

#[tokio::test]
async fn test_gap_fill_discards_when_little_is_held() {
    let archive = Arc::new(FakeArchive::new());
    archive.add_collection("growing").await;
    archive.set_index(ids("item", 0..3)).await;
    let engine = engine(archive.clone(), 10);
    let mut entity = engine.entity("growing");

    engine.fetch_page(&mut entity, PageOptions::default()).await.unwrap();
    assert_eq!(entity.search_members().len(), 3);

    archive.set_index(ids("item", 0..40)).await;
    let page = engine.more(&mut entity, PageOptions::default()).await.unwrap();

    let searches = archive.searches().await;
    assert_eq!(shape(&searches[1]), (1, 20), "held 3 of 10 expected: rebuild window");
    assert_eq!(searches.len(), 2);
    assert_eq!(held_ids(&entity), ids("item", 0..20));
    assert_eq!(page.identifiers()[0], "item010");
}

#[tokio::test]
async fn test_gap_fill_catches_up_when_half_is_held() {
    let archive = Arc::new(FakeArchive::new());
    archive.add_collection("growing").await;
    archive.set_index(ids("item", 0..6)).await;
    let engine = engine(archive.clone(), 10);
    let mut entity = engine.entity("growing");

    engine.fetch_page(&mut entity, PageOptions::default()).await.unwrap();
    assert_eq!(entity.search_members().len(), 6);

    archive.set_index(ids("item", 0..40)).await;
    engine.more(&mut entity, PageOptions::default()).await.unwrap();

    let searches = archive.searches().await;
    assert_eq!(shape(&searches[1]), (2, 6), "held 6 of 10 expected: fetch tail");
    assert_eq!(held_ids(&entity), ids("item", 0..12));
}

#[tokio::test]
async fn test_drift_triggers_one_corrective_replace() {
    let archive = Arc::new(FakeArchive::new());
    archive.add_collection("busy").await;
    archive.set_index(ids("item", 0..30)).await;
    let engine = engine(archive.clone(), 10);
    let mut entity = engine.entity("busy");

    engine.fetch_page(&mut entity, PageOptions::default()).await.unwrap();

    // A new upload at the top pushes item009 onto page 2
    let mut shifted = vec!["fresh".to_string()];
    shifted.extend(ids("item", 0..30));
    archive.set_index(shifted.clone()).await;

    engine.more(&mut entity, PageOptions::default()).await.unwrap();

    let searches = archive.searches().await;
    assert_eq!(searches.len(), 3, "primary plus exactly one corrective");
    assert_eq!(shape(&searches[1]), (2, 10));
    assert_eq!(shape(&searches[2]), (1, 20));
    assert_eq!(held_ids(&entity), shifted[..20].to_vec(), "replaced, not appended");
}

#[tokio::test]
async fn test_failed_correction_keeps_held_records() {
    let archive = Arc::new(FakeArchive::new());
    archive.add_collection("busy").await;
    archive.set_index(ids("item", 0..30)).await;
    let engine = engine(archive.clone(), 10);
    let mut entity = engine.entity("busy");

    engine.fetch_page(&mut entity, PageOptions::default()).await.unwrap();
    let before = held_ids(&entity);

    archive
        .script(Ok(page_of(vec![full_doc("item009"), full_doc("item010")], 30, 10)))
        .await;
    archive
        .script(Err(BridgeError::Timeout("corrective".into())))
        .await;

    let page = engine.more(&mut entity, PageOptions::default()).await.unwrap();
    assert!(page.is_empty());
    assert_eq!(entity.page(), 2);
    assert_eq!(held_ids(&entity), before);
    assert_eq!(archive.search_count().await, 3);
}

#[tokio::test]
async fn test_search_failure_serves_held_records() {
    let archive = Arc::new(FakeArchive::new());
    archive.add_collection("flaky").await;
    archive.set_index(ids("item", 0..30)).await;
    let engine = engine(archive.clone(), 10);
    let mut entity = engine.entity("flaky");

    engine.fetch_page(&mut entity, PageOptions::default()).await.unwrap();
    archive
        .script(Err(BridgeError::HttpStatus {
            url: "https://archive.org/advancedsearch.php".into(),
            status: 502,
        }))
        .await;

    let page = engine.more(&mut entity, PageOptions::default()).await.unwrap();
    assert!(page.is_empty(), "stale page beyond what is held");
    assert_eq!(entity.page(), 2, "degraded fetch is not a failure");
    assert_eq!(entity.search_members().len(), 10);
}

#[tokio::test]
async fn test_failed_rebuild_keeps_held_records() {
    let archive = Arc::new(FakeArchive::new());
    archive.add_collection("growing").await;
    archive.set_index(ids("item", 0..3)).await;
    let engine = engine(archive.clone(), 10);
    let mut entity = engine.entity("growing");

    engine.fetch_page(&mut entity, PageOptions::default()).await.unwrap();
    archive
        .script(Err(BridgeError::OperationFailed("reset".into())))
        .await;

    engine.more(&mut entity, PageOptions::default()).await.unwrap();
    assert_eq!(held_ids(&entity), ids("item", 0..3));
}

#[tokio::test]
async fn test_undecodable_search_is_an_integrity_error_and_rolls_back() {
    let archive = Arc::new(FakeArchive::new());
    archive.add_collection("broken").await;
    archive.set_index(ids("item", 0..30)).await;
    let engine = engine(archive.clone(), 10);
    let mut entity = engine.entity("broken");

    engine.fetch_page(&mut entity, PageOptions::default()).await.unwrap();
    archive.script(Ok(json!({"error": "bad query"}))).await;

    let err = engine
        .more(&mut entity, PageOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_integrity());
    assert_eq!(entity.page(), 1, "failed more() does not advance");
    assert_eq!(entity.search_members().len(), 10);
}

#[tokio::test]
async fn test_doc_without_identifier_is_an_integrity_error() {
    let archive = Arc::new(FakeArchive::new());
    archive.add_collection("broken").await;
    let engine = engine(archive.clone(), 10);
    let mut entity = engine.entity("broken");

    archive
        .script(Ok(page_of(vec![json!({"title": "orphan"})], 1, 0)))
        .await;
    let err = engine
        .fetch_page(&mut entity, PageOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_integrity());
}

#[tokio::test]
async fn test_more_rolls_back_on_metadata_failure() {
    let archive = Arc::new(FakeArchive::new());
    *archive.fail_metadata.lock().await = true;
    let engine = engine(archive.clone(), 10);
    let mut entity = engine.entity("unreachable").with_page(3);

    let err = engine
        .more(&mut entity, PageOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_transport());
    assert_eq!(entity.page(), 3);
}

#[tokio::test]
async fn test_plain_item_has_no_members() {
    let archive = Arc::new(FakeArchive::new());
    archive
        .add_item(
            "commute",
            json!({"identifier": "commute", "mediatype": "texts", "collection": ["prelinger"]}),
        )
        .await;
    let engine = engine(archive.clone(), 10);
    let mut entity = engine.entity("commute");

    let page = engine.fetch_page(&mut entity, PageOptions::default()).await.unwrap();
    assert!(page.is_empty());
    assert_eq!(archive.search_count().await, 0);
    assert!(entity.query().is_none());
}

#[tokio::test]
async fn test_ad_hoc_search() {
    let archive = Arc::new(FakeArchive::new());
    archive.set_index(ids("hit", 0..4)).await;
    let engine = engine(archive.clone(), 10);
    let mut entity = engine.search_entity("bananas");

    let page = engine
        .fetch_page(&mut entity, PageOptions::default().full_response(true))
        .await
        .unwrap();

    assert_eq!(archive.metadata_calls(), 0);
    assert_eq!(archive.searches().await[0].q, "bananas");
    assert_eq!(page.len(), 4);
    let info = page.response.unwrap();
    assert_eq!(info.num_found, 4);
    assert_eq!(page.to_search_response().response.docs[0]["identifier"], json!("hit000"));
}

// ============================================================================
// Favorites and expansion
// ============================================================================

#[tokio::test]
async fn test_favorites_come_first_and_are_expanded() {
    let archive = Arc::new(FakeArchive::new());
    archive
        .metadata
        .lock()
        .await
        .insert(
            "fav-someone".into(),
            json!({
                "metadata": {"identifier": "fav-someone", "mediatype": "collection", "collection": []},
                "members": [{"identifier": "liked1"}, {"identifier": "liked2"}],
            }),
        );
    archive.set_index(ids("item", 0..30)).await;
    let engine = engine(archive.clone(), 10);
    let mut entity = engine.entity("fav-someone");

    let page = engine.fetch_page(&mut entity, PageOptions::default()).await.unwrap();

    assert_eq!(&page.identifiers()[..3], &["liked1", "liked2", "item000"]);
    assert!(entity.favorites().iter().all(MemberRecord::is_expanded));
    let searches = archive.searches().await;
    assert_eq!(searches[0].q, "identifier:(liked1 OR liked2)");
    assert_eq!(searches[0].rows, 2);
    assert_eq!(searches[0].sort, vec!["identifier".to_string()]);
}

#[tokio::test]
async fn test_expansion_failure_is_not_an_error() {
    let archive = Arc::new(FakeArchive::new());
    archive
        .metadata
        .lock()
        .await
        .insert(
            "fav-someone".into(),
            json!({
                "metadata": {"identifier": "fav-someone", "mediatype": "collection", "collection": []},
                "members": [{"identifier": "liked1"}],
            }),
        );
    *archive.fail_lookups.lock().await = true;
    let engine = engine(archive.clone(), 10);
    let mut entity = engine.entity("fav-someone");

    let page = engine.fetch_page(&mut entity, PageOptions::default()).await.unwrap();
    assert_eq!(page.identifiers()[0], "liked1");
    assert!(!entity.favorites()[0].is_expanded());
}

/// Answers member searches from the shared fake but never answers a lookup.
struct StalledLookups(Arc<FakeArchive>);

#[async_trait::async_trait]
impl QuerySource for StalledLookups {
    async fn search(
        &self,
        params: &SearchParams,
        options: FetchOptions,
    ) -> bridge_traits::error::Result<SearchResponse> {
        if params.q.starts_with("identifier:(") {
            return std::future::pending().await;
        }
        self.0.search(params, options).await
    }
}

#[tokio::test]
async fn test_abandoned_fetch_keeps_favorites() {
    let archive = Arc::new(FakeArchive::new());
    archive
        .metadata
        .lock()
        .await
        .insert(
            "fav-someone".into(),
            json!({
                "metadata": {"identifier": "fav-someone", "mediatype": "collection", "collection": []},
                "members": [{"identifier": "liked1"}, {"identifier": "liked2"}],
            }),
        );
    archive.set_index(ids("item", 0..30)).await;
    let stalled = CollectionSyncEngine::new(
        archive.clone(),
        Arc::new(StalledLookups(archive.clone())),
        config(10),
    );
    let mut entity = stalled.entity("fav-someone");

    let outcome = tokio::time::timeout(
        Duration::from_millis(50),
        stalled.fetch_page(&mut entity, PageOptions::default()),
    )
    .await;

    assert!(outcome.is_err());
    let favorites: Vec<_> = entity.favorites().iter().map(MemberRecord::identifier).collect();
    assert_eq!(favorites, vec!["liked1", "liked2"]);
    assert!(entity.favorites().iter().all(|f| !f.is_expanded()));

    let engine = engine(archive.clone(), 10);
    let page = engine.fetch_page(&mut entity, PageOptions::default()).await.unwrap();
    assert_eq!(&page.identifiers()[..3], &["liked1", "liked2", "item000"]);
    assert!(entity.favorites().iter().all(MemberRecord::is_expanded));
}

#[tokio::test]
async fn test_expand_members_makes_one_call_and_keeps_order() {
    let archive = Arc::new(FakeArchive::new());
    let config = config(10);
    let expander = BatchExpander::new(archive.clone(), config.clone());
    let rules = FieldRules::member(&config.required_member_fields);
    let already = MemberRecord::from_doc(
        full_doc("done").as_object().unwrap(),
        &rules,
    )
    .unwrap();
    assert!(already.is_expanded());

    let records = vec![
        MemberRecord::stub("stub_b"),
        MemberRecord::stub("home"),
        already.clone(),
        MemberRecord::stub("stub_a"),
        MemberRecord::stub("stub_b"),
    ];

    let out = expander.expand_members(records, FetchOptions::default()).await;

    let out_ids: Vec<_> = out.iter().map(MemberRecord::identifier).collect();
    assert_eq!(out_ids, vec!["stub_b", "home", "done", "stub_a", "stub_b"]);
    assert!(out.iter().all(MemberRecord::is_expanded));
    assert_eq!(out[1].title(), Some("Internet Archive home"));
    assert_eq!(out[2], already);

    let searches = archive.searches().await;
    assert_eq!(searches.len(), 1);
    assert_eq!(searches[0].q, "identifier:(stub_b OR stub_a)");
    assert_eq!(searches[0].rows, 2);
}

#[tokio::test]
async fn test_partial_lookup_results_stay_stubs() {
    let archive = Arc::new(FakeArchive::new());
    archive
        .script(Ok(page_of(
            vec![full_doc("a"), json!({"identifier": "b", "title": "B only"})],
            2,
            0,
        )))
        .await;
    let expander = BatchExpander::new(archive.clone(), config(10));

    let out = expander
        .expand_members(
            vec![MemberRecord::stub("a"), MemberRecord::stub("b")],
            FetchOptions::default(),
        )
        .await;
    assert!(out[0].is_expanded());
    assert!(!out[1].is_expanded());
}

#[tokio::test]
async fn test_expand_with_nothing_to_do_makes_no_call() {
    let archive = Arc::new(FakeArchive::new());
    let expander = BatchExpander::new(archive.clone(), config(10));

    let out = expander
        .expand_members(vec![MemberRecord::stub("settings")], FetchOptions::default())
        .await;
    assert!(out[0].is_expanded());
    assert_eq!(archive.search_count().await, 0);
}

// ============================================================================
// Related items and caching
// ============================================================================

#[tokio::test]
async fn test_related_members() {
    let archive = Arc::new(FakeArchive::new());
    let engine = engine(archive.clone(), 10);

    let related = engine.related_members("commute", false).await.unwrap();
    let ids: Vec<_> = related.iter().map(MemberRecord::identifier).collect();
    assert_eq!(ids, vec!["commute-related-1", "commute-related-2"]);
    assert_eq!(related[0].title(), Some("One"));
}

/// Shares one fake between the engine's metadata side and a cache wrapper.
struct SharedArchive(Arc<FakeArchive>);

#[async_trait::async_trait]
impl QuerySource for SharedArchive {
    async fn search(
        &self,
        params: &SearchParams,
        options: FetchOptions,
    ) -> bridge_traits::error::Result<SearchResponse> {
        self.0.search(params, options).await
    }
}

#[tokio::test]
async fn test_caching_source_composes_with_engine() {
    let archive = Arc::new(FakeArchive::new());
    archive.add_collection("prelinger").await;
    archive.set_index(ids("film", 0..30)).await;
    let clock = Arc::new(bridge_traits::ManualClock::at_millis(0));
    let cached = Arc::new(CachingQuerySource::new(
        SharedArchive(archive.clone()),
        CacheConfig {
            capacity: 16,
            ttl: Duration::from_secs(60),
        },
        clock,
    ));
    let engine = CollectionSyncEngine::new(archive.clone(), cached, config(10));

    let mut first = engine.entity("prelinger");
    let mut second = engine.entity("prelinger");
    let a = engine.fetch_page(&mut first, PageOptions::default()).await.unwrap();
    let b = engine.fetch_page(&mut second, PageOptions::default()).await.unwrap();
    assert_eq!(a, b);
    assert_eq!(archive.search_count().await, 1);

    let mut third = engine.entity("prelinger");
    engine
        .fetch_page(&mut third, PageOptions::default().no_cache(true))
        .await
        .unwrap();
    assert_eq!(archive.search_count().await, 2);
}
