//! Archive HTTP connector
//!
//! Implements `MetadataSource` and `QuerySource` over an [`HttpClient`] and
//! an [`EndpointResolver`].

use async_trait::async_trait;
use bridge_traits::archive::{
    FetchOptions, MetadataResponse, MetadataSource, QuerySource, RelatedResponse, SearchParams,
    SearchResponse,
};
use bridge_traits::http::{HttpClient, HttpRequest, RetryPolicy};
use bridge_traits::routing::EndpointResolver;
use core_runtime::config::ArchiveConfig;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::error::{ArchiveProviderError, Result};
use crate::routing::ArchiveRouting;

/// Timeout for requests that do not carry their own
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Logical path of the search endpoint
const SEARCH_PATH: &str = "advancedsearch.php";

/// Archive connector
///
/// Turns archive operations into logical paths, resolves them to physical
/// endpoints, and tries those in order until one answers.
///
/// # Failure handling
///
/// - Transport failures and non-2xx statuses move on to the next endpoint
/// - An endpoint that answers with an undecodable body stops the walk and
///   is reported as `BridgeError::Decode`
/// - Retrying a single endpoint is left to the [`HttpClient`], driven by the
///   connector's [`RetryPolicy`]
///
/// # Example
///
/// ```ignore
/// use provider_archive::ArchiveConnector;
/// use bridge_traits::archive::{FetchOptions, MetadataSource};
///
/// let connector = ArchiveConnector::from_config(http_client, &config);
/// let response = connector.fetch_metadata("commute", FetchOptions::default()).await?;
/// ```
pub struct ArchiveConnector {
    http_client: Arc<dyn HttpClient>,
    resolver: Arc<dyn EndpointResolver>,
    retry_policy: RetryPolicy,
    timeout: Duration,
}

impl ArchiveConnector {
    pub fn new(http_client: Arc<dyn HttpClient>, resolver: Arc<dyn EndpointResolver>) -> Self {
        Self {
            http_client,
            resolver,
            retry_policy: RetryPolicy::default(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Connector routed by the configuration's route table.
    pub fn from_config(http_client: Arc<dyn HttpClient>, config: &ArchiveConfig) -> Self {
        Self::new(
            http_client,
            Arc::new(ArchiveRouting::new(config.routes.clone())),
        )
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn build_request(&self, url: &str, pairs: &[(String, String)], options: FetchOptions) -> HttpRequest {
        let request = HttpRequest::get(url)
            .query_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .header("Accept", "application/json")
            .timeout(options.timeout.unwrap_or(self.timeout));

        if options.no_cache {
            request.no_cache()
        } else {
            request
        }
    }

    /// GET one physical endpoint and decode its JSON body.
    async fn fetch_endpoint<T: DeserializeOwned>(
        &self,
        url: &str,
        pairs: &[(String, String)],
        options: FetchOptions,
    ) -> Result<T> {
        let request = self.build_request(url, pairs, options);
        let response = self
            .http_client
            .execute_with_retry(request, self.retry_policy.clone())
            .await?;

        if !response.is_success() {
            return Err(ArchiveProviderError::HttpStatus {
                url: url.to_string(),
                status: response.status,
            });
        }

        serde_json::from_slice(&response.body).map_err(|e| ArchiveProviderError::ParseError {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    /// Resolve `logical` and return the first endpoint's decoded answer.
    #[instrument(skip(self, pairs, options))]
    async fn get_json<T: DeserializeOwned>(
        &self,
        logical: &str,
        pairs: &[(String, String)],
        options: FetchOptions,
    ) -> Result<T> {
        let urls = self.resolver.resolve(logical);
        if urls.is_empty() {
            return Err(ArchiveProviderError::NoRoute(logical.to_string()));
        }

        let attempts = urls.len();
        let mut last = None;
        for url in urls {
            match self.fetch_endpoint(&url, pairs, options).await {
                Ok(value) => {
                    debug!(url = %url, "Endpoint answered");
                    return Ok(value);
                }
                Err(e @ ArchiveProviderError::ParseError { .. }) => return Err(e),
                Err(e) => {
                    warn!(url = %url, error = %e, "Endpoint failed");
                    last = Some(e);
                }
            }
        }

        match last {
            Some(last) if attempts == 1 => Err(last),
            Some(last) => Err(ArchiveProviderError::AllEndpointsFailed {
                path: logical.to_string(),
                attempts,
                last: Box::new(last),
            }),
            None => Err(ArchiveProviderError::NoRoute(logical.to_string())),
        }
    }
}

#[async_trait]
impl MetadataSource for ArchiveConnector {
    #[instrument(skip(self, options))]
    async fn fetch_metadata(
        &self,
        identifier: &str,
        options: FetchOptions,
    ) -> bridge_traits::error::Result<MetadataResponse> {
        let path = format!("metadata/{}", urlencoding::encode(identifier));
        Ok(self.get_json(&path, &[], options).await?)
    }

    #[instrument(skip(self, options))]
    async fn fetch_playlist(
        &self,
        identifier: &str,
        options: FetchOptions,
    ) -> bridge_traits::error::Result<Vec<Value>> {
        let path = format!("embed/{}", urlencoding::encode(identifier));
        let pairs = [("output".to_string(), "json".to_string())];
        Ok(self.get_json(&path, &pairs, options).await?)
    }

    #[instrument(skip(self, options))]
    async fn fetch_related(
        &self,
        identifier: &str,
        options: FetchOptions,
    ) -> bridge_traits::error::Result<RelatedResponse> {
        let path = format!("mds/v1/get_related/all/{}", urlencoding::encode(identifier));
        Ok(self.get_json(&path, &[], options).await?)
    }
}

#[async_trait]
impl QuerySource for ArchiveConnector {
    #[instrument(skip(self, params, options), fields(q = %params.q, page = params.page, rows = params.rows))]
    async fn search(
        &self,
        params: &SearchParams,
        options: FetchOptions,
    ) -> bridge_traits::error::Result<SearchResponse> {
        Ok(self
            .get_json(SEARCH_PATH, &params.query_pairs(), options)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::BridgeError;
    use bridge_traits::http::HttpResponse;
    use bytes::Bytes;
    use core_runtime::config::RouteTable;
    use mockall::mock;
    use std::collections::HashMap;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> bridge_traits::error::Result<HttpResponse>;
        }
    }

    fn respond(status: u16, body: &str) -> bridge_traits::error::Result<HttpResponse> {
        Ok(HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        })
    }

    fn connector(mock_http: MockHttpClient) -> ArchiveConnector {
        ArchiveConnector::new(Arc::new(mock_http), Arc::new(ArchiveRouting::default()))
            .with_retry_policy(RetryPolicy::none())
    }

    fn two_metadata_endpoints() -> Arc<ArchiveRouting> {
        let mut table = RouteTable::default();
        table.routes.insert(
            "metadata".to_string(),
            vec![
                "https://primary.example/metadata/".to_string(),
                "https://secondary.example/metadata/".to_string(),
            ],
        );
        Arc::new(ArchiveRouting::new(table))
    }

    #[tokio::test]
    async fn test_fetch_metadata_success() {
        let mut mock_http = MockHttpClient::new();

        mock_http.expect_execute().times(1).returning(|req| {
            assert_eq!(req.url, "https://archive.org/metadata/commute");
            assert_eq!(req.headers.get("Accept"), Some(&"application/json".to_string()));
            assert!(!req.headers.contains_key("Cache-Control"));
            assert_eq!(req.timeout, Some(DEFAULT_REQUEST_TIMEOUT));
            respond(
                200,
                r#"{"metadata": {"identifier": "commute", "mediatype": "movies"},
                    "files": [{"name": "commute.mp4", "format": "h.264"}]}"#,
            )
        });

        let response = connector(mock_http)
            .fetch_metadata("commute", FetchOptions::default())
            .await
            .unwrap();

        assert_eq!(response.identifier(), Some("commute"));
        assert_eq!(response.files.len(), 1);
    }

    #[tokio::test]
    async fn test_options_reach_the_request() {
        let mut mock_http = MockHttpClient::new();

        mock_http.expect_execute().times(1).returning(|req| {
            assert_eq!(req.headers.get("Cache-Control"), Some(&"no-cache".to_string()));
            assert_eq!(req.timeout, Some(Duration::from_secs(5)));
            respond(200, r#"{"is_dark": true}"#)
        });

        let options = FetchOptions::default()
            .no_cache(true)
            .with_timeout(Duration::from_secs(5));
        let response = connector(mock_http)
            .fetch_metadata("gone", options)
            .await
            .unwrap();
        assert!(response.is_dark);
    }

    #[tokio::test]
    async fn test_search_sends_all_parameters() {
        let mut mock_http = MockHttpClient::new();

        mock_http.expect_execute().times(1).returning(|req| {
            assert!(req.url.starts_with("https://archive.org/advancedsearch.php?output=json&q=collection%3Aprelinger"));
            assert!(req.url.contains("&rows=75&page=2"));
            assert!(req.url.contains("&sort[]=-downloads"));
            assert!(req.url.contains("&save=yes"));
            assert!(req.url.contains("&fl=identifier%2Ctitle"));
            respond(
                200,
                r#"{"response": {"numFound": 1, "start": 75, "docs": [{"identifier": "a"}]}}"#,
            )
        });

        let params = SearchParams::new("collection:prelinger", 75, 2)
            .with_sort("-downloads")
            .with_fields(vec!["identifier".to_string(), "title".to_string()]);
        let response = connector(mock_http)
            .search(&params, FetchOptions::default())
            .await
            .unwrap();

        assert_eq!(response.response.num_found, 1);
        assert_eq!(response.response.start, 75);
    }

    #[tokio::test]
    async fn test_playlist_and_related_paths() {
        let mut mock_http = MockHttpClient::new();

        mock_http.expect_execute().times(2).returning(|req| {
            if req.url.contains("/embed/") {
                assert_eq!(req.url, "https://archive.org/embed/commute?output=json");
                respond(200, r#"[{"title": "Commute", "sources": []}]"#)
            } else {
                assert_eq!(
                    req.url,
                    "https://be-api.us.archive.org/mds/v1/get_related/all/commute"
                );
                respond(200, r#"{"hits": {"hits": [{"_id": "other", "_source": {}}]}}"#)
            }
        });

        let connector = connector(mock_http);
        let playlist = connector
            .fetch_playlist("commute", FetchOptions::default())
            .await
            .unwrap();
        let related = connector
            .fetch_related("commute", FetchOptions::default())
            .await
            .unwrap();

        assert_eq!(playlist.len(), 1);
        assert_eq!(related.hits.hits[0].id, "other");
    }

    #[tokio::test]
    async fn test_identifier_is_percent_encoded() {
        let mut mock_http = MockHttpClient::new();

        mock_http.expect_execute().times(1).returning(|req| {
            assert_eq!(req.url, "https://archive.org/metadata/a%20b%2Fc");
            respond(200, "{}")
        });

        connector(mock_http)
            .fetch_metadata("a b/c", FetchOptions::default())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_falls_back_to_next_endpoint() {
        let mut mock_http = MockHttpClient::new();

        mock_http.expect_execute().times(2).returning(|req| {
            if req.url.starts_with("https://primary.example") {
                respond(503, "unavailable")
            } else {
                respond(200, r#"{"metadata": {"identifier": "x"}}"#)
            }
        });

        let connector = ArchiveConnector::new(Arc::new(mock_http), two_metadata_endpoints())
            .with_retry_policy(RetryPolicy::none());
        let response = connector
            .fetch_metadata("x", FetchOptions::default())
            .await
            .unwrap();
        assert_eq!(response.identifier(), Some("x"));
    }

    #[tokio::test]
    async fn test_transport_error_falls_back_too() {
        let mut mock_http = MockHttpClient::new();

        mock_http.expect_execute().times(2).returning(|req| {
            if req.url.starts_with("https://primary.example") {
                Err(BridgeError::Timeout(req.url))
            } else {
                respond(200, r#"{"metadata": {"identifier": "x"}}"#)
            }
        });

        let connector = ArchiveConnector::new(Arc::new(mock_http), two_metadata_endpoints())
            .with_retry_policy(RetryPolicy::none());
        assert!(connector
            .fetch_metadata("x", FetchOptions::default())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_all_endpoints_failing_reports_last_status() {
        let mut mock_http = MockHttpClient::new();

        mock_http.expect_execute().times(2).returning(|req| {
            if req.url.starts_with("https://primary.example") {
                respond(500, "")
            } else {
                respond(502, "")
            }
        });

        let connector = ArchiveConnector::new(Arc::new(mock_http), two_metadata_endpoints())
            .with_retry_policy(RetryPolicy::none());
        let err = connector
            .fetch_metadata("x", FetchOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, BridgeError::HttpStatus { status: 502, .. }));
        assert!(!err.is_decode());
    }

    #[tokio::test]
    async fn test_undecodable_body_stops_fallback() {
        let mut mock_http = MockHttpClient::new();

        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| respond(200, "<html>maintenance</html>"));

        let connector = ArchiveConnector::new(Arc::new(mock_http), two_metadata_endpoints())
            .with_retry_policy(RetryPolicy::none());
        let err = connector
            .fetch_metadata("x", FetchOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_decode());
    }

    #[tokio::test]
    async fn test_search_without_envelope_is_decode_error() {
        let mut mock_http = MockHttpClient::new();

        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| respond(200, r#"{"error": "bad query"}"#));

        let err = connector(mock_http)
            .search(&SearchParams::new("(", 10, 1), FetchOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_decode());
    }

    #[tokio::test]
    async fn test_unroutable_path() {
        let mock_http = MockHttpClient::new();
        let empty = RouteTable {
            routes: Default::default(),
            mirror: None,
            mirrored_origins: Vec::new(),
        };

        let connector =
            ArchiveConnector::new(Arc::new(mock_http), Arc::new(ArchiveRouting::new(empty)));
        let err = connector
            .fetch_metadata("x", FetchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::NoRoute(_)));
    }
}
