//! # Host Bridge Traits
//!
//! Capability traits the sync core is written against, plus the wire types
//! of the archive endpoints.
//!
//! ## Overview
//!
//! This crate defines the contract between the core crates and whatever
//! actually talks to the network. The core never constructs a URL or an HTTP
//! client itself; it receives trait objects and composes them.
//!
//! ## Traits
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Async HTTP with retry and TLS
//! - [`EndpointResolver`](routing::EndpointResolver) - Logical path to physical URLs
//!
//! ### Archive sources
//! - [`MetadataSource`](archive::MetadataSource) - Metadata, playlist and related-items lookups
//! - [`QuerySource`](archive::QuerySource) - Paginated search
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Implementations
//!
//! | Capability | Implementation Crate |
//! |------------|---------------------|
//! | `HttpClient` | `bridge-desktop` |
//! | `MetadataSource`, `QuerySource`, `EndpointResolver` | `provider-archive` |
//! | Caching `MetadataSource` / `QuerySource` | `core-sync` |
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should map undecodable payloads to `BridgeError::Decode` and every
//! reachability problem to one of the other variants, because the sync layer
//! treats the two very differently.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so implementations can be shared
//! behind `Arc` across tasks.
//!
//! ## Examples
//!
//! ```ignore
//! use bridge_traits::archive::{FetchOptions, QuerySource, SearchParams};
//!
//! async fn first_page(source: &dyn QuerySource) -> bridge_traits::error::Result<usize> {
//!     let params = SearchParams::new("collection:prelinger", 75, 1).with_sort("-downloads");
//!     let response = source.search(&params, FetchOptions::default()).await?;
//!     Ok(response.response.docs.len())
//! }
//! ```

pub mod archive;
pub mod error;
pub mod http;
pub mod routing;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use archive::{
    FetchOptions, FieldMap, MetadataResponse, MetadataSource, QuerySource, RelatedHit,
    RelatedHits, RelatedResponse, SearchParams, SearchResponse, SearchResult,
};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use routing::{EndpointResolver, SingleOrigin};
pub use time::{Clock, LogEntry, LogLevel, LoggerSink, ManualClock, SystemClock};
