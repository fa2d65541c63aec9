//! # Collection Sync
//!
//! Loads entity metadata and incrementally builds deduplicated, paginated
//! member lists from a remote search index that mutates on its own.
//!
//! ## Components
//!
//! - **Metadata Loader** (`loader`): Fail-fast metadata and playlist loading with sticky dark state
//! - **Batch Expander** (`expander`): Best-effort stub expansion in a single lookup
//! - **Collection Sync Engine** (`engine`): Gap-filling pagination with drift recovery
//! - **Caching Sources** (`cache`): LRU/TTL decorators for the metadata and search sources
//!
//! ## Error Model
//!
//! Metadata and playlist loading propagate every failure. Search failures
//! degrade to the records already held; expansion failures leave stubs in
//! place. See [`SyncError`].

pub mod cache;
pub mod engine;
pub mod error;
pub mod expander;
pub mod loader;

pub use cache::{CachingMetadataSource, CachingQuerySource};
pub use engine::{CollectionSyncEngine, PageOptions};
pub use error::{Result, SyncError};
pub use expander::BatchExpander;
pub use loader::{LoadOptions, MetadataLoader};
