//! # Archive Provider
//!
//! Implements `MetadataSource` and `QuerySource` against the archive's HTTP
//! endpoints.
//!
//! ## Overview
//!
//! This module provides:
//! - Metadata, playlist (`embed`) and related-items lookups
//! - Paginated search via `advancedsearch.php`
//! - A route table resolver with optional mirror redirection
//! - Ordered failover across the endpoints a path resolves to

pub mod connector;
pub mod error;
pub mod routing;

pub use connector::ArchiveConnector;
pub use error::{ArchiveProviderError, Result};
pub use routing::ArchiveRouting;
