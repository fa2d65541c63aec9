//! # Core Configuration Module
//!
//! Provides the immutable configuration value shared by every sync component.
//!
//! ## Overview
//!
//! [`ArchiveConfig`] is constructed once at startup through
//! [`ArchiveConfigBuilder`], validated fail-fast, and then handed to the
//! connector and the engines behind an `Arc`. Nothing mutates it afterwards;
//! tables that used to be patched at load time are supplied to the builder
//! instead.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::ArchiveConfig;
//! use std::sync::Arc;
//!
//! let config = Arc::new(
//!     ArchiveConfig::builder()
//!         .rows(50)
//!         .identifier_sort("-date", ["my_newsletter"])
//!         .build()?,
//! );
//! ```
//!
//! ## Error Handling
//!
//! The builder validates every table and returns [`Error::Config`] with an
//! actionable message:
//!
//! ```should_panic
//! use core_runtime::config::ArchiveConfig;
//!
//! ArchiveConfig::builder()
//!     .rows(0)
//!     .build()
//!     .expect("Should fail - zero page size");
//! ```

use crate::error::{Error, Result};
use bridge_traits::{FieldMap, HttpClient};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

/// Fields requested from the search endpoint so that a result can be painted
/// as a tile without a further lookup.
pub const DEFAULT_FIELDS: &[&str] = &[
    "identifier",
    "title",
    "collection",
    "mediatype",
    "downloads",
    "creator",
    "num_reviews",
    "publicdate",
    "item_count",
    "loans__status__status",
];

/// Fields a member record must carry before it counts as expanded.
pub const REQUIRED_MEMBER_FIELDS: &[&str] =
    &["title", "mediatype", "collection", "downloads", "publicdate"];

const HOME_SKIP_IDENTIFIERS: &[&str] = &[
    "what_cd",
    "cd",
    "vinyl",
    "librarygenesis",
    "bibalex",
    "movies",
    "audio",
    "texts",
    "software",
    "image",
    "data",
    "web",
    "additional_collections",
    "animationandcartoons",
    "artsandmusicvideos",
    "audio_bookspoetry",
    "audio_foreign",
    "audio_music",
    "audio_news",
    "audio_podcast",
    "audio_religion",
    "audio_tech",
    "computersandtechvideos",
    "coverartarchive",
    "culturalandacademicfilms",
    "ephemera",
    "gamevideos",
    "inlibrary",
    "moviesandfilms",
    "newsandpublicaffairs",
    "ourmedia",
    "radioprograms",
    "samples_only",
    "spiritualityandreligion",
    "stream_only",
    "television",
    "test_collection",
    "usgovfilms",
    "vlogs",
    "youth_media",
];

/// Query behind the synthetic `home` collection.
pub fn default_home_query() -> String {
    format!(
        "mediatype:collection AND NOT noindex:true AND NOT collection:web \
         AND NOT identifier:fav-* AND NOT identifier:( {})",
        HOME_SKIP_IDENTIFIERS.join(" OR ")
    )
}

/// Route table consulted by the endpoint resolver.
///
/// Keys are the first segment of a logical path (`metadata`,
/// `advancedsearch.php`, ...); `.` is the catch-all.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteTable {
    pub routes: BTreeMap<String, Vec<String>>,
    /// When set, URLs under any of `mirrored_origins` are served by this
    /// origin instead.
    pub mirror: Option<String>,
    pub mirrored_origins: Vec<String>,
}

impl Default for RouteTable {
    fn default() -> Self {
        let mut routes = BTreeMap::new();
        routes.insert(".".to_string(), vec!["https://archive.org/".to_string()]);
        routes.insert(
            "metadata".to_string(),
            vec!["https://archive.org/metadata/".to_string()],
        );
        routes.insert(
            "advancedsearch.php".to_string(),
            vec!["https://archive.org/advancedsearch.php".to_string()],
        );
        routes.insert(
            "embed".to_string(),
            vec!["https://archive.org/embed/".to_string()],
        );
        routes.insert(
            "mds".to_string(),
            vec!["https://be-api.us.archive.org/mds/".to_string()],
        );

        Self {
            routes,
            mirror: None,
            mirrored_origins: vec![
                "https://archive.org".to_string(),
                "https://be-api.us.archive.org".to_string(),
            ],
        }
    }
}

/// Static sort tables, consulted below any entity or caller supplied sort.
#[derive(Debug, Clone, PartialEq)]
pub struct SortTables {
    /// identifier -> sort
    pub per_identifier: HashMap<String, String>,
    /// parent collection -> sort applied to its members
    pub per_parent: HashMap<String, String>,
    /// Identifiers for which the per-parent table is skipped.
    pub parent_exclude: Vec<String>,
    /// Default for account-like entities.
    pub account_default: String,
    pub global_default: String,
}

impl SortTables {
    fn insert_group(table: &mut HashMap<String, String>, sort: &str, identifiers: &[&str]) {
        for identifier in identifiers {
            table.insert((*identifier).to_string(), sort.to_string());
        }
    }
}

impl Default for SortTables {
    fn default() -> Self {
        let mut per_identifier = HashMap::new();
        Self::insert_group(&mut per_identifier, "-publicdate", &["tvnews"]);
        Self::insert_group(
            &mut per_identifier,
            "-reviewdate",
            &["librivoxaudio", "library_of_congress"],
        );
        Self::insert_group(
            &mut per_identifier,
            "-date",
            &[
                "peterboroughcitydirectories",
                "democracy_now",
                "democracy_now_vid",
                "ianewsletter",
                "eastridgechurchofchrist",
                "lighthousebaptistchurch",
            ],
        );
        Self::insert_group(&mut per_identifier, "titleSorter", &["densho"]);

        let mut per_parent = HashMap::new();
        Self::insert_group(&mut per_parent, "-publicdate", &["tvnews", "tvarchive"]);
        Self::insert_group(
            &mut per_parent,
            "-date",
            &["podcasts", "audio_podcast", "community_media"],
        );
        Self::insert_group(&mut per_parent, "titleSorter", &["densho"]);

        Self {
            per_identifier,
            per_parent,
            parent_exclude: vec!["TVNewsKitchen".to_string()],
            account_default: "-publicdate".to_string(),
            global_default: "-downloads".to_string(),
        }
    }
}

/// Settings for the caching metadata/query decorator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of cached responses per cache
    pub capacity: usize,
    /// How long an entry stays fresh
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 512,
            ttl: Duration::from_secs(600),
        }
    }
}

/// Immutable configuration for the archive sync core.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveConfig {
    pub routes: RouteTable,

    /// Page size for new entities
    pub default_rows: usize,

    /// `fl` sent with every search
    pub default_fields: Vec<String>,

    /// Fields (besides `identifier`) that make a member record expanded
    pub required_member_fields: Vec<String>,

    /// Bound on the metadata leg; search and expansion inherit the
    /// transport default.
    pub metadata_timeout: Duration,

    pub sort: SortTables,

    /// Pseudo identifiers answered locally, keyed by identifier, valued by
    /// their metadata object.
    pub special_identifiers: BTreeMap<String, FieldMap>,

    /// Mediatypes whose items need a playlist before they are usable
    pub playlist_mediatypes: Vec<String>,

    /// Collections whose members never get a playlist
    pub playlist_excluded_collections: Vec<String>,

    /// Mediatypes too vague to trust; reclassified from the item's files
    pub ambiguous_mediatypes: Vec<String>,

    pub cache: CacheConfig,
}

fn special(identifier: &str, title: &str, thumbnail: &str, search: Option<&str>) -> FieldMap {
    let mut fields = FieldMap::new();
    fields.insert("identifier".into(), json!(identifier));
    fields.insert("title".into(), json!(title));
    fields.insert("collection".into(), json!([]));
    fields.insert("mediatype".into(), json!("collection"));
    fields.insert("publicdate".into(), json!(""));
    fields.insert("uploader".into(), json!(""));
    fields.insert("thumbnaillinks".into(), json!(thumbnail));
    if let Some(query) = search {
        fields.insert("search_collection".into(), Value::String(query.to_string()));
    }
    fields
}

fn default_special_identifiers() -> BTreeMap<String, FieldMap> {
    let home_query = default_home_query();
    let mut table = BTreeMap::new();
    table.insert(
        "home".to_string(),
        special(
            "home",
            "Internet Archive home",
            "/archive/images/settings.svg",
            Some(&home_query),
        ),
    );
    table.insert(
        "local".to_string(),
        special(
            "local",
            "Locally crawled",
            "/archive/images/baseline-home-24px.svg",
            None,
        ),
    );
    table.insert(
        "settings".to_string(),
        special("settings", "Settings", "/archive/images/settings.svg", None),
    );
    table
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            routes: RouteTable::default(),
            default_rows: 75,
            default_fields: strings(DEFAULT_FIELDS),
            required_member_fields: strings(REQUIRED_MEMBER_FIELDS),
            metadata_timeout: Duration::from_secs(5),
            sort: SortTables::default(),
            special_identifiers: default_special_identifiers(),
            playlist_mediatypes: strings(&["audio", "etree", "movies"]),
            playlist_excluded_collections: strings(&["tvnews", "tvarchive"]),
            ambiguous_mediatypes: strings(&["education"]),
            cache: CacheConfig::default(),
        }
    }
}

impl ArchiveConfig {
    /// Creates a new builder seeded with the defaults.
    pub fn builder() -> ArchiveConfigBuilder {
        ArchiveConfigBuilder::default()
    }

    /// Metadata of a pseudo identifier, if `identifier` is one.
    pub fn special(&self, identifier: &str) -> Option<&FieldMap> {
        self.special_identifiers.get(identifier)
    }

    pub fn is_special(&self, identifier: &str) -> bool {
        self.special_identifiers.contains_key(identifier)
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Page size is > 0 and <= 10,000
    /// - The field list requests `identifier`
    /// - The metadata timeout is between 1ms and 60s
    /// - Every route has at least one URL and a catch-all route exists
    /// - Cache capacity is > 0
    pub fn validate(&self) -> Result<()> {
        if self.default_rows == 0 {
            return Err(Error::Config(
                "Page size (rows) must be greater than 0".to_string(),
            ));
        }

        if self.default_rows > 10_000 {
            return Err(Error::Config(
                "Page size (rows) exceeds the search endpoint maximum of 10,000".to_string(),
            ));
        }

        if !self.default_fields.iter().any(|f| f == "identifier") {
            return Err(Error::Config(
                "Default field list must include 'identifier'; search results cannot be \
                 merged without it"
                    .to_string(),
            ));
        }

        if self.metadata_timeout.is_zero() || self.metadata_timeout > Duration::from_secs(60) {
            return Err(Error::Config(
                "Metadata timeout must be between 1ms and 60 seconds".to_string(),
            ));
        }

        if !self.routes.routes.contains_key(".") {
            return Err(Error::Config(
                "Route table needs a catch-all '.' entry".to_string(),
            ));
        }

        if let Some((prefix, _)) = self.routes.routes.iter().find(|(_, urls)| urls.is_empty()) {
            return Err(Error::Config(format!(
                "Route '{}' has no endpoints. Remove it or supply at least one URL.",
                prefix
            )));
        }

        if self.cache.capacity == 0 {
            return Err(Error::Config(
                "Cache capacity must be greater than 0".to_string(),
            ));
        }

        if self.sort.global_default.is_empty() {
            return Err(Error::Config(
                "Global default sort cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for [`ArchiveConfig`].
#[derive(Debug, Default)]
pub struct ArchiveConfigBuilder {
    config: ArchiveConfig,
}

impl ArchiveConfigBuilder {
    /// Default page size for new entities.
    pub fn rows(mut self, rows: usize) -> Self {
        self.config.default_rows = rows;
        self
    }

    /// Replace the `fl` list sent with searches.
    pub fn default_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.default_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn metadata_timeout(mut self, timeout: Duration) -> Self {
        self.config.metadata_timeout = timeout;
        self
    }

    /// Add or replace a route.
    pub fn route<I, S>(mut self, prefix: impl Into<String>, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config
            .routes
            .routes
            .insert(prefix.into(), urls.into_iter().map(Into::into).collect());
        self
    }

    /// Serve mirrored origins from `origin` (e.g. a local crawl mirror).
    pub fn mirror(mut self, origin: impl Into<String>) -> Self {
        self.config.routes.mirror = Some(origin.into());
        self
    }

    /// Give every identifier in `identifiers` a fixed sort.
    pub fn identifier_sort<I, S>(mut self, sort: &str, identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for identifier in identifiers {
            self.config
                .sort
                .per_identifier
                .insert(identifier.into(), sort.to_string());
        }
        self
    }

    /// Sort members of any of `parents` with `sort`.
    pub fn parent_sort<I, S>(mut self, sort: &str, parents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for parent in parents {
            self.config
                .sort
                .per_parent
                .insert(parent.into(), sort.to_string());
        }
        self
    }

    pub fn exclude_from_parent_sort(mut self, identifier: impl Into<String>) -> Self {
        self.config.sort.parent_exclude.push(identifier.into());
        self
    }

    pub fn account_sort(mut self, sort: impl Into<String>) -> Self {
        self.config.sort.account_default = sort.into();
        self
    }

    pub fn default_sort(mut self, sort: impl Into<String>) -> Self {
        self.config.sort.global_default = sort.into();
        self
    }

    /// Register a pseudo identifier answered without a network call.
    pub fn special_identifier(mut self, identifier: impl Into<String>, metadata: FieldMap) -> Self {
        self.config
            .special_identifiers
            .insert(identifier.into(), metadata);
        self
    }

    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.config.cache.capacity = capacity;
        self
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.config.cache.ttl = ttl;
        self
    }

    /// Builds the final `ArchiveConfig` instance.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when any value fails [`ArchiveConfig::validate`].
    pub fn build(self) -> Result<ArchiveConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Provide the platform HTTP client.
///
/// With `desktop-shims` this is the reqwest-backed client; without it the
/// host must inject its own implementation.
#[cfg(feature = "desktop-shims")]
pub fn default_http_client() -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::new().map_err(|e| Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: e.to_string(),
    })?;
    Ok(Arc::new(client))
}

#[cfg(not(feature = "desktop-shims"))]
pub fn default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "No HTTP client implementation provided. \
                  Desktop: enable the 'desktop-shims' feature to use ReqwestHttpClient. \
                  Other hosts: inject a platform-native adapter."
            .to_string(),
    })
}
