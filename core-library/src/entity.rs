//! The entity: one item, collection or search, with its paging state
//!
//! All mutation goes through methods here so the invariants hold no matter
//! which engine drives it:
//! - search members never contain the same identifier twice
//! - favorites and search members are separate lists, joined only when a
//!   page is read
//! - the query, once set, never changes
//! - `is_dark` never goes back to false

use std::collections::HashSet;

use bridge_traits::{FieldMap, MetadataResponse};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::formats::FileKind;
use crate::item::LoadedItem;
use crate::models::{ArchiveFile, Kind, MemberRecord};
use crate::normalize::{list_field, str_field};
use crate::pagination::{MemberPage, PageInfo, PageRequest};
use crate::playlist::PlaylistTrack;

/// Page size of an entity nobody configured.
pub const DEFAULT_ROWS: u32 = 75;

const TV_COLLECTIONS: &[&str] = &["tvnews", "tvarchive"];
const ALBUM_COLLECTIONS: &[&str] = &["acdc", "samples_only", "meridamexico"];

/// Which viewer suits an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subtype {
    /// Page images plus scan data: page-turning reader
    BookReader,
    /// Texts without the above: image slides
    Carousel,
    Tv,
    /// Audio with a transcript
    Radio,
    Album,
}

impl Subtype {
    pub fn as_str(&self) -> &'static str {
        match self {
            Subtype::BookReader => "bookreader",
            Subtype::Carousel => "carousel",
            Subtype::Tv => "tv",
            Subtype::Radio => "radio",
            Subtype::Album => "album",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Entity {
    identifier: Option<String>,
    query: Option<String>,
    sort: Vec<String>,
    and: Vec<String>,
    page: u32,
    rows: u32,

    metadata: Option<FieldMap>,
    files: Vec<ArchiveFile>,
    playlist: Option<Vec<PlaylistTrack>>,
    extras: FieldMap,
    is_dark: bool,
    kind: Kind,

    members_from_favorites: Vec<MemberRecord>,
    members_from_search: Vec<MemberRecord>,
    start: u64,
    num_found: u64,
}

impl Entity {
    /// An item or collection known by identifier.
    pub fn new(identifier: impl Into<String>) -> Self {
        Self::blank(Some(identifier.into()), None)
    }

    /// An ad-hoc search with no backing item.
    pub fn for_query(query: impl Into<String>) -> Self {
        let mut entity = Self::blank(None, Some(query.into()));
        entity.kind = Kind::SavedSearch;
        entity
    }

    fn blank(identifier: Option<String>, query: Option<String>) -> Self {
        Self {
            identifier,
            query,
            sort: Vec::new(),
            and: Vec::new(),
            page: 1,
            rows: DEFAULT_ROWS,
            metadata: None,
            files: Vec::new(),
            playlist: None,
            extras: FieldMap::new(),
            is_dark: false,
            kind: Kind::Plain,
            members_from_favorites: Vec::new(),
            members_from_search: Vec::new(),
            start: 0,
            num_found: 0,
        }
    }

    /// Explicit query for an identified entity (e.g. a search within a
    /// collection page).
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort.push(sort.into());
        self
    }

    /// Extra `and[]` filters sent with every search.
    pub fn with_filters(mut self, and: Vec<String>) -> Self {
        self.and = and;
        self
    }

    pub fn with_rows(mut self, rows: u32) -> Self {
        self.rows = rows;
        self
    }

    /// Page to read; 0 is treated as 1.
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    // ---------------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------------

    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn sort(&self) -> &[String] {
        &self.sort
    }

    pub fn filters(&self) -> &[String] {
        &self.and
    }

    pub fn page(&self) -> u32 {
        self.page.max(1)
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.rows)
    }

    pub fn metadata(&self) -> Option<&FieldMap> {
        self.metadata.as_ref()
    }

    pub fn files(&self) -> &[ArchiveFile] {
        &self.files
    }

    pub fn playlist(&self) -> Option<&[PlaylistTrack]> {
        self.playlist.as_deref()
    }

    /// Top-level extras that came with the metadata response
    /// (`dir`, `server`, `collection_sort_order`...).
    pub fn extras(&self) -> &FieldMap {
        &self.extras
    }

    pub fn is_dark(&self) -> bool {
        self.is_dark
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Metadata is held, or the entity is known to be dark.
    pub fn is_loaded(&self) -> bool {
        self.metadata.is_some() || self.is_dark
    }

    pub fn mediatype(&self) -> Option<&str> {
        self.metadata.as_ref().and_then(|m| str_field(m, "mediatype"))
    }

    pub fn collections(&self) -> Vec<&str> {
        self.metadata
            .as_ref()
            .map(|m| list_field(m, "collection"))
            .unwrap_or_default()
    }

    pub fn favorites(&self) -> &[MemberRecord] {
        &self.members_from_favorites
    }

    pub fn search_members(&self) -> &[MemberRecord] {
        &self.members_from_search
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn num_found(&self) -> u64 {
        self.num_found
    }

    /// Sort order the server recorded for this collection, if any.
    pub fn collection_sort_order(&self) -> Vec<String> {
        match self.extras.get("collection_sort_order") {
            Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
            Some(Value::Array(values)) => values
                .iter()
                .filter_map(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }

    // ---------------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------------

    /// Record a derived query unless one is already set; returns the query
    /// in effect.
    pub fn memoize_query(&mut self, query: String) -> &str {
        self.query.get_or_insert(query)
    }

    /// The remote service hid this entity. Permanent.
    pub fn mark_dark(&mut self) {
        self.is_dark = true;
        self.kind = Kind::Dark;
    }

    /// Store a processed metadata response and classify the entity.
    pub fn apply_loaded(&mut self, loaded: LoadedItem) {
        let LoadedItem {
            metadata,
            files,
            favorites,
            extras,
            playlist,
            is_dark,
        } = loaded;

        if metadata.is_some() {
            self.metadata = metadata;
        }
        self.files = files;
        if let Some(favorites) = favorites {
            self.members_from_favorites = favorites;
        }
        if let Some(num_found) = extras.get("numFound").and_then(Value::as_u64) {
            self.num_found = num_found;
        }
        self.extras.extend(extras);
        if playlist.is_some() {
            self.playlist = playlist;
        }
        if is_dark {
            self.is_dark = true;
        }
        self.kind = Kind::classify(
            self.identifier.as_deref(),
            self.metadata.as_ref(),
            self.is_dark,
            self.query.is_some(),
        );
        debug!(
            identifier = ?self.identifier,
            kind = ?self.kind,
            files = self.files.len(),
            favorites = self.members_from_favorites.len(),
            "Entity metadata stored"
        );
    }

    pub fn favorites_mut(&mut self) -> &mut Vec<MemberRecord> {
        &mut self.members_from_favorites
    }

    /// Append search results, skipping identifiers already held (including
    /// repeats within `records`). Returns how many were added.
    pub fn append_search_results(&mut self, records: Vec<MemberRecord>, info: PageInfo) -> usize {
        let mut seen: HashSet<String> = self
            .members_from_search
            .iter()
            .map(|m| m.identifier().to_string())
            .collect();
        let before = self.members_from_search.len();
        for record in records {
            if seen.insert(record.identifier().to_string()) {
                self.members_from_search.push(record);
            }
        }
        self.set_page_info(info);
        self.members_from_search.len() - before
    }

    /// Throw away held search results and take `records` instead.
    pub fn replace_search_results(&mut self, records: Vec<MemberRecord>, info: PageInfo) {
        self.members_from_search.clear();
        self.append_search_results(records, info);
    }

    fn set_page_info(&mut self, info: PageInfo) {
        self.start = info.start;
        self.num_found = info.num_found;
    }

    /// True if any of `identifiers` is already among the search results.
    pub fn overlaps_search_results<'a, I>(&self, identifiers: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        let held: HashSet<&str> = self
            .members_from_search
            .iter()
            .map(MemberRecord::identifier)
            .collect();
        identifiers.into_iter().any(|id| held.contains(id))
    }

    /// Favorites plus search results.
    pub fn held_total(&self) -> usize {
        self.members_from_favorites.len() + self.members_from_search.len()
    }

    /// Move to the next page; returns the new page.
    pub fn advance_page(&mut self) -> u32 {
        self.page = self.page.max(1) + 1;
        self.page
    }

    /// Restore a page saved before [`advance_page`](Self::advance_page).
    pub fn restore_page(&mut self, page: u32) {
        self.page = page;
    }

    /// The current page of `favorites ++ search results`.
    ///
    /// With `wrap` the page also carries `numFound`/`start` so it can be
    /// handed on as a raw search response.
    pub fn current_page(&self, wrap: bool) -> MemberPage {
        let request = self.page_request();
        let members = self
            .members_from_favorites
            .iter()
            .chain(self.members_from_search.iter())
            .skip(request.offset())
            .take(request.rows as usize)
            .cloned()
            .collect();
        MemberPage {
            members,
            response: wrap.then_some(PageInfo {
                num_found: self.num_found,
                start: self.start,
            }),
        }
    }

    // ---------------------------------------------------------------------
    // Files
    // ---------------------------------------------------------------------

    pub fn file_named(&self, name: &str) -> Option<&ArchiveFile> {
        self.files.iter().find(|f| f.name() == name)
    }

    /// First file playable as `kind`.
    pub fn playable_file(&self, kind: FileKind) -> Option<&ArchiveFile> {
        self.files.iter().find(|f| f.is_playable_as(kind))
    }

    pub fn thumbnail_file(&self) -> Option<&ArchiveFile> {
        self.files
            .iter()
            .find(|f| f.name() == "__ia_thumb.jpg" || f.name().ends_with("_itemimage.jpg"))
    }

    /// JPEG page images in name order.
    pub fn carousel_files(&self) -> Vec<&ArchiveFile> {
        let mut slides: Vec<_> = self.files.iter().filter(|f| f.format() == "JPEG").collect();
        slides.sort_by(|a, b| a.name().cmp(b.name()));
        slides
    }

    /// Viewer hint; `None` for mediatypes without variants or before
    /// metadata is loaded.
    pub fn subtype(&self) -> Option<Subtype> {
        self.identifier.as_ref()?;
        let collections = self.collections();
        let in_any = |set: &[&str]| collections.iter().any(|c| set.contains(c));

        match self.mediatype()? {
            "texts" => {
                let has_page_images = self.files.iter().any(|f| {
                    let format = f.format();
                    format.starts_with("Single Page Processed")
                        && (format.ends_with("ZIP") || format.ends_with("Tar"))
                });
                let has_scandata = self
                    .files
                    .iter()
                    .any(|f| matches!(f.format(), "Scandata" | "Scribe Scandata ZIP"));
                Some(if has_page_images && has_scandata {
                    Subtype::BookReader
                } else {
                    Subtype::Carousel
                })
            }
            "movies" if in_any(TV_COLLECTIONS) => Some(Subtype::Tv),
            "audio" => {
                if self.files.iter().any(|f| f.format() == "JSON SRT") {
                    Some(Subtype::Radio)
                } else if in_any(ALBUM_COLLECTIONS) {
                    Some(Subtype::Album)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Re-export the loaded state in metadata-response shape, e.g. for a
    /// cache to store and later feed back through the loader.
    pub fn export_metadata(&self, want_playlist: bool) -> MetadataResponse {
        let members = if self.members_from_favorites.is_empty() {
            None
        } else {
            Some(
                self.members_from_favorites
                    .iter()
                    .map(MemberRecord::to_doc)
                    .collect(),
            )
        };
        let playlist = if want_playlist {
            self.playlist.as_ref().map(|tracks| {
                tracks
                    .iter()
                    .filter_map(|t| serde_json::to_value(t).ok())
                    .collect()
            })
        } else {
            None
        };

        MetadataResponse {
            metadata: self.metadata.clone(),
            files: self.files.iter().map(|f| f.fields().clone()).collect(),
            members,
            is_dark: self.is_dark,
            playlist,
            extra: self.extras.clone(),
        }
    }
}
