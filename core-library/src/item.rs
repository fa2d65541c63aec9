//! Turning a raw metadata response into entity state
//!
//! Pure and synchronous: the loader fetches, this module interprets. Every
//! correction for the quirks of the metadata endpoint lives here.

use bridge_traits::{FieldMap, MetadataResponse};
use core_runtime::config::ArchiveConfig;
use serde_json::Value;
use tracing::{debug, warn};

use crate::formats::FileKind;
use crate::models::{ArchiveFile, MemberRecord};
use crate::normalize::{list_field, str_field, FieldRules};
use crate::playlist::PlaylistTrack;

/// Top-level response fields kept alongside the metadata.
pub const EXTRA_FIELDS: &[&str] = &[
    "collection_sort_order",
    "collection_titles",
    "crawl",
    "downloaded",
    "dir",
    "files_count",
    "numFound",
    "reviews",
    "server",
];

/// Order in which playable files decide an ambiguous mediatype.
const RECLASSIFY_ORDER: &[(FileKind, &str)] = &[
    (FileKind::Video, "movies"),
    (FileKind::Text, "texts"),
    (FileKind::Image, "image"),
];

/// A metadata response after normalization, ready to store on an entity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedItem {
    pub metadata: Option<FieldMap>,
    pub files: Vec<ArchiveFile>,
    /// `None` when the response had no member list
    pub favorites: Option<Vec<MemberRecord>>,
    pub extras: FieldMap,
    pub playlist: Option<Vec<PlaylistTrack>>,
    pub is_dark: bool,
}

impl LoadedItem {
    pub fn mediatype(&self) -> Option<&str> {
        self.metadata.as_ref().and_then(|m| str_field(m, "mediatype"))
    }

    /// Whether a playlist must be fetched before this item is usable.
    pub fn needs_playlist(&self, config: &ArchiveConfig) -> bool {
        if self.is_dark {
            return false;
        }
        let Some(metadata) = self.metadata.as_ref() else {
            return false;
        };
        let playable_family = str_field(metadata, "mediatype")
            .map(|mt| config.playlist_mediatypes.iter().any(|p| p == mt))
            .unwrap_or(false);
        let excluded = list_field(metadata, "collection")
            .iter()
            .any(|c| config.playlist_excluded_collections.iter().any(|x| x == c));
        playable_family && !excluded
    }
}

/// Normalize a metadata response for `identifier`.
///
/// Applies field rules, reclassifies ambiguous mediatypes from the file
/// list, adds the on-demand ebook derivatives of OCRed texts, turns the
/// member list into favorite stubs and keeps the truthy extras. The
/// playlist, if the response carries one, is not processed here.
pub fn prepare_item(
    identifier: &str,
    response: MetadataResponse,
    config: &ArchiveConfig,
) -> LoadedItem {
    let MetadataResponse {
        metadata,
        files,
        members,
        is_dark,
        playlist: _,
        extra,
    } = response;

    let mut files: Vec<ArchiveFile> = files.into_iter().map(ArchiveFile::from_fields).collect();

    let metadata = metadata.map(|raw| {
        let mut meta = FieldRules::item().enforce(&raw);
        reclassify_mediatype(&mut meta, &files, config);
        if str_field(&meta, "mediatype") == Some("texts") {
            add_ebook_derivatives(identifier, &mut files);
        }
        meta
    });

    let member_rules = FieldRules::member(&config.required_member_fields);
    let favorites = members.map(|entries| {
        entries
            .iter()
            .filter_map(|raw| match MemberRecord::from_favorite(raw, &member_rules) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(identifier = %identifier, error = %e, "Skipping unusable favorite");
                    None
                }
            })
            .collect()
    });

    let extras = EXTRA_FIELDS
        .iter()
        .filter_map(|field| {
            extra
                .get(*field)
                .filter(|v| is_truthy(v))
                .map(|v| (field.to_string(), v.clone()))
        })
        .collect();

    LoadedItem {
        metadata,
        files,
        favorites,
        extras,
        playlist: None,
        is_dark,
    }
}

fn reclassify_mediatype(meta: &mut FieldMap, files: &[ArchiveFile], config: &ArchiveConfig) {
    let Some(current) = str_field(meta, "mediatype").map(str::to_string) else {
        return;
    };
    if !config.ambiguous_mediatypes.iter().any(|m| *m == current) {
        return;
    }
    let guess = RECLASSIFY_ORDER
        .iter()
        .find(|(kind, _)| files.iter().any(|f| f.is_playable_as(*kind)))
        .map(|(_, mediatype)| *mediatype);

    if let Some(mediatype) = guess {
        debug!(
            identifier = str_field(meta, "identifier").unwrap_or_default(),
            from = %current,
            to = mediatype,
            "Reclassified ambiguous mediatype"
        );
        meta.insert("mediatype".to_string(), Value::String(mediatype.to_string()));
    }
}

/// OCRed texts can be downloaded as Epub and Kindle, built on request by
/// the server and not listed among the files.
fn add_ebook_derivatives(identifier: &str, files: &mut Vec<ArchiveFile>) {
    if !files.iter().any(|f| f.format() == "Abbyy GZ") {
        return;
    }
    for (extension, format) in [("epub", "Epub"), ("mobi", "Kindle")] {
        if !files.iter().any(|f| f.format() == format) {
            files.push(ArchiveFile::synthetic(
                format!("{}.{}", identifier, extension),
                format,
            ));
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
