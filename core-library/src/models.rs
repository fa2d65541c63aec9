//! Domain models for archive entities and their members
//!
//! [`MemberRecord`] is the lightweight tile-level view of an item;
//! [`ArchiveFile`] is one entry of an item's file list; [`Kind`] is the single
//! classification every other component consults instead of probing fields.

use bridge_traits::{FieldMap, RelatedHit};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{LibraryError, Result};
use crate::formats::{FileKind, FormatTable};
use crate::normalize::{list_field, str_field, FieldRules};

// =============================================================================
// Classification
// =============================================================================

/// What an entity is, decided once when its metadata is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Kind {
    /// A single item (or not yet known)
    #[default]
    Plain,
    /// `mediatype: collection`
    Collection,
    /// `mediatype: account`
    Account,
    /// A saved search item, or an ad-hoc query without an identifier
    SavedSearch,
    /// Hidden by the remote service
    Dark,
}

impl Kind {
    pub fn classify(
        identifier: Option<&str>,
        metadata: Option<&FieldMap>,
        is_dark: bool,
        has_query: bool,
    ) -> Self {
        if is_dark {
            return Kind::Dark;
        }
        match metadata.and_then(|m| str_field(m, "mediatype")) {
            Some("collection") => Kind::Collection,
            Some("account") => Kind::Account,
            Some("search") => Kind::SavedSearch,
            Some(_) => Kind::Plain,
            None if identifier.is_none() && has_query => Kind::SavedSearch,
            None => Kind::Plain,
        }
    }

    /// Collections, accounts and searches page through members.
    pub fn is_collection_like(&self) -> bool {
        matches!(self, Kind::Collection | Kind::Account | Kind::SavedSearch)
    }
}

// =============================================================================
// Member records
// =============================================================================

/// How much of a member record is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExpansionState {
    /// Identifier and maybe a few hints
    #[default]
    Stub,
    /// Every required display field present
    Expanded,
}

/// Reference to an item as shown in a collection listing.
///
/// Serializes as a flat search doc (`{"identifier": ..., "title": ...}`).
/// A record only ever moves from Stub to Expanded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberRecord {
    identifier: String,
    #[serde(flatten)]
    fields: FieldMap,
    #[serde(skip)]
    state: ExpansionState,
}

impl MemberRecord {
    pub fn stub(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            fields: FieldMap::new(),
            state: ExpansionState::Stub,
        }
    }

    /// Build from a raw search doc.
    ///
    /// The record is Expanded only if `raw` itself carries every required
    /// field; otherwise it stays a Stub even though normalization backfills
    /// the missing fields.
    pub fn from_doc(raw: &FieldMap, rules: &FieldRules) -> Result<Self> {
        let complete = rules.is_complete(raw);
        let mut fields = rules.enforce(raw);
        let identifier = take_identifier(&mut fields)?;
        Ok(Self {
            identifier,
            fields,
            state: if complete {
                ExpansionState::Expanded
            } else {
                ExpansionState::Stub
            },
        })
    }

    /// Build from an entry of a favorites list. Always a Stub until expanded.
    pub fn from_favorite(raw: &FieldMap, rules: &FieldRules) -> Result<Self> {
        let mut fields = rules.enforce(raw);
        let identifier = take_identifier(&mut fields)?;
        Ok(Self {
            identifier,
            fields,
            state: ExpansionState::Stub,
        })
    }

    /// Build from a locally configured table entry (pseudo identifiers).
    ///
    /// Such entries are authoritative, so the record is Expanded even where
    /// fields had to be backfilled.
    pub fn from_table(raw: &FieldMap, rules: &FieldRules) -> Result<Self> {
        let mut fields = rules.enforce(raw);
        let identifier = take_identifier(&mut fields)?;
        Ok(Self {
            identifier,
            fields,
            state: ExpansionState::Expanded,
        })
    }

    /// Build from a related-items hit (identifier lives in `_id`).
    pub fn from_related(hit: &RelatedHit, rules: &FieldRules) -> Result<Self> {
        let mut raw = hit.source.clone();
        raw.insert("identifier".to_string(), Value::String(hit.id.clone()));
        Self::from_doc(&raw, rules)
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn state(&self) -> ExpansionState {
        self.state
    }

    pub fn is_expanded(&self) -> bool {
        self.state == ExpansionState::Expanded
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn title(&self) -> Option<&str> {
        str_field(&self.fields, "title")
    }

    pub fn mediatype(&self) -> Option<&str> {
        str_field(&self.fields, "mediatype")
    }

    pub fn collections(&self) -> Vec<&str> {
        list_field(&self.fields, "collection")
    }

    /// First listed collection, the one a tile is usually labelled with.
    pub fn primary_collection(&self) -> Option<&str> {
        self.collections().into_iter().next()
    }

    pub fn downloads(&self) -> Option<u64> {
        match self.fields.get("downloads")? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn publicdate(&self) -> Option<&str> {
        str_field(&self.fields, "publicdate")
    }

    /// Replace this record's fields with those of `expanded`.
    ///
    /// Ignored unless `expanded` is itself Expanded and has the same
    /// identifier; returns whether the promotion happened.
    pub fn promote(&mut self, expanded: &MemberRecord) -> bool {
        if !expanded.is_expanded() || expanded.identifier != self.identifier {
            return false;
        }
        self.fields = expanded.fields.clone();
        self.state = ExpansionState::Expanded;
        true
    }

    /// Flat doc with `identifier` included, as the search endpoint returns it.
    pub fn to_doc(&self) -> FieldMap {
        let mut doc = FieldMap::new();
        doc.insert(
            "identifier".to_string(),
            Value::String(self.identifier.clone()),
        );
        doc.extend(self.fields.clone());
        doc
    }
}

fn take_identifier(fields: &mut FieldMap) -> Result<String> {
    match fields.remove("identifier") {
        Some(Value::String(id)) if !id.is_empty() => Ok(id),
        Some(other) => Err(LibraryError::MissingIdentifier(other.to_string())),
        None => Err(LibraryError::MissingIdentifier(
            "no identifier field".to_string(),
        )),
    }
}

// =============================================================================
// Files
// =============================================================================

/// One entry of an item's file list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArchiveFile {
    fields: FieldMap,
}

impl ArchiveFile {
    pub fn from_fields(fields: FieldMap) -> Self {
        Self { fields }
    }

    /// A file the server builds on demand and does not list.
    pub fn synthetic(name: impl Into<String>, format: &str) -> Self {
        let mut fields = FieldMap::new();
        fields.insert("name".to_string(), Value::String(name.into()));
        fields.insert("format".to_string(), Value::String(format.to_string()));
        Self { fields }
    }

    pub fn name(&self) -> &str {
        self.fields
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn format(&self) -> &str {
        self.fields
            .get("format")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn kind(&self) -> FileKind {
        FormatTable.kind_of(self.format())
    }

    pub fn is_playable_as(&self, kind: FileKind) -> bool {
        FormatTable.is_playable_as(self.format(), kind)
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }
}
