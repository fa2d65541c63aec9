//! # Archive Library Model
//!
//! Entities, member records and the pure rules that shape them.
//!
//! ## Overview
//!
//! This crate holds everything about an archive entity that can be decided
//! without touching the network:
//! - Field-shape normalization of raw metadata and search docs
//! - Entity classification ([`Kind`]) and member expansion state
//! - Implicit query derivation and the sort waterfall
//! - Paging state, gap-filling plans and page slicing
//! - Playlist post-processing and file format classification
//!
//! The engines in `core-sync` drive these types; nothing here is async.

pub mod entity;
pub mod error;
pub mod formats;
pub mod item;
pub mod models;
pub mod normalize;
pub mod pagination;
pub mod playlist;
pub mod query;
pub mod sort;

pub use entity::{Entity, Subtype, DEFAULT_ROWS};
pub use error::{LibraryError, Result};
pub use formats::{FileKind, FormatTable};
pub use item::{prepare_item, LoadedItem};
pub use models::{ArchiveFile, ExpansionState, Kind, MemberRecord};
pub use normalize::FieldRules;
pub use pagination::{FetchPlan, MemberPage, PageInfo, PageRequest};
pub use playlist::{process_playlist, PlaylistTrack, TrackSource};
pub use query::QueryBuilder;
pub use sort::SortPolicy;
