//! Implicit search expressions
//!
//! An entity pages through whatever a search returns. When the caller did not
//! supply a query, one is derived from what the entity is: members of a
//! collection, items on its simple lists, its saved search, or the uploads of
//! an account.

use tracing::debug;

use crate::entity::Entity;
use crate::models::Kind;
use crate::normalize::str_field;

/// Derives and memoizes entity queries.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryBuilder;

impl QueryBuilder {
    /// The query `entity` would get, without storing it.
    ///
    /// Returns `None` when no clause applies: the entity is not
    /// collection-like.
    pub fn derive(&self, entity: &Entity) -> Option<String> {
        let mut clauses: Vec<String> = Vec::new();

        if let (Some(identifier), Kind::Collection) = (entity.identifier(), entity.kind()) {
            clauses.push(format!("collection:{}", identifier));
            clauses.push(format!("simplelists__items:{}", identifier));
            clauses.push(format!("simplelists__holdings:{}", identifier));
        }

        if let Some(metadata) = entity.metadata() {
            if let Some(saved) = str_field(metadata, "search_collection") {
                clauses.push(saved.replace("\\\"", "\""));
            }
            if entity.kind() == Kind::Account {
                if let Some(uploader) = str_field(metadata, "uploader") {
                    clauses.push(format!("uploader:{}", uploader));
                }
            }
        }

        clauses.retain(|c| !c.trim().is_empty());
        if clauses.is_empty() {
            None
        } else {
            Some(clauses.join(" OR "))
        }
    }

    /// Ensure `entity` has a query, deriving one if needed.
    ///
    /// An explicit or earlier query always wins and is never replaced.
    pub fn build(&self, entity: &mut Entity) -> Option<String> {
        if let Some(query) = entity.query() {
            return Some(query.to_string());
        }
        let derived = self.derive(entity)?;
        debug!(identifier = ?entity.identifier(), query = %derived, "Derived query");
        Some(entity.memoize_query(derived).to_string())
    }

    /// Query matching exactly the given identifiers.
    pub fn identifier_batch<S: AsRef<str>>(&self, identifiers: &[S]) -> String {
        let joined = identifiers
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<&str>>()
            .join(" OR ");
        format!("identifier:({})", joined)
    }
}
