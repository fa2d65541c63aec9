//! Effective sort order for an entity's search
//!
//! Resolution is a fixed waterfall, highest first:
//! 1. the sort the server recorded on the entity (`collection_sort_order`)
//! 2. the caller's sort
//! 3. the per-identifier table
//! 4. the per-parent table, unless the entity is on the exclude list
//! 5. the account default for accounts
//! 6. the global default
//!
//! The same entity must resolve to the same sort on every request, or
//! pagination would splice pages from different orderings.

use core_runtime::config::SortTables;

use crate::entity::Entity;
use crate::models::Kind;

#[derive(Debug, Clone, Copy)]
pub struct SortPolicy<'a> {
    tables: &'a SortTables,
}

impl<'a> SortPolicy<'a> {
    pub fn new(tables: &'a SortTables) -> Self {
        Self { tables }
    }

    pub fn resolve(&self, entity: &Entity) -> Vec<String> {
        let recorded = entity.collection_sort_order();
        if !recorded.is_empty() {
            return recorded;
        }

        if !entity.sort().is_empty() {
            return entity.sort().to_vec();
        }

        if let Some(identifier) = entity.identifier() {
            if let Some(sort) = self.tables.per_identifier.get(identifier) {
                return vec![sort.clone()];
            }

            let excluded = self.tables.parent_exclude.iter().any(|x| x == identifier);
            if !excluded {
                let parent_sort = entity
                    .collections()
                    .into_iter()
                    .find_map(|parent| self.tables.per_parent.get(parent));
                if let Some(sort) = parent_sort {
                    return vec![sort.clone()];
                }
            }
        }

        if entity.kind() == Kind::Account {
            return vec![self.tables.account_default.clone()];
        }

        vec![self.tables.global_default.clone()]
    }
}
