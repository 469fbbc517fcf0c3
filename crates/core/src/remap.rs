//! Old-id to new-id lookup built up while cloning an aggregate.

use std::collections::HashMap;

use crate::types::EntityId;

/// Maps the id of a source sub-entity to the id of its clone.
#[derive(Debug, Clone, Default)]
pub struct IdRemapTable {
    entries: HashMap<EntityId, EntityId>,
}

impl IdRemapTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `old` was recreated as `new`. A later insert for the same
    /// `old` id replaces the earlier one.
    pub fn insert(&mut self, old: EntityId, new: EntityId) {
        self.entries.insert(old, new);
    }

    pub fn get(&self, old: &EntityId) -> Option<EntityId> {
        self.entries.get(old).copied()
    }

    /// Rewrite `ids`, keeping order. Returns the resolved ids and the source
    /// ids that had no entry.
    pub fn remap_all(&self, ids: &[EntityId]) -> (Vec<EntityId>, Vec<EntityId>) {
        let mut resolved = Vec::with_capacity(ids.len());
        let mut dropped = Vec::new();
        for id in ids {
            match self.get(id) {
                Some(new_id) => resolved.push(new_id),
                None => dropped.push(*id),
            }
        }
        (resolved, dropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::new_id;

    #[test]
    fn remap_all_keeps_order_and_reports_unresolved() {
        let (a, b, missing) = (new_id(), new_id(), new_id());
        let (a2, b2) = (new_id(), new_id());
        let mut table = IdRemapTable::new();
        table.insert(a, a2);
        table.insert(b, b2);

        let (resolved, dropped) = table.remap_all(&[b, missing, a]);
        assert_eq!(resolved, vec![b2, a2]);
        assert_eq!(dropped, vec![missing]);
    }

    #[test]
    fn empty_table_resolves_nothing() {
        let table = IdRemapTable::new();
        let id = new_id();
        assert_eq!(table.get(&id), None);
        assert_eq!(table.remap_all(&[id]), (vec![], vec![id]));
    }
}
