//! Detecting journals whose changes cancel out.
//!
//! Removing an entity and adding an equal one back records a remove and an
//! add under different ids. Such pairs describe the same entity when their
//! data is equal and they sit under the same parents, where a parent may
//! itself be such a pair.

use std::collections::{HashMap, HashSet};

use arbor_foundation::EntityId;

use crate::builder::MutableEntityStorage;
use crate::entity::EntityData;
use crate::journal::ChangeEntry;
use crate::refs::EdgeRead;

impl MutableEntityStorage {
    /// Returns true if the entities equal those the journal started from.
    ///
    /// Unlike [`has_changes`](Self::has_changes), an entity that was
    /// removed and added back with the same data under the same parents
    /// counts as unchanged. Entities that carry external mapping entries
    /// never collapse.
    #[must_use]
    pub fn has_same_entities(&self) -> bool {
        if self.journal.is_empty() {
            return true;
        }
        let entries = self.journal.ordered();

        let mut adds: Vec<(EntityId, &EntityData)> = Vec::new();
        let mut removes: HashMap<&EntityData, Vec<EntityId>> = HashMap::new();
        for (id, entry) in &entries {
            match entry {
                ChangeEntry::Add { data } => adds.push((*id, &**data)),
                ChangeEntry::Remove { old } => removes.entry(&**old).or_default().push(*id),
                ChangeEntry::Replace(_) => {}
            }
        }

        let mut pairs: HashMap<EntityId, EntityId> = HashMap::new();
        for (added, data) in adds {
            if removes.is_empty() {
                break;
            }
            if self.core.mappings.contains_entity(added) {
                continue;
            }
            let Some(candidates) = removes.get_mut(data) else {
                continue;
            };
            let Some(position) = candidates
                .iter()
                .position(|removed| self.same_place(added, *removed))
            else {
                continue;
            };
            let removed = candidates[position];
            if self.origin.mappings.contains_entity(removed) {
                continue;
            }
            candidates.swap_remove(position);
            if candidates.is_empty() {
                removes.remove(data);
            }
            pairs.insert(added, removed);
        }

        let paired_removals: HashSet<EntityId> = pairs.values().copied().collect();
        entries.iter().all(|(id, entry)| match entry {
            ChangeEntry::Add { .. } => pairs.contains_key(id),
            ChangeEntry::Remove { .. } => paired_removals.contains(id),
            ChangeEntry::Replace(replace) => {
                replace.old == replace.new
                    && replace.parents.is_empty()
                    && replace
                        .added_children
                        .iter()
                        .all(|(_, child)| pairs.contains_key(child))
                    && replace
                        .removed_children
                        .iter()
                        .all(|(_, child)| paired_removals.contains(child))
            }
        })
    }

    /// Returns true if `added` now sits where `removed` sat originally.
    fn same_place(&self, added: EntityId, removed: EntityId) -> bool {
        if added == removed {
            return true;
        }
        if added.class != removed.class {
            return false;
        }
        self.core
            .registry
            .connections_as_child(added.class)
            .all(|connection| {
                let now = self.core.refs.parent_of(connection, added);
                let before = self.origin.refs.parent_of(connection, removed);
                match (now, before) {
                    (None, None) => true,
                    (Some(now), Some(before)) if now == before => true,
                    (Some(now), Some(before)) => {
                        matches!(self.journal.get(now), Some(ChangeEntry::Add { .. }))
                            && matches!(self.journal.get(before), Some(ChangeEntry::Remove { .. }))
                            && self.same_place(now, before)
                    }
                    _ => false,
                }
            })
    }
}
