//! Per-builder change journal.
//!
//! Every mutation records one entry per touched entity. Entries for the
//! same entity are coalesced as they arrive, so the journal always holds
//! the net effect of a session:
//!
//! - add then replace: add with the new data
//! - add then remove: nothing
//! - replace then replace: one replace from the first old to the last new
//!   data, with children and parent edits merged
//! - replace then remove: remove of the first old data
//!
//! A replace that ends where it started, with no edge edits, is dropped.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use arbor_foundation::{ConnectionId, EntityId};

use crate::entity::EntityData;

/// Data and edge edits of one entity.
#[derive(Clone, Debug)]
pub(crate) struct ReplaceEntry {
    pub(crate) old: Arc<EntityData>,
    pub(crate) new: Arc<EntityData>,
    pub(crate) added_children: HashSet<(ConnectionId, EntityId)>,
    pub(crate) removed_children: HashSet<(ConnectionId, EntityId)>,
    pub(crate) parents: HashMap<ConnectionId, Option<EntityId>>,
}

impl ReplaceEntry {
    /// Data-only replace.
    pub(crate) fn data(old: Arc<EntityData>, new: Arc<EntityData>) -> Self {
        Self {
            old,
            new,
            added_children: HashSet::new(),
            removed_children: HashSet::new(),
            parents: HashMap::new(),
        }
    }

    /// Edge-only replace of an entity whose data stays `data`.
    pub(crate) fn edges(data: Arc<EntityData>) -> Self {
        Self::data(data.clone(), data)
    }

    pub(crate) fn source_changed(&self) -> bool {
        self.old.source() != self.new.source()
    }

    pub(crate) fn fields_changed(&self) -> bool {
        !self.old.same_fields(&self.new)
    }

    fn is_noop(&self) -> bool {
        self.old == self.new
            && self.added_children.is_empty()
            && self.removed_children.is_empty()
            && self.parents.is_empty()
    }

    fn merge(&mut self, next: Self) {
        self.new = next.new;
        for child in next.added_children {
            if !self.removed_children.remove(&child) {
                self.added_children.insert(child);
            }
        }
        for child in next.removed_children {
            if !self.added_children.remove(&child) {
                self.removed_children.insert(child);
            }
        }
        self.parents.extend(next.parents);
    }
}

#[derive(Clone, Debug)]
pub(crate) enum ChangeEntry {
    Add { data: Arc<EntityData> },
    Remove { old: Arc<EntityData> },
    Replace(ReplaceEntry),
}

/// Coalesced journal of one builder.
#[derive(Clone, Debug, Default)]
pub(crate) struct ChangeLog {
    entries: HashMap<EntityId, (u64, ChangeEntry)>,
    next_sequence: u64,
}

impl ChangeLog {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn get(&self, id: EntityId) -> Option<&ChangeEntry> {
        self.entries.get(&id).map(|(_, entry)| entry)
    }

    /// Entries in the order their entities were first touched.
    pub(crate) fn ordered(&self) -> Vec<(EntityId, &ChangeEntry)> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .map(|(id, (sequence, entry))| (*sequence, *id, entry))
            .collect();
        entries.sort_by_key(|(sequence, _, _)| *sequence);
        entries.into_iter().map(|(_, id, entry)| (id, entry)).collect()
    }

    pub(crate) fn record_add(&mut self, id: EntityId, data: Arc<EntityData>) {
        self.record(id, ChangeEntry::Add { data });
    }

    pub(crate) fn record_remove(&mut self, id: EntityId, old: Arc<EntityData>) {
        self.record(id, ChangeEntry::Remove { old });
    }

    pub(crate) fn record_replace(&mut self, id: EntityId, entry: ReplaceEntry) {
        self.record(id, ChangeEntry::Replace(entry));
    }

    fn record(&mut self, id: EntityId, incoming: ChangeEntry) {
        let Some((sequence, existing)) = self.entries.remove(&id) else {
            if matches!(&incoming, ChangeEntry::Replace(r) if r.is_noop()) {
                return;
            }
            let sequence = self.next_sequence;
            self.next_sequence += 1;
            self.entries.insert(id, (sequence, incoming));
            return;
        };

        let merged = match (existing, incoming) {
            (ChangeEntry::Add { .. }, ChangeEntry::Replace(next)) => {
                Some(ChangeEntry::Add { data: next.new })
            }
            (ChangeEntry::Add { .. }, ChangeEntry::Remove { .. }) => None,
            (ChangeEntry::Replace(mut previous), ChangeEntry::Replace(next)) => {
                previous.merge(next);
                (!previous.is_noop()).then_some(ChangeEntry::Replace(previous))
            }
            (ChangeEntry::Replace(previous), ChangeEntry::Remove { .. }) => {
                Some(ChangeEntry::Remove { old: previous.old })
            }
            (existing, incoming) => {
                tracing::error!(
                    entity = ?id,
                    existing = entry_kind(&existing),
                    incoming = entry_kind(&incoming),
                    "unexpected journal sequence, keeping the latest entry"
                );
                Some(incoming)
            }
        };
        if let Some(entry) = merged {
            self.entries.insert(id, (sequence, entry));
        }
    }
}

fn entry_kind(entry: &ChangeEntry) -> &'static str {
    match entry {
        ChangeEntry::Add { .. } => "add",
        ChangeEntry::Remove { .. } => "remove",
        ChangeEntry::Replace(_) => "replace",
    }
}
