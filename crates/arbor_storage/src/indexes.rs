//! Secondary indexes: entities by source, by symbolic id, and by the
//! symbolic ids their fields refer to.

use arbor_foundation::collections::{BidirectionalMap, BidirectionalMultiMap};
use arbor_foundation::{EntityId, EntitySource, SymbolicEntityId};

use crate::entity::EntityData;
use crate::registry::EntityTypeSchema;

#[derive(Clone, Debug, Default)]
pub(crate) struct StorageIndexes {
    sources: BidirectionalMap<EntityId, EntitySource>,
    symbolic: BidirectionalMap<EntityId, SymbolicEntityId>,
    soft_links: BidirectionalMultiMap<EntityId, SymbolicEntityId>,
}

impl StorageIndexes {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Indexes a newly stored entity.
    pub(crate) fn index(&mut self, id: EntityId, data: &EntityData, schema: &EntityTypeSchema) {
        self.sources.insert(id, data.source().clone());
        if let Some(symbolic) = schema.symbolic_id_of(data.fields()) {
            self.symbolic.insert(id, symbolic);
        }
        for link in data.soft_links() {
            self.soft_links.put(id, link);
        }
    }

    /// Drops every index entry of an entity.
    pub(crate) fn unindex(&mut self, id: EntityId) {
        self.sources.remove(&id);
        self.symbolic.remove(&id);
        self.soft_links.remove_key(&id);
    }

    /// Re-indexes an entity whose data changed.
    pub(crate) fn reindex(&mut self, id: EntityId, data: &EntityData, schema: &EntityTypeSchema) {
        self.unindex(id);
        self.index(id, data, schema);
    }

    pub(crate) fn source_of(&self, id: EntityId) -> Option<&EntitySource> {
        self.sources.get(&id)
    }

    pub(crate) fn with_source(&self, source: &EntitySource) -> &[EntityId] {
        self.sources.get_keys(source)
    }

    pub(crate) fn sources(&self) -> impl Iterator<Item = &EntitySource> {
        let mut seen = Vec::new();
        self.sources.values().filter(move |s| {
            if seen.contains(s) {
                false
            } else {
                seen.push(*s);
                true
            }
        })
    }

    pub(crate) fn symbolic_of(&self, id: EntityId) -> Option<&SymbolicEntityId> {
        self.symbolic.get(&id)
    }

    /// Entity holding a symbolic id. Holders are unique in a consistent
    /// storage.
    pub(crate) fn resolve(&self, symbolic: &SymbolicEntityId) -> Option<EntityId> {
        self.symbolic.get_keys(symbolic).first().copied()
    }

    pub(crate) fn referrers(&self, symbolic: &SymbolicEntityId) -> Vec<EntityId> {
        self.soft_links.get_keys(symbolic).copied().collect()
    }

    pub(crate) fn soft_links_of(&self, id: EntityId) -> Vec<SymbolicEntityId> {
        self.soft_links.get_values(&id).cloned().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.sources.len()
    }
}
