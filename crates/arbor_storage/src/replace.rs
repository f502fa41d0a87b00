//! Replacing every entity of some sources with the content of another
//! storage while keeping unchanged entities untouched.
//!
//! Local entities are paired with replacement entities first by symbolic
//! id, then by key fields, then by full field equality. Pairs keep their
//! local id and only record a change if their data differs; unpaired
//! replacement entities are added and unpaired local entities removed.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use arbor_foundation::collections::PersistentBiMapBuilder;
use arbor_foundation::{ClassId, EntityId, EntitySource, Error, Result, Value};

use crate::builder::{MutableEntityStorage, schema_of};
use crate::entity::EntityData;
use crate::refs::EdgeRead;
use crate::registry::EntityTypeRegistry;
use crate::storage::EntityStorage;

type Buckets = HashMap<(ClassId, Vec<Value>), VecDeque<EntityId>>;

/// Replacement entity id -> local entity id.
type Matches = PersistentBiMapBuilder<EntityId, EntityId>;

impl MutableEntityStorage {
    /// Makes the entities whose source satisfies `filter` equal to the
    /// matching entities of `replacement`.
    ///
    /// Parent edges of replaced entities mirror `replacement`. Parents
    /// outside the filter are found by symbolic id, or by id when
    /// `replacement` shares this builder's lineage. Children of a kept
    /// entity that come from other sources are left alone. Calling this
    /// twice with the same arguments changes nothing the second time.
    ///
    /// A dummy parent placeholder in `replacement` never overwrites a real
    /// local entity it pairs with; it only lends its place to its children.
    /// On error the builder is left as it was.
    ///
    /// # Errors
    ///
    /// Returns `ReplaceBySource` if `replacement` holds an entity type this
    /// builder's registry does not know, and `Inconsistent` if the result
    /// fails the strict consistency check.
    pub fn replace_by_source(
        &mut self,
        filter: &dyn Fn(&EntitySource) -> bool,
        replacement: &dyn EntityStorage,
    ) -> Result<()> {
        let registry = Arc::clone(&self.core.registry);
        let incoming = filtered_ids(replacement, filter);
        if let Some(unknown) = incoming.iter().find(|id| !registry.contains(id.class)) {
            return Err(Error::replace_by_source(format!(
                "replacement holds {unknown:?} of an unregistered type"
            )));
        }
        self.bump_modification_count();
        self.atomically(|this| this.replace_filtered(&registry, filter, replacement, &incoming))
    }

    fn replace_filtered(
        &mut self,
        registry: &EntityTypeRegistry,
        filter: &dyn Fn(&EntitySource) -> bool,
        replacement: &dyn EntityStorage,
        incoming: &[EntityId],
    ) -> Result<()> {
        let local = filtered_ids(&*self, filter);
        let matches = self.match_entities(registry, &local, replacement, incoming)?;
        tracing::debug!(
            local = local.len(),
            incoming = incoming.len(),
            matched = matches.len(),
            "replacing by source"
        );

        let mut placed: HashMap<EntityId, EntityId> = HashMap::new();
        // Placeholders matched to a real local entity leave it as it is.
        let mut untouched: HashSet<EntityId> = HashSet::new();
        for id in incoming {
            let Some(data) = replacement.entity_data(*id) else {
                continue;
            };
            let schema = schema_of(registry, id.class)?;
            let data = EntityData::clone(data);
            match matches.get(id).copied() {
                Some(target) if self.core.barrel.contains(target) => {
                    if data.source().is_dummy_parent() && !self.is_placeholder(target) {
                        tracing::debug!(entity = ?target, "keeping real entity over a placeholder");
                        untouched.insert(*id);
                    } else {
                        self.update_data(target, schema, data)?;
                    }
                    placed.insert(*id, target);
                }
                _ => {
                    let added = self.insert_entity(schema, data)?;
                    placed.insert(*id, added);
                }
            }
        }

        let orphans =
            self.mirror_parents(registry, filter, replacement, incoming, &placed, &untouched)?;

        let mut removed = 0;
        for id in local
            .iter()
            .filter(|id| matches.get_key(id).is_none())
            .chain(&orphans)
        {
            if self.core.barrel.contains(*id) {
                removed += self.remove_cascade(*id).len();
            }
        }
        tracing::debug!(removed, orphans = orphans.len(), "replaced by source");

        if self.core.config.strict_consistency {
            self.assert_consistency()
                .map_err(|err| err.in_operation("replace_by_source"))?;
        }
        Ok(())
    }

    fn is_placeholder(&self, id: EntityId) -> bool {
        self.core
            .barrel
            .get(id)
            .is_some_and(|data| data.source().is_dummy_parent())
    }

    fn match_entities(
        &self,
        registry: &EntityTypeRegistry,
        local: &[EntityId],
        replacement: &dyn EntityStorage,
        incoming: &[EntityId],
    ) -> Result<Matches> {
        let mut matches = Matches::new();

        for id in incoming {
            let Some(symbolic) = replacement.entity(*id).and_then(|view| view.symbolic_id()) else {
                continue;
            };
            if let Some(found) = self.core.indexes.resolve(&symbolic) {
                if !matches.contains_value(&found) {
                    matches.put(*id, found)?;
                }
            }
        }

        let by_key = |id: EntityId, data: &EntityData| -> Option<Vec<Value>> {
            let schema = registry.schema(id.class)?;
            let key: Vec<Value> = schema
                .key_indices()
                .filter_map(|i| data.fields().get(i).cloned())
                .collect();
            (!key.is_empty()).then_some(key)
        };
        let by_fields = |_: EntityId, data: &EntityData| Some(data.fields().to_vec());

        for key_of in [&by_key as &dyn Fn(EntityId, &EntityData) -> Option<Vec<Value>>, &by_fields] {
            let mut buckets = self.bucket(local, &matches, key_of);
            for id in incoming {
                if matches.contains_key(id) {
                    continue;
                }
                let Some(key) = replacement.entity_data(*id).and_then(|d| key_of(*id, d)) else {
                    continue;
                };
                let Some(candidates) = buckets.get_mut(&(id.class, key)) else {
                    continue;
                };
                if let Some(found) = candidates.pop_front() {
                    matches.put(*id, found)?;
                }
            }
        }
        Ok(matches)
    }

    fn bucket(
        &self,
        local: &[EntityId],
        matches: &Matches,
        key_of: &dyn Fn(EntityId, &EntityData) -> Option<Vec<Value>>,
    ) -> Buckets {
        let mut buckets = Buckets::new();
        for id in local {
            if matches.contains_value(id) {
                continue;
            }
            if let Some(key) = self.core.barrel.get(*id).and_then(|d| key_of(*id, d)) {
                buckets.entry((id.class, key)).or_default().push_back(*id);
            }
        }
        buckets
    }

    /// Rewires parent edges of placed entities to mirror `replacement`.
    /// Returns entities left without a mandatory parent.
    fn mirror_parents(
        &mut self,
        registry: &EntityTypeRegistry,
        filter: &dyn Fn(&EntitySource) -> bool,
        replacement: &dyn EntityStorage,
        incoming: &[EntityId],
        placed: &HashMap<EntityId, EntityId>,
        untouched: &HashSet<EntityId>,
    ) -> Result<Vec<EntityId>> {
        let mut orphans = Vec::new();
        for id in incoming {
            if untouched.contains(id) {
                continue;
            }
            let Some(&target) = placed.get(id) else {
                continue;
            };
            for connection in registry.connections_as_child(id.class) {
                if !self.core.barrel.contains(target) {
                    break;
                }
                let current = self.core.refs.parent_of(connection, target);
                let wanted = match replacement.parent_id(*id, connection) {
                    Some(parent) => {
                        let resolved = self.resolve_parent(replacement, placed, parent);
                        if resolved.is_none() {
                            tracing::debug!(
                                entity = ?target,
                                parent = ?parent,
                                "parent of a replaced entity does not resolve"
                            );
                        }
                        resolved
                    }
                    None => None,
                };

                match (wanted, current) {
                    (Some(parent), _) if current != Some(parent) => {
                        self.attach(connection, parent, target)?;
                    }
                    (Some(_), _) => {}
                    (None, Some(parent)) => {
                        let filtered = self
                            .core
                            .barrel
                            .get(parent)
                            .is_some_and(|data| filter(data.source()));
                        if filtered && connection.can_remove_parent() {
                            self.detach(connection, target);
                        }
                    }
                    (None, None) => {
                        if !connection.can_remove_parent() {
                            orphans.push(target);
                        }
                    }
                }
            }
        }
        Ok(orphans)
    }

    fn resolve_parent(
        &self,
        replacement: &dyn EntityStorage,
        placed: &HashMap<EntityId, EntityId>,
        parent: EntityId,
    ) -> Option<EntityId> {
        if let Some(target) = placed.get(&parent) {
            return self.core.barrel.contains(*target).then_some(*target);
        }
        if let Some(symbolic) = replacement.entity(parent).and_then(|view| view.symbolic_id()) {
            if let Some(found) = self.core.indexes.resolve(&symbolic) {
                return Some(found);
            }
        }
        (replacement.lineage() == self.core.lineage && self.core.barrel.contains(parent))
            .then_some(parent)
    }
}

/// Ids whose source satisfies `filter`, sorted for deterministic matching.
fn filtered_ids(storage: &dyn EntityStorage, filter: &dyn Fn(&EntitySource) -> bool) -> Vec<EntityId> {
    let mut ids: Vec<EntityId> = storage
        .sources()
        .into_iter()
        .filter(|source| filter(source))
        .flat_map(|source| storage.ids_with_source(&source))
        .collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}
