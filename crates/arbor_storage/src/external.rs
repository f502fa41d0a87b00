//! External mappings: user data attached to entities by name.
//!
//! A mapping associates entities with values of one data type and keeps a
//! reverse index from values back to entities. Mappings are stored by
//! identifier, type-erased, and copied on first write like every other
//! storage part. Entries of removed entities are dropped automatically.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::ops::Deref;
use std::sync::Arc;

use arbor_foundation::collections::BidirectionalMap;
use arbor_foundation::{EntityId, Error, Lineage, Result};

use crate::barrel::EntitiesBarrel;
use crate::entity::Entity;

/// Bound for data stored in an external mapping.
pub trait MappingData: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

impl<T> MappingData for T where T: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

/// Frozen view of one mapping.
#[derive(Clone)]
pub struct ExternalEntityMapping<T: MappingData> {
    data: BidirectionalMap<EntityId, T>,
}

impl<T: MappingData> Default for ExternalEntityMapping<T> {
    fn default() -> Self {
        Self {
            data: BidirectionalMap::new(),
        }
    }
}

impl<T: MappingData> ExternalEntityMapping<T> {
    /// Data attached to an entity.
    #[must_use]
    pub fn get_data_by_entity(&self, entity: EntityId) -> Option<&T> {
        self.data.get(&entity)
    }

    /// Entities carrying `data`.
    #[must_use]
    pub fn get_entities(&self, data: &T) -> &[EntityId] {
        self.data.get_keys(data)
    }

    /// Iterates over `(entity, data)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.data.iter().map(|(id, data)| (*id, data))
    }

    /// Number of mapped entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if nothing is mapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub(crate) fn insert(&mut self, entity: EntityId, data: T) -> Option<T> {
        self.data.insert(entity, data)
    }

    pub(crate) fn remove(&mut self, entity: EntityId) -> Option<T> {
        self.data.remove(&entity)
    }
}

impl<T: MappingData> fmt::Debug for ExternalEntityMapping<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.data.iter()).finish()
    }
}

/// Writable access to one mapping of a builder.
///
/// Obtained from `MutableEntityStorage::mutable_external_mapping`. Read
/// methods are available through [`Deref`].
pub struct MutableExternalEntityMapping<'a, T: MappingData> {
    mapping: &'a mut ExternalEntityMapping<T>,
    barrel: &'a EntitiesBarrel,
    lineage: Lineage,
}

impl<'a, T: MappingData> MutableExternalEntityMapping<'a, T> {
    pub(crate) fn new(
        mapping: &'a mut ExternalEntityMapping<T>,
        barrel: &'a EntitiesBarrel,
        lineage: Lineage,
    ) -> Self {
        Self {
            mapping,
            barrel,
            lineage,
        }
    }

    /// Attaches `data` to an entity, replacing any previous data.
    ///
    /// # Errors
    ///
    /// Returns `ForeignEntity` or `EntityNotFound` for a bad handle.
    pub fn add_mapping(&mut self, entity: Entity, data: T) -> Result<()> {
        let id = self.check_handle(entity)?;
        self.mapping.insert(id, data);
        Ok(())
    }

    /// Attaches `data` unless the entity already has data. Returns true if
    /// it was attached.
    ///
    /// # Errors
    ///
    /// Returns `ForeignEntity` or `EntityNotFound` for a bad handle.
    pub fn add_if_absent(&mut self, entity: Entity, data: T) -> Result<bool> {
        let id = self.check_handle(entity)?;
        if self.mapping.get_data_by_entity(id).is_some() {
            return Ok(false);
        }
        self.mapping.insert(id, data);
        Ok(true)
    }

    /// Data of an entity, attaching `create()` first if it has none.
    ///
    /// # Errors
    ///
    /// Returns `ForeignEntity` or `EntityNotFound` for a bad handle.
    pub fn get_or_put_data_by_entity(
        &mut self,
        entity: Entity,
        create: impl FnOnce() -> T,
    ) -> Result<T> {
        let id = self.check_handle(entity)?;
        if let Some(data) = self.mapping.get_data_by_entity(id) {
            return Ok(data.clone());
        }
        let data = create();
        self.mapping.insert(id, data.clone());
        Ok(data)
    }

    /// Detaches the data of an entity.
    pub fn remove_mapping(&mut self, entity: Entity) -> Option<T> {
        if entity.lineage() != self.lineage {
            return None;
        }
        self.mapping.remove(entity.id())
    }

    fn check_handle(&self, entity: Entity) -> Result<EntityId> {
        if entity.lineage() != self.lineage {
            return Err(Error::foreign_entity(entity.id()));
        }
        if !self.barrel.contains(entity.id()) {
            return Err(Error::entity_not_found(entity.id()));
        }
        Ok(entity.id())
    }
}

impl<T: MappingData> Deref for MutableExternalEntityMapping<'_, T> {
    type Target = ExternalEntityMapping<T>;

    fn deref(&self) -> &Self::Target {
        self.mapping
    }
}

impl<T: MappingData> fmt::Debug for MutableExternalEntityMapping<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.mapping.fmt(f)
    }
}

/// Type-erased mapping operations the storage needs without knowing `T`.
pub(crate) trait ErasedMapping: Send + Sync {
    fn clone_box(&self) -> Box<dyn ErasedMapping>;
    fn empty_box(&self) -> Box<dyn ErasedMapping>;
    fn remove_entity(&mut self, entity: EntityId) -> bool;
    fn contains_entity(&self, entity: EntityId) -> bool;
    /// Copies the entry of `from` into `target` under `to`. `target` must
    /// hold the same data type.
    fn copy_entry(&self, from: EntityId, target: &mut dyn ErasedMapping, to: EntityId);
    fn mapped_entities(&self) -> Vec<EntityId>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: MappingData> ErasedMapping for ExternalEntityMapping<T> {
    fn clone_box(&self) -> Box<dyn ErasedMapping> {
        Box::new(self.clone())
    }

    fn empty_box(&self) -> Box<dyn ErasedMapping> {
        Box::new(Self::default())
    }

    fn remove_entity(&mut self, entity: EntityId) -> bool {
        self.remove(entity).is_some()
    }

    fn contains_entity(&self, entity: EntityId) -> bool {
        self.data.contains_key(&entity)
    }

    fn copy_entry(&self, from: EntityId, target: &mut dyn ErasedMapping, to: EntityId) {
        let Some(data) = self.data.get(&from) else {
            return;
        };
        if let Some(target) = target.as_any_mut().downcast_mut::<Self>() {
            target.insert(to, data.clone());
        }
    }

    fn mapped_entities(&self) -> Vec<EntityId> {
        self.data.keys().copied().collect()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

struct MappingBox(Box<dyn ErasedMapping>);

impl Clone for MappingBox {
    fn clone(&self) -> Self {
        Self(self.0.clone_box())
    }
}

/// All mappings of a storage, by identifier.
#[derive(Clone, Default)]
pub(crate) struct ExternalMappings {
    mappings: HashMap<Arc<str>, Arc<MappingBox>>,
}

impl ExternalMappings {
    pub(crate) fn get(&self, identifier: &str) -> Option<&dyn ErasedMapping> {
        self.mappings.get(identifier).map(|m| m.0.as_ref())
    }

    pub(crate) fn identifiers(&self) -> impl Iterator<Item = &Arc<str>> {
        self.mappings.keys()
    }

    /// Writable access to a mapping, creating it with `create` if absent and
    /// copying it if shared.
    pub(crate) fn get_mut_or_insert(
        &mut self,
        identifier: &str,
        create: impl FnOnce() -> Box<dyn ErasedMapping>,
    ) -> &mut dyn ErasedMapping {
        let slot = self
            .mappings
            .entry(identifier.into())
            .or_insert_with(|| Arc::new(MappingBox(create())));
        Arc::make_mut(slot).0.as_mut()
    }

    pub(crate) fn remove(&mut self, identifier: &str) -> bool {
        self.mappings.remove(identifier).is_some()
    }

    pub(crate) fn contains_entity(&self, entity: EntityId) -> bool {
        self.mappings.values().any(|slot| slot.0.contains_entity(entity))
    }

    /// Drops the entity from every mapping that holds it.
    pub(crate) fn remove_entity(&mut self, entity: EntityId) {
        for slot in self.mappings.values_mut() {
            if slot.0.contains_entity(entity) {
                Arc::make_mut(slot).0.remove_entity(entity);
            }
        }
    }
}

impl fmt::Debug for ExternalMappings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.mappings.keys()).finish()
    }
}
