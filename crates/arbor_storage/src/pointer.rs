//! Storage-independent handles that re-resolve against any storage.

use arbor_foundation::{ClassId, EntityId, Lineage};

use crate::entity::{Entity, EntityView};
use crate::storage::EntityStorage;

/// Remembers an entity id and resolves it against any storage.
///
/// A pointer is not tied to a lineage. Against a storage that removed the
/// entity and later reused its id, it resolves to the new entity.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct EntityPointer {
    id: EntityId,
}

impl EntityPointer {
    /// Creates a pointer to `id`.
    #[must_use]
    pub const fn new(id: EntityId) -> Self {
        Self { id }
    }

    /// Remembered id.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Class of the remembered entity.
    #[must_use]
    pub const fn class(&self) -> ClassId {
        self.id.class
    }

    /// Looks the entity up in `storage`.
    #[must_use]
    pub fn resolve<'a>(&self, storage: &'a dyn EntityStorage) -> Option<EntityView<'a>> {
        storage.entity(self.id)
    }

    /// Returns true if `entity` has the remembered id.
    #[must_use]
    pub fn is_pointer_to(&self, entity: Entity) -> bool {
        entity.id() == self.id
    }
}

/// Like [`EntityPointer`], but only resolves in storages of the lineage it
/// was created in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct EntityReference {
    id: EntityId,
    lineage: Lineage,
}

impl EntityReference {
    /// Creates a reference to an entity handle.
    #[must_use]
    pub const fn new(entity: Entity) -> Self {
        Self {
            id: entity.id(),
            lineage: entity.lineage(),
        }
    }

    /// Remembered id.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Looks the entity up in `storage`, which must share the lineage.
    #[must_use]
    pub fn resolve<'a>(&self, storage: &'a dyn EntityStorage) -> Option<EntityView<'a>> {
        if storage.lineage() != self.lineage {
            return None;
        }
        storage.entity(self.id)
    }

    /// Returns true if `entity` is the remembered handle.
    #[must_use]
    pub fn is_reference_to(&self, entity: Entity) -> bool {
        entity.id() == self.id && entity.lineage() == self.lineage
    }
}
