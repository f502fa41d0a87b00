//! Read interface shared by snapshots and builders.

use std::any::Any;
use std::sync::Arc;

use arbor_foundation::{
    ClassId, ConnectionId, EntityId, EntitySource, Lineage, SymbolicEntityId,
};

use crate::barrel::EntitiesBarrel;
use crate::config::StoreConfig;
use crate::entity::{EntityData, EntityView};
use crate::external::{ExternalEntityMapping, ExternalMappings, MappingData};
use crate::indexes::StorageIndexes;
use crate::refs::EdgeRead;
use crate::registry::EntityTypeRegistry;

/// Read access to an entity storage.
///
/// The required methods are id-level primitives. The provided methods build
/// [`EntityView`]s on top of them and are what most callers use. Sequences
/// are unordered.
pub trait EntityStorage: Send + Sync {
    /// Type registry the storage was created with.
    fn registry(&self) -> &EntityTypeRegistry;

    /// Lineage of the storage.
    fn lineage(&self) -> Lineage;

    /// Upcast used by provided methods to bind views.
    fn as_dyn(&self) -> &dyn EntityStorage;

    /// Data of a live entity.
    fn entity_data(&self, id: EntityId) -> Option<&Arc<EntityData>>;

    /// Ids of live entities of a class.
    fn entity_ids(&self, class: ClassId) -> Box<dyn Iterator<Item = EntityId> + '_>;

    /// Number of live entities of a class.
    fn entity_count(&self, class: ClassId) -> usize;

    /// Entity holding a symbolic id.
    fn resolve_id(&self, id: &SymbolicEntityId) -> Option<EntityId>;

    /// Entities whose fields contain a soft link to `id`.
    fn referrer_ids(&self, id: &SymbolicEntityId) -> Vec<EntityId>;

    /// Distinct sources of live entities.
    fn sources(&self) -> Vec<EntitySource>;

    /// Entities carrying exactly `source`.
    fn ids_with_source(&self, source: &EntitySource) -> Vec<EntityId>;

    /// Parent of `child` on `connection`.
    fn parent_id(&self, child: EntityId, connection: ConnectionId) -> Option<EntityId>;

    /// Children of `parent` on `connection`.
    fn child_ids(&self, parent: EntityId, connection: ConnectionId) -> Vec<EntityId>;

    /// Type-erased external mapping by identifier.
    fn mapping_any(&self, identifier: &str) -> Option<&dyn Any>;

    /// Identifiers of every external mapping.
    fn mapping_identifiers(&self) -> Vec<Arc<str>>;

    /// Looks up a live entity.
    fn entity(&self, id: EntityId) -> Option<EntityView<'_>> {
        let data = self.entity_data(id)?;
        let schema = self.registry().schema(id.class)?;
        Some(EntityView::new(self.as_dyn(), id, data, schema))
    }

    /// Returns true if the entity is live.
    fn has_entity(&self, id: EntityId) -> bool {
        self.entity_data(id).is_some()
    }

    /// Live entities of a class.
    fn entities(&self, class: ClassId) -> Box<dyn Iterator<Item = EntityView<'_>> + '_> {
        Box::new(self.entity_ids(class).filter_map(move |id| self.entity(id)))
    }

    /// Resolves a symbolic id.
    fn resolve(&self, id: &SymbolicEntityId) -> Option<EntityView<'_>> {
        self.resolve_id(id).and_then(|e| self.entity(e))
    }

    /// Returns true if an entity holds the symbolic id.
    fn contains(&self, id: &SymbolicEntityId) -> bool {
        self.resolve_id(id).is_some()
    }

    /// Entities of `class` whose fields refer to `id`.
    fn referrers(&self, id: &SymbolicEntityId, class: ClassId) -> Vec<EntityView<'_>> {
        self.referrer_ids(id)
            .into_iter()
            .filter(|e| self.registry().is_a(e.class, class))
            .filter_map(|e| self.entity(e))
            .collect()
    }

    /// Live entities whose source satisfies `filter`.
    fn entities_by_source<'a>(
        &'a self,
        filter: &'a dyn Fn(&EntitySource) -> bool,
    ) -> Box<dyn Iterator<Item = EntityView<'a>> + 'a> {
        Box::new(
            self.sources()
                .into_iter()
                .filter(move |s| filter(s))
                .flat_map(move |s| self.ids_with_source(&s))
                .filter_map(move |id| self.entity(id)),
        )
    }

    /// Parent of an entity on `connection`.
    fn parent_of(&self, entity: EntityId, connection: ConnectionId) -> Option<EntityView<'_>> {
        self.parent_id(entity, connection).and_then(|p| self.entity(p))
    }

    /// Children of an entity on `connection`.
    fn children_of(&self, entity: EntityId, connection: ConnectionId) -> Vec<EntityView<'_>> {
        self.child_ids(entity, connection)
            .into_iter()
            .filter_map(|c| self.entity(c))
            .collect()
    }

    /// Typed external mapping by identifier.
    ///
    /// Returns `None` if no mapping has that identifier or it holds a
    /// different data type.
    fn external_mapping<T: MappingData>(&self, identifier: &str) -> Option<&ExternalEntityMapping<T>>
    where
        Self: Sized,
    {
        self.mapping_any(identifier)?.downcast_ref()
    }
}

/// Parts shared by snapshots and builders. `R` is the edge table: frozen
/// in snapshots, writable in builders.
#[derive(Clone, Debug)]
pub(crate) struct StorageCore<R> {
    pub(crate) registry: Arc<EntityTypeRegistry>,
    pub(crate) config: StoreConfig,
    pub(crate) lineage: Lineage,
    pub(crate) barrel: Arc<EntitiesBarrel>,
    pub(crate) refs: R,
    pub(crate) indexes: Arc<StorageIndexes>,
    pub(crate) mappings: Arc<ExternalMappings>,
}

impl<R: EdgeRead> StorageCore<R> {
    pub(crate) fn entity_data(&self, id: EntityId) -> Option<&Arc<EntityData>> {
        self.barrel.get(id)
    }

    pub(crate) fn entity_ids(&self, class: ClassId) -> Box<dyn Iterator<Item = EntityId> + '_> {
        self.barrel.ids(class)
    }

    pub(crate) fn entity_count(&self, class: ClassId) -> usize {
        self.barrel.count(class)
    }

    pub(crate) fn resolve_id(&self, id: &SymbolicEntityId) -> Option<EntityId> {
        self.indexes.resolve(id)
    }

    pub(crate) fn referrer_ids(&self, id: &SymbolicEntityId) -> Vec<EntityId> {
        self.indexes.referrers(id)
    }

    pub(crate) fn sources(&self) -> Vec<EntitySource> {
        self.indexes.sources().cloned().collect()
    }

    pub(crate) fn ids_with_source(&self, source: &EntitySource) -> Vec<EntityId> {
        self.indexes.with_source(source).to_vec()
    }

    pub(crate) fn parent_id(&self, child: EntityId, connection: ConnectionId) -> Option<EntityId> {
        self.refs.parent_of(connection, child)
    }

    pub(crate) fn child_ids(&self, parent: EntityId, connection: ConnectionId) -> Vec<EntityId> {
        self.refs.children_of(connection, parent)
    }

    pub(crate) fn mapping_any(&self, identifier: &str) -> Option<&dyn Any> {
        self.mappings.get(identifier).map(|m| m.as_any())
    }

    pub(crate) fn mapping_identifiers(&self) -> Vec<Arc<str>> {
        self.mappings.identifiers().cloned().collect()
    }
}

/// Implements [`EntityStorage`] for a type with a `core: StorageCore<_>`
/// field.
macro_rules! delegate_entity_storage {
    ($ty:ty) => {
        impl $crate::storage::EntityStorage for $ty {
            fn registry(&self) -> &$crate::registry::EntityTypeRegistry {
                &self.core.registry
            }

            fn lineage(&self) -> arbor_foundation::Lineage {
                self.core.lineage
            }

            fn as_dyn(&self) -> &dyn $crate::storage::EntityStorage {
                self
            }

            fn entity_data(
                &self,
                id: arbor_foundation::EntityId,
            ) -> Option<&std::sync::Arc<$crate::entity::EntityData>> {
                self.core.entity_data(id)
            }

            fn entity_ids(
                &self,
                class: arbor_foundation::ClassId,
            ) -> Box<dyn Iterator<Item = arbor_foundation::EntityId> + '_> {
                self.core.entity_ids(class)
            }

            fn entity_count(&self, class: arbor_foundation::ClassId) -> usize {
                self.core.entity_count(class)
            }

            fn resolve_id(
                &self,
                id: &arbor_foundation::SymbolicEntityId,
            ) -> Option<arbor_foundation::EntityId> {
                self.core.resolve_id(id)
            }

            fn referrer_ids(
                &self,
                id: &arbor_foundation::SymbolicEntityId,
            ) -> Vec<arbor_foundation::EntityId> {
                self.core.referrer_ids(id)
            }

            fn sources(&self) -> Vec<arbor_foundation::EntitySource> {
                self.core.sources()
            }

            fn ids_with_source(
                &self,
                source: &arbor_foundation::EntitySource,
            ) -> Vec<arbor_foundation::EntityId> {
                self.core.ids_with_source(source)
            }

            fn parent_id(
                &self,
                child: arbor_foundation::EntityId,
                connection: arbor_foundation::ConnectionId,
            ) -> Option<arbor_foundation::EntityId> {
                self.core.parent_id(child, connection)
            }

            fn child_ids(
                &self,
                parent: arbor_foundation::EntityId,
                connection: arbor_foundation::ConnectionId,
            ) -> Vec<arbor_foundation::EntityId> {
                self.core.child_ids(parent, connection)
            }

            fn mapping_any(&self, identifier: &str) -> Option<&dyn std::any::Any> {
                self.core.mapping_any(identifier)
            }

            fn mapping_identifiers(&self) -> Vec<std::sync::Arc<str>> {
                self.core.mapping_identifiers()
            }
        }
    };
}

pub(crate) use delegate_entity_storage;
