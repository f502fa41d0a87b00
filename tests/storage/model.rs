//! Project model shared by the storage and reconciliation tests.

#![allow(dead_code)]

use std::sync::Arc;

use arbor_foundation::{ClassId, ConnectionId, ConnectionType, EntitySource, FieldKind, SymbolicEntityId};
use arbor_storage::{
    EntityStorage, EntityTypeRegistry, EntityTypeSchema, FieldSchema, MutableEntityStorage,
    NewEntity,
};

/// Modules own content roots (mandatory) and facets (detachable) and link
/// to libraries by symbolic id.
pub struct Model {
    pub registry: Arc<EntityTypeRegistry>,
    pub module: ClassId,
    pub content_root: ClassId,
    pub facet: ClassId,
    pub library: ClassId,
    pub module_roots: ConnectionId,
    pub module_facets: ConnectionId,
}

pub fn model() -> Model {
    let mut registry = EntityTypeRegistry::new();
    let module = registry
        .register(
            EntityTypeSchema::new("it.Module")
                .with_field(FieldSchema::key("name", FieldKind::String))
                .with_field(FieldSchema::new(
                    "dependencies",
                    FieldKind::list(FieldKind::Symbolic(None)),
                ))
                .with_field(FieldSchema::new("output", FieldKind::optional(FieldKind::String)))
                .with_symbolic_id(&["name"]),
        )
        .unwrap();
    let content_root = registry
        .register(
            EntityTypeSchema::new("it.ContentRoot")
                .with_field(FieldSchema::key("url", FieldKind::String)),
        )
        .unwrap();
    let facet = registry
        .register(
            EntityTypeSchema::new("it.Facet")
                .with_field(FieldSchema::key("name", FieldKind::String))
                .with_field(FieldSchema::new("config", FieldKind::optional(FieldKind::String))),
        )
        .unwrap();
    let library = registry
        .register(
            EntityTypeSchema::new("it.Library")
                .with_field(FieldSchema::key("name", FieldKind::String))
                .with_symbolic_id(&["name"]),
        )
        .unwrap();
    let module_roots = registry
        .connect(module, content_root, ConnectionType::OneToMany, false, true)
        .unwrap();
    let module_facets = registry
        .connect(module, facet, ConnectionType::OneToMany, true, true)
        .unwrap();

    Model {
        registry: Arc::new(registry),
        module,
        content_root,
        facet,
        library,
        module_roots,
        module_facets,
    }
}

pub fn file(path: &str) -> EntitySource {
    EntitySource::config_file(path)
}

impl Model {
    pub fn builder(&self) -> MutableEntityStorage {
        MutableEntityStorage::create(Arc::clone(&self.registry))
    }

    pub fn module(&self, name: &str, source: &EntitySource) -> NewEntity {
        NewEntity::new(self.module, source.clone()).with_field("name", name)
    }

    pub fn content_root(&self, url: &str, source: &EntitySource) -> NewEntity {
        NewEntity::new(self.content_root, source.clone()).with_field("url", url)
    }

    pub fn facet(&self, name: &str, source: &EntitySource) -> NewEntity {
        NewEntity::new(self.facet, source.clone()).with_field("name", name)
    }

    pub fn library(&self, name: &str, source: &EntitySource) -> NewEntity {
        NewEntity::new(self.library, source.clone()).with_field("name", name)
    }

    pub fn module_id(&self, name: &str) -> SymbolicEntityId {
        SymbolicEntityId::named(self.module, name)
    }

    pub fn library_id(&self, name: &str) -> SymbolicEntityId {
        SymbolicEntityId::named(self.library, name)
    }

    /// Sorted values of one string field over all entities of a class.
    pub fn names(&self, storage: &impl EntityStorage, class: ClassId, field: &str) -> Vec<String> {
        let mut names: Vec<String> = storage
            .entities(class)
            .filter_map(|e| e.str_field(field).map(str::to_string))
            .collect();
        names.sort();
        names
    }
}
