//! Shared entity model for unit tests.

use std::sync::Arc;

use arbor_foundation::{ClassId, ConnectionId, ConnectionType, EntitySource, FieldKind};

use crate::entity::NewEntity;
use crate::registry::{EntityTypeRegistry, EntityTypeSchema, FieldSchema};

/// A small project model: modules own content roots (mandatory), facets
/// (detachable), and one settings entity; content roots own source roots;
/// artifacts own elements of an abstract family.
pub(crate) struct Model {
    pub(crate) registry: Arc<EntityTypeRegistry>,
    pub(crate) module: ClassId,
    pub(crate) content_root: ClassId,
    pub(crate) source_root: ClassId,
    pub(crate) facet: ClassId,
    pub(crate) settings: ClassId,
    pub(crate) library: ClassId,
    pub(crate) artifact: ClassId,
    pub(crate) file_element: ClassId,
    pub(crate) module_roots: ConnectionId,
    pub(crate) root_sources: ConnectionId,
    pub(crate) module_facets: ConnectionId,
    pub(crate) module_settings: ConnectionId,
    pub(crate) artifact_elements: ConnectionId,
}

pub(crate) fn model() -> Model {
    let mut registry = EntityTypeRegistry::new();
    let module = registry
        .register(
            EntityTypeSchema::new("test.Module")
                .with_field(FieldSchema::key("name", FieldKind::String))
                .with_field(FieldSchema::new(
                    "dependencies",
                    FieldKind::list(FieldKind::Symbolic(None)),
                ))
                .with_symbolic_id(&["name"]),
        )
        .unwrap();
    let content_root = registry
        .register(
            EntityTypeSchema::new("test.ContentRoot")
                .with_field(FieldSchema::key("url", FieldKind::String))
                .with_field(FieldSchema::new("excluded", FieldKind::list(FieldKind::String))),
        )
        .unwrap();
    let source_root = registry
        .register(
            EntityTypeSchema::new("test.SourceRoot")
                .with_field(FieldSchema::key("url", FieldKind::String))
                .with_field(FieldSchema::new("generated", FieldKind::optional(FieldKind::Bool))),
        )
        .unwrap();
    let facet = registry
        .register(
            EntityTypeSchema::new("test.Facet")
                .with_field(FieldSchema::key("name", FieldKind::String))
                .with_field(FieldSchema::new("config", FieldKind::optional(FieldKind::String))),
        )
        .unwrap();
    let settings = registry
        .register(
            EntityTypeSchema::new("test.ModuleSettings")
                .with_field(FieldSchema::new("output", FieldKind::optional(FieldKind::String))),
        )
        .unwrap();
    let library = registry
        .register(
            EntityTypeSchema::new("test.Library")
                .with_field(FieldSchema::key("name", FieldKind::String))
                .with_field(FieldSchema::new("roots", FieldKind::list(FieldKind::String)))
                .with_symbolic_id(&["name"]),
        )
        .unwrap();
    let artifact = registry
        .register(
            EntityTypeSchema::new("test.Artifact")
                .with_field(FieldSchema::key("name", FieldKind::String))
                .with_symbolic_id(&["name"]),
        )
        .unwrap();
    let file_element = registry
        .register(
            EntityTypeSchema::new("test.FileElement")
                .with_field(FieldSchema::key("path", FieldKind::String))
                .in_family("test.Element"),
        )
        .unwrap();
    let element_family = arbor_foundation::intern::class_id("test.Element");

    let module_roots = registry
        .connect(module, content_root, ConnectionType::OneToMany, false, true)
        .unwrap();
    let root_sources = registry
        .connect(content_root, source_root, ConnectionType::OneToMany, false, true)
        .unwrap();
    let module_facets = registry
        .connect(module, facet, ConnectionType::OneToMany, true, true)
        .unwrap();
    let module_settings = registry
        .connect(module, settings, ConnectionType::OneToOne, false, true)
        .unwrap();
    let artifact_elements = registry
        .connect(
            artifact,
            element_family,
            ConnectionType::OneToAbstractMany,
            true,
            true,
        )
        .unwrap();

    Model {
        registry: Arc::new(registry),
        module,
        content_root,
        source_root,
        facet,
        settings,
        library,
        artifact,
        file_element,
        module_roots,
        root_sources,
        module_facets,
        module_settings,
        artifact_elements,
    }
}

pub(crate) fn source(path: &str) -> EntitySource {
    EntitySource::config_file(path)
}

impl Model {
    pub(crate) fn module(&self, name: &str, source: &EntitySource) -> NewEntity {
        NewEntity::new(self.module, source.clone()).with_field("name", name)
    }

    pub(crate) fn content_root(&self, url: &str, source: &EntitySource) -> NewEntity {
        NewEntity::new(self.content_root, source.clone()).with_field("url", url)
    }

    pub(crate) fn source_root(&self, url: &str, source: &EntitySource) -> NewEntity {
        NewEntity::new(self.source_root, source.clone()).with_field("url", url)
    }

    pub(crate) fn facet(&self, name: &str, source: &EntitySource) -> NewEntity {
        NewEntity::new(self.facet, source.clone()).with_field("name", name)
    }

    pub(crate) fn library(&self, name: &str, source: &EntitySource) -> NewEntity {
        NewEntity::new(self.library, source.clone()).with_field("name", name)
    }

    pub(crate) fn artifact(&self, name: &str, source: &EntitySource) -> NewEntity {
        NewEntity::new(self.artifact, source.clone()).with_field("name", name)
    }

    pub(crate) fn file_element(&self, path: &str, source: &EntitySource) -> NewEntity {
        NewEntity::new(self.file_element, source.clone()).with_field("path", path)
    }
}
