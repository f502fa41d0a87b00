//! Mapping cached type names back to classes.

use arbor_foundation::{ClassId, intern};
use arbor_storage::{EntityTypeRegistry, TypeRecord};

/// Finds the class for a type stored in a cache file.
///
/// Cache files name types rather than storing class ids, so loading one
/// needs to know which types exist now and where they come from.
pub trait TypeResolver {
    /// Returns the class registered as `name`, or `None` if the type is not
    /// available (unknown name, or declared by a different plugin or module
    /// than the cache recorded).
    fn resolve_class(
        &self,
        name: &str,
        plugin_id: Option<&str>,
        module_id: Option<&str>,
    ) -> Option<ClassId>;

    /// Returns the class of an abstract family. Families carry no origin.
    fn resolve_family(&self, name: &str) -> Option<ClassId>;
}

/// Resolves types against the registry the storage will use.
#[derive(Clone, Copy, Debug)]
pub struct RegistryTypeResolver<'a> {
    registry: &'a EntityTypeRegistry,
}

impl<'a> RegistryTypeResolver<'a> {
    /// Creates a resolver for `registry`.
    #[must_use]
    pub const fn new(registry: &'a EntityTypeRegistry) -> Self {
        Self { registry }
    }
}

impl TypeResolver for RegistryTypeResolver<'_> {
    fn resolve_class(
        &self,
        name: &str,
        plugin_id: Option<&str>,
        module_id: Option<&str>,
    ) -> Option<ClassId> {
        let schema = self.registry.schema_by_name(name)?;
        let same_origin = schema.plugin_id.as_deref() == plugin_id
            && schema.module_id.as_deref() == module_id;
        same_origin.then_some(schema.class)
    }

    fn resolve_family(&self, name: &str) -> Option<ClassId> {
        intern::find_class_id(name).filter(|class| self.registry.is_family(*class))
    }
}

/// Dispatches a dump type record to the matching resolver method.
pub(crate) fn resolve_record(resolver: &dyn TypeResolver, record: &TypeRecord) -> Option<ClassId> {
    if record.is_family {
        resolver.resolve_family(&record.name)
    } else {
        resolver.resolve_class(
            &record.name,
            record.plugin_id.as_deref(),
            record.module_id.as_deref(),
        )
    }
}
