//! Entity type schemas and the registry of declared connections.
//!
//! A registry is built once, up front, and shared by every storage that
//! uses it. It maps each [`ClassId`] to a field layout, records which
//! abstract families a class belongs to, and lists the parent/child
//! connections that may exist between classes.

use std::collections::HashMap;
use std::sync::Arc;

use arbor_foundation::{
    ClassId, ConnectionId, ConnectionType, Error, ErrorKind, FieldKind, Result, SymbolicEntityId,
    Value, intern,
};

/// Schema definition for one entity field.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldSchema {
    /// Field name.
    pub name: Arc<str>,
    /// Accepted values.
    pub kind: FieldKind,
    /// Key fields identify an entity during replace-by-source matching.
    pub is_key: bool,
}

impl FieldSchema {
    /// Creates a plain field.
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            is_key: false,
        }
    }

    /// Creates a key field.
    #[must_use]
    pub fn key(name: impl Into<Arc<str>>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            is_key: true,
        }
    }
}

/// Schema definition for an entity type.
#[derive(Clone, Debug, PartialEq)]
pub struct EntityTypeSchema {
    /// Interned class of the type.
    pub class: ClassId,
    /// Type name, as passed to [`EntityTypeSchema::new`].
    pub name: Arc<str>,
    /// Field layout. Entity data stores values in this order.
    pub fields: Vec<FieldSchema>,
    /// Abstract families this type belongs to.
    pub families: Vec<ClassId>,
    /// Plugin that declares the type, used when resolving cached data.
    pub plugin_id: Option<Arc<str>>,
    /// Module that declares the type, used when resolving cached data.
    pub module_id: Option<Arc<str>>,
    symbolic_fields: Vec<Arc<str>>,
    symbolic_indices: Vec<usize>,
}

impl EntityTypeSchema {
    /// Creates a schema for `name`, interning the class.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            class: intern::class_id(name),
            name: name.into(),
            fields: Vec::new(),
            families: Vec::new(),
            plugin_id: None,
            module_id: None,
            symbolic_fields: Vec::new(),
            symbolic_indices: Vec::new(),
        }
    }

    /// Adds a field to the schema.
    #[must_use]
    pub fn with_field(mut self, field: FieldSchema) -> Self {
        self.fields.push(field);
        self
    }

    /// Declares the fields whose values form the type's symbolic id.
    ///
    /// Resolved against the field layout when the schema is registered.
    #[must_use]
    pub fn with_symbolic_id(mut self, fields: &[&str]) -> Self {
        self.symbolic_fields = fields.iter().map(|f| Arc::from(*f)).collect();
        self
    }

    /// Places the type in an abstract family.
    #[must_use]
    pub fn in_family(mut self, family: &str) -> Self {
        let family = intern::class_id(family);
        if !self.families.contains(&family) {
            self.families.push(family);
        }
        self
    }

    /// Records the plugin and module that declare the type.
    #[must_use]
    pub fn with_origin(mut self, plugin_id: &str, module_id: &str) -> Self {
        self.plugin_id = Some(plugin_id.into());
        self.module_id = Some(module_id.into());
        self
    }

    /// Returns the position of a field in the layout.
    #[must_use]
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| &*f.name == name)
    }

    /// Returns the field schema by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| &*f.name == name)
    }

    /// Returns true if the type has a symbolic id.
    #[must_use]
    pub fn has_symbolic_id(&self) -> bool {
        !self.symbolic_indices.is_empty()
    }

    /// Positions of the key fields.
    pub fn key_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.is_key)
            .map(|(i, _)| i)
    }

    /// Computes the symbolic id of an entity with the given field values.
    #[must_use]
    pub fn symbolic_id_of(&self, values: &[Value]) -> Option<SymbolicEntityId> {
        if self.symbolic_indices.is_empty() {
            return None;
        }
        let parts = self
            .symbolic_indices
            .iter()
            .map(|&i| values.get(i).cloned().unwrap_or(Value::Null))
            .collect();
        Some(SymbolicEntityId::new(self.class, parts))
    }

    /// Returns true if the type is `class` or belongs to the family `class`.
    #[must_use]
    pub fn is_a(&self, class: ClassId) -> bool {
        self.class == class || self.families.contains(&class)
    }

    fn resolve_symbolic_fields(&mut self) -> Result<()> {
        let mut indices = Vec::with_capacity(self.symbolic_fields.len());
        for name in &self.symbolic_fields {
            let index = self.field_index(name).ok_or_else(|| {
                Error::new(ErrorKind::UnknownField {
                    class: self.class,
                    field: name.to_string(),
                })
            })?;
            indices.push(index);
        }
        self.symbolic_indices = indices;
        Ok(())
    }
}

/// Registry of entity types and the connections between them.
#[derive(Clone, Debug, Default)]
pub struct EntityTypeRegistry {
    types: HashMap<ClassId, Arc<EntityTypeSchema>>,
    families: HashMap<ClassId, Vec<ClassId>>,
    connections: Vec<ConnectionId>,
}

impl EntityTypeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an entity type.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateKey` if the type is already registered, or
    /// `UnknownField` if a symbolic id field is not in the layout.
    pub fn register(&mut self, mut schema: EntityTypeSchema) -> Result<ClassId> {
        if self.types.contains_key(&schema.class) {
            return Err(Error::duplicate_key(&*schema.name).in_operation("register"));
        }
        schema.resolve_symbolic_fields()?;
        let class = schema.class;
        for family in &schema.families {
            self.families.entry(*family).or_default().push(class);
        }
        self.types.insert(class, Arc::new(schema));
        Ok(class)
    }

    /// Declares a parent/child connection between two classes or families.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConnection` if an end is neither a registered type
    /// nor a known family, or if the abstract end of the connection type
    /// is not a family.
    pub fn connect(
        &mut self,
        parent: ClassId,
        child: ClassId,
        connection_type: ConnectionType,
        is_parent_nullable: bool,
        is_child_nullable: bool,
    ) -> Result<ConnectionId> {
        let parent_ok = if connection_type.has_abstract_parent() {
            self.is_family(parent)
        } else {
            self.types.contains_key(&parent)
        };
        let child_ok = if connection_type.has_abstract_child() {
            self.is_family(child)
        } else {
            self.types.contains_key(&child)
        };
        if !parent_ok || !child_ok {
            return Err(Error::invalid_connection(format!(
                "{connection_type:?} cannot join {} and {}",
                display_class(parent),
                display_class(child),
            )));
        }

        let connection = ConnectionId::create(
            parent,
            child,
            connection_type,
            is_parent_nullable,
            is_child_nullable,
        );
        if !self.connections.contains(&connection) {
            self.connections.push(connection);
        }
        Ok(connection)
    }

    /// Returns the schema for a class.
    #[must_use]
    pub fn schema(&self, class: ClassId) -> Option<&EntityTypeSchema> {
        self.types.get(&class).map(AsRef::as_ref)
    }

    /// Returns the schema for a type name.
    #[must_use]
    pub fn schema_by_name(&self, name: &str) -> Option<&EntityTypeSchema> {
        intern::find_class_id(name).and_then(|class| self.schema(class))
    }

    /// Returns true if the class is registered.
    #[must_use]
    pub fn contains(&self, class: ClassId) -> bool {
        self.types.contains_key(&class)
    }

    /// Returns true if some registered type belongs to the family.
    #[must_use]
    pub fn is_family(&self, class: ClassId) -> bool {
        self.families.contains_key(&class)
    }

    /// Registered types that belong to a family.
    #[must_use]
    pub fn family_members(&self, family: ClassId) -> &[ClassId] {
        self.families.get(&family).map_or(&[], Vec::as_slice)
    }

    /// Iterates over registered classes.
    pub fn classes(&self) -> impl Iterator<Item = ClassId> + '_ {
        self.types.keys().copied()
    }

    /// Iterates over registered schemas.
    pub fn schemas(&self) -> impl Iterator<Item = &EntityTypeSchema> {
        self.types.values().map(AsRef::as_ref)
    }

    /// Declared connections, in declaration order.
    #[must_use]
    pub fn connections(&self) -> &[ConnectionId] {
        &self.connections
    }

    /// Returns true if the connection was declared here.
    #[must_use]
    pub fn has_connection(&self, connection: ConnectionId) -> bool {
        self.connections.contains(&connection)
    }

    /// Returns true if `class` is, or belongs to, `target`.
    #[must_use]
    pub fn is_a(&self, class: ClassId, target: ClassId) -> bool {
        class == target || self.schema(class).is_some_and(|s| s.families.contains(&target))
    }

    /// Connections on which `class` may appear as the child.
    pub fn connections_as_child(&self, class: ClassId) -> impl Iterator<Item = ConnectionId> + '_ {
        self.connections
            .iter()
            .copied()
            .filter(move |c| self.is_a(class, c.child_class()))
    }

    /// Connections on which `class` may appear as the parent.
    pub fn connections_as_parent(&self, class: ClassId) -> impl Iterator<Item = ConnectionId> + '_ {
        self.connections
            .iter()
            .copied()
            .filter(move |c| self.is_a(class, c.parent_class()))
    }
}

fn display_class(class: ClassId) -> String {
    intern::class_name(class).map_or_else(|| format!("{class:?}"), |name| name.to_string())
}
