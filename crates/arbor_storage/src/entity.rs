//! Entity data, handles, read views, and write descriptions.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use arbor_foundation::{
    ClassId, ConnectionId, EntityId, EntitySource, Error, ErrorKind, Lineage, Result,
    SymbolicEntityId, Value,
};

use crate::pointer::{EntityPointer, EntityReference};
use crate::registry::EntityTypeSchema;
use crate::storage::EntityStorage;

/// Stored payload of one entity: its source and its field values in
/// schema order.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EntityData {
    source: EntitySource,
    fields: Vec<Value>,
}

impl EntityData {
    pub(crate) fn new(source: EntitySource, fields: Vec<Value>) -> Self {
        Self { source, fields }
    }

    /// Entity source.
    #[must_use]
    pub fn source(&self) -> &EntitySource {
        &self.source
    }

    /// Field values in schema order.
    #[must_use]
    pub fn fields(&self) -> &[Value] {
        &self.fields
    }

    /// Returns true if both carry the same field values, ignoring source.
    #[must_use]
    pub fn same_fields(&self, other: &Self) -> bool {
        self.fields == other.fields
    }

    pub(crate) fn with_source(&self, source: EntitySource) -> Self {
        Self {
            source,
            fields: self.fields.clone(),
        }
    }

    pub(crate) fn with_fields(&self, fields: Vec<Value>) -> Self {
        Self {
            source: self.source.clone(),
            fields,
        }
    }

    /// Symbolic ids referenced from any field.
    pub(crate) fn soft_links(&self) -> Vec<SymbolicEntityId> {
        let mut links = Vec::new();
        for value in &self.fields {
            value.for_each_symbolic(&mut |id| {
                if !links.contains(id) {
                    links.push(id.clone());
                }
            });
        }
        links
    }
}

/// Handle to an entity within one storage lineage.
///
/// Two handles are equal iff they name the same id in the same lineage.
/// Handles are only valid in the storages of their lineage.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Entity {
    id: EntityId,
    lineage: Lineage,
}

impl Entity {
    pub(crate) const fn new(id: EntityId, lineage: Lineage) -> Self {
        Self { id, lineage }
    }

    /// Entity id.
    #[must_use]
    pub const fn id(self) -> EntityId {
        self.id
    }

    /// Entity class.
    #[must_use]
    pub const fn class(self) -> ClassId {
        self.id.class
    }

    /// Lineage the handle belongs to.
    #[must_use]
    pub const fn lineage(self) -> Lineage {
        self.lineage
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}:{}@{})", self.id.class.index(), self.id.index, self.lineage.raw())
    }
}

/// Read-only view of a live entity, bound to the storage it was read from.
#[derive(Clone, Copy)]
pub struct EntityView<'a> {
    storage: &'a dyn EntityStorage,
    id: EntityId,
    data: &'a Arc<EntityData>,
    schema: &'a EntityTypeSchema,
}

impl<'a> EntityView<'a> {
    pub(crate) fn new(
        storage: &'a dyn EntityStorage,
        id: EntityId,
        data: &'a Arc<EntityData>,
        schema: &'a EntityTypeSchema,
    ) -> Self {
        Self {
            storage,
            id,
            data,
            schema,
        }
    }

    /// Entity id.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Entity class.
    #[must_use]
    pub fn class(&self) -> ClassId {
        self.id.class
    }

    /// Handle usable for mutations in storages of the same lineage.
    #[must_use]
    pub fn handle(&self) -> Entity {
        Entity::new(self.id, self.storage.lineage())
    }

    /// Entity source.
    #[must_use]
    pub fn source(&self) -> &'a EntitySource {
        self.data.source()
    }

    /// Raw entity data.
    #[must_use]
    pub fn data(&self) -> &'a Arc<EntityData> {
        self.data
    }

    /// Schema of the entity's type.
    #[must_use]
    pub fn schema(&self) -> &'a EntityTypeSchema {
        self.schema
    }

    /// Storage the view was read from.
    #[must_use]
    pub fn storage(&self) -> &'a dyn EntityStorage {
        self.storage
    }

    /// Field value by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&'a Value> {
        let data: &'a EntityData = self.data;
        self.schema.field_index(name).and_then(|i| data.fields.get(i))
    }

    /// String field value by name.
    #[must_use]
    pub fn str_field(&self, name: &str) -> Option<&'a str> {
        self.field(name).and_then(Value::as_str)
    }

    /// Field values in schema order.
    #[must_use]
    pub fn fields(&self) -> &'a [Value] {
        self.data.fields()
    }

    /// Symbolic id of the entity, if its type declares one.
    #[must_use]
    pub fn symbolic_id(&self) -> Option<SymbolicEntityId> {
        self.schema.symbolic_id_of(self.data.fields())
    }

    /// Parent on `connection`.
    #[must_use]
    pub fn parent(&self, connection: ConnectionId) -> Option<EntityView<'a>> {
        self.storage.parent_of(self.id, connection)
    }

    /// Children on `connection`.
    #[must_use]
    pub fn children(&self, connection: ConnectionId) -> Vec<EntityView<'a>> {
        self.storage.children_of(self.id, connection)
    }

    /// Creates a lineage-independent pointer to this entity.
    #[must_use]
    pub fn create_pointer(&self) -> EntityPointer {
        EntityPointer::new(self.id)
    }

    /// Creates a lineage-bound reference to this entity.
    #[must_use]
    pub fn create_reference(&self) -> EntityReference {
        EntityReference::new(self.handle())
    }
}

impl PartialEq for EntityView<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.handle() == other.handle()
    }
}

impl fmt::Debug for EntityView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityView")
            .field("id", &self.id)
            .field("type", &self.schema.name)
            .field("source", self.data.source())
            .field("fields", &self.data.fields())
            .finish()
    }
}

// =============================================================================
// New entities
// =============================================================================

/// Child attached to a [`NewEntity`].
#[derive(Clone, Debug)]
pub enum ChildSpec {
    /// A child created together with the parent.
    New(NewEntity),
    /// An existing entity moved under the new parent.
    Linked(Entity),
}

/// Description of an entity tree to add with `add_entity`.
///
/// Fields are given by name; omitted fields take their kind's default.
/// Children are created or moved under the new entity, and parents link
/// the new entity under existing ones.
#[derive(Clone, Debug)]
pub struct NewEntity {
    pub(crate) class: ClassId,
    pub(crate) source: EntitySource,
    pub(crate) fields: Vec<(Arc<str>, Value)>,
    pub(crate) children: Vec<(ConnectionId, ChildSpec)>,
    pub(crate) parents: Vec<(ConnectionId, Entity)>,
}

impl NewEntity {
    /// Starts describing an entity of `class`.
    #[must_use]
    pub fn new(class: ClassId, source: EntitySource) -> Self {
        Self {
            class,
            source,
            fields: Vec::new(),
            children: Vec::new(),
            parents: Vec::new(),
        }
    }

    /// Deep copy of a stored entity and everything below it.
    ///
    /// Parents are not copied; mandatory ones must be supplied with
    /// [`NewEntity::with_parent`] before the copy is added.
    #[must_use]
    pub fn copy_of(view: &EntityView<'_>) -> Self {
        let mut copy = Self::new(view.class(), view.source().clone());
        for (field, value) in view.schema().fields.iter().zip(view.fields()) {
            copy.fields.push((field.name.clone(), value.clone()));
        }
        let storage = view.storage();
        for connection in storage.registry().connections_as_parent(view.class()) {
            for child in view.children(connection) {
                copy.children
                    .push((connection, ChildSpec::New(Self::copy_of(&child))));
            }
        }
        copy
    }

    /// Sets a field value.
    #[must_use]
    pub fn with_field(mut self, name: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| &**n == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name.into(), value)),
        }
        self
    }

    /// Creates a child together with this entity.
    #[must_use]
    pub fn with_child(mut self, connection: ConnectionId, child: NewEntity) -> Self {
        self.children.push((connection, ChildSpec::New(child)));
        self
    }

    /// Moves an existing entity under this entity.
    #[must_use]
    pub fn with_linked_child(mut self, connection: ConnectionId, child: Entity) -> Self {
        self.children.push((connection, ChildSpec::Linked(child)));
        self
    }

    /// Links this entity under an existing parent.
    #[must_use]
    pub fn with_parent(mut self, connection: ConnectionId, parent: Entity) -> Self {
        self.parents.retain(|(c, _)| *c != connection);
        self.parents.push((connection, parent));
        self
    }

    /// Class of the entity.
    #[must_use]
    pub fn class(&self) -> ClassId {
        self.class
    }

    /// Number of entities described, including nested children.
    #[must_use]
    pub fn tree_size(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(|(_, child)| match child {
                ChildSpec::New(new) => new.tree_size(),
                ChildSpec::Linked(_) => 0,
            })
            .sum::<usize>()
    }
}

/// Resolves named field values into a full layout, filling defaults.
pub(crate) fn layout_fields(
    schema: &EntityTypeSchema,
    named: &[(Arc<str>, Value)],
) -> Result<Vec<Value>> {
    for (name, _) in named {
        if schema.field_index(name).is_none() {
            return Err(Error::new(ErrorKind::UnknownField {
                class: schema.class,
                field: name.to_string(),
            }));
        }
    }
    schema
        .fields
        .iter()
        .map(|field| {
            let value = named
                .iter()
                .rev()
                .find(|(n, _)| *n == field.name)
                .map(|(_, v)| v.clone())
                .or_else(|| field.kind.default_value())
                .ok_or_else(|| {
                    Error::new(ErrorKind::FieldTypeMismatch {
                        field: field.name.to_string(),
                        expected: field.kind.to_string(),
                        actual: "missing".to_string(),
                    })
                })?;
            check_kind(schema, field.name.as_ref(), &value)?;
            Ok(value)
        })
        .collect()
}

pub(crate) fn check_kind(schema: &EntityTypeSchema, name: &str, value: &Value) -> Result<()> {
    let field = schema.field(name).ok_or_else(|| {
        Error::new(ErrorKind::UnknownField {
            class: schema.class,
            field: name.to_string(),
        })
    })?;
    if field.kind.accepts(value) {
        Ok(())
    } else {
        Err(Error::new(ErrorKind::FieldTypeMismatch {
            field: name.to_string(),
            expected: field.kind.to_string(),
            actual: value.kind_name().to_string(),
        }))
    }
}

// =============================================================================
// Modification
// =============================================================================

/// Pending edits to one entity, collected inside `modify_entity`.
///
/// Setters validate immediately, so a closure can propagate their errors
/// with `?` and leave the storage untouched.
pub struct ModifiableEntity<'a> {
    storage: &'a dyn EntityStorage,
    schema: &'a EntityTypeSchema,
    id: EntityId,
    source: EntitySource,
    fields: Vec<Value>,
    children: HashMap<ConnectionId, Vec<EntityId>>,
    parents: HashMap<ConnectionId, Option<EntityId>>,
}

/// Owned result of a [`ModifiableEntity`] session.
#[derive(Debug)]
pub(crate) struct EntityModification {
    pub(crate) source: EntitySource,
    pub(crate) fields: Vec<Value>,
    pub(crate) children: HashMap<ConnectionId, Vec<EntityId>>,
    pub(crate) parents: HashMap<ConnectionId, Option<EntityId>>,
}

impl<'a> ModifiableEntity<'a> {
    pub(crate) fn new(view: &EntityView<'a>) -> Self {
        Self {
            storage: view.storage(),
            schema: view.schema(),
            id: view.id(),
            source: view.source().clone(),
            fields: view.fields().to_vec(),
            children: HashMap::new(),
            parents: HashMap::new(),
        }
    }

    pub(crate) fn into_modification(self) -> EntityModification {
        EntityModification {
            source: self.source,
            fields: self.fields,
            children: self.children,
            parents: self.parents,
        }
    }

    /// Id of the entity being modified.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Current value of a field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.schema.field_index(name).and_then(|i| self.fields.get(i))
    }

    /// Sets a field value.
    ///
    /// # Errors
    ///
    /// Returns `UnknownField` or `FieldTypeMismatch`.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        check_kind(self.schema, name, &value)?;
        if let Some(index) = self.schema.field_index(name) {
            self.fields[index] = value;
        }
        Ok(())
    }

    /// Current source.
    #[must_use]
    pub fn source(&self) -> &EntitySource {
        &self.source
    }

    /// Replaces the source.
    pub fn set_source(&mut self, source: EntitySource) {
        self.source = source;
    }

    /// Current children on `connection`.
    #[must_use]
    pub fn children(&self, connection: ConnectionId) -> Vec<EntityId> {
        self.children.get(&connection).cloned().unwrap_or_else(|| {
            self.storage
                .child_ids(self.id, connection)
        })
    }

    /// Replaces the children on `connection`.
    ///
    /// Dropped children are detached if the connection lets them live
    /// without a parent, otherwise they are removed with their subtrees.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConnection` if the entity cannot be a parent on
    /// `connection` or a child does not fit it, `ForeignEntity` or
    /// `EntityNotFound` for bad handles, and `CardinalityViolation` for
    /// more than one child on a one-to-one connection or for clearing a
    /// one-to-one child slot that may not be empty.
    pub fn set_children(&mut self, connection: ConnectionId, children: &[Entity]) -> Result<()> {
        self.check_parent_end(connection)?;
        let mut ids = Vec::with_capacity(children.len());
        for child in children {
            let id = self.check_handle(*child)?;
            if !self.storage.registry().is_a(id.class, connection.child_class()) {
                return Err(Error::invalid_connection(format!(
                    "{id:?} cannot be a child on {}",
                    connection.debug_str()
                )));
            }
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        if connection.connection_type().is_one_to_one() {
            if ids.len() > 1 {
                return Err(Error::new(ErrorKind::CardinalityViolation(format!(
                    "{} children on {}",
                    ids.len(),
                    connection.debug_str()
                ))));
            }
            if ids.is_empty() && !connection.can_remove_child() && !self.children(connection).is_empty()
            {
                return Err(Error::new(ErrorKind::CardinalityViolation(format!(
                    "child of {:?} on {} cannot be cleared",
                    self.id,
                    connection.debug_str()
                ))));
            }
        }
        self.children.insert(connection, ids);
        Ok(())
    }

    /// Appends a child on `connection`.
    ///
    /// # Errors
    ///
    /// Same as [`ModifiableEntity::set_children`].
    pub fn add_child(&mut self, connection: ConnectionId, child: Entity) -> Result<()> {
        let mut current = self.handles(connection);
        current.push(child);
        self.set_children(connection, &current)
    }

    /// Drops a child from `connection`. Returns false if it was not there.
    ///
    /// # Errors
    ///
    /// Same as [`ModifiableEntity::set_children`].
    pub fn remove_child(&mut self, connection: ConnectionId, child: Entity) -> Result<bool> {
        let current = self.handles(connection);
        let kept: Vec<Entity> = current.iter().copied().filter(|c| *c != child).collect();
        if kept.len() == current.len() {
            return Ok(false);
        }
        self.set_children(connection, &kept)?;
        Ok(true)
    }

    /// Current parent on `connection`.
    #[must_use]
    pub fn parent(&self, connection: ConnectionId) -> Option<EntityId> {
        match self.parents.get(&connection) {
            Some(parent) => *parent,
            None => self.storage.parent_id(self.id, connection),
        }
    }

    /// Moves the entity under `parent`, or detaches it with `None`.
    ///
    /// # Errors
    ///
    /// Returns `MandatoryParentMissing` when detaching from a connection
    /// whose children need a parent, `InvalidConnection` if either end
    /// does not fit, and `ForeignEntity` / `EntityNotFound` for bad handles.
    pub fn set_parent(&mut self, connection: ConnectionId, parent: Option<Entity>) -> Result<()> {
        if !self.storage.registry().is_a(self.id.class, connection.child_class()) {
            return Err(Error::invalid_connection(format!(
                "{:?} cannot be a child on {}",
                self.id,
                connection.debug_str()
            )));
        }
        let parent = match parent {
            Some(parent) => {
                let id = self.check_handle(parent)?;
                if !self.storage.registry().is_a(id.class, connection.parent_class()) {
                    return Err(Error::invalid_connection(format!(
                        "{id:?} cannot be a parent on {}",
                        connection.debug_str()
                    )));
                }
                Some(id)
            }
            None if !connection.can_remove_parent() => {
                return Err(Error::new(ErrorKind::MandatoryParentMissing {
                    child: format!("{:?}", self.id),
                    connection: connection.debug_str(),
                }));
            }
            None => None,
        };
        self.parents.insert(connection, parent);
        Ok(())
    }

    fn handles(&self, connection: ConnectionId) -> Vec<Entity> {
        let lineage = self.storage.lineage();
        self.children(connection)
            .into_iter()
            .map(|id| Entity::new(id, lineage))
            .collect()
    }

    fn check_parent_end(&self, connection: ConnectionId) -> Result<()> {
        if self.storage.registry().is_a(self.id.class, connection.parent_class()) {
            Ok(())
        } else {
            Err(Error::invalid_connection(format!(
                "{:?} cannot be a parent on {}",
                self.id,
                connection.debug_str()
            )))
        }
    }

    fn check_handle(&self, entity: Entity) -> Result<EntityId> {
        if entity.lineage() != self.storage.lineage() {
            return Err(Error::foreign_entity(entity.id()));
        }
        if self.storage.entity_data(entity.id()).is_none() {
            return Err(Error::entity_not_found(entity.id()));
        }
        Ok(entity.id())
    }
}

impl fmt::Debug for ModifiableEntity<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModifiableEntity")
            .field("id", &self.id)
            .field("source", &self.source)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}
