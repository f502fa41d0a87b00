//! Self-contained export of a snapshot.
//!
//! A [`StorageDump`] refers to types by name instead of by [`ClassId`],
//! because class ids are only meaningful inside one process. Entities keep
//! their indices so edges can be stored as plain index pairs. External
//! mappings are not part of a dump.

use std::collections::HashMap;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use arbor_foundation::{
    ClassId, ConnectionId, ConnectionType, EntityId, EntitySource, Error, ErrorKind, Result,
    SymbolicEntityId, Value, intern,
};

use crate::barrel::EntitiesBarrel;
use crate::builder::MutableEntityStorage;
use crate::config::StoreConfig;
use crate::consistency;
use crate::entity::EntityData;
use crate::external::ExternalMappings;
use crate::indexes::StorageIndexes;
use crate::refs::{EdgeRead, MutableRefsTable};
use crate::registry::{EntityTypeRegistry, EntityTypeSchema};
use crate::snapshot::ImmutableEntityStorage;
use crate::storage::StorageCore;

// =============================================================================
// Records
// =============================================================================

/// A type referenced by a dump.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TypeRecord {
    /// Type or family name.
    pub name: String,
    /// Declaring plugin, if the schema names one.
    pub plugin_id: Option<String>,
    /// Declaring module, if the schema names one.
    pub module_id: Option<String>,
    /// Field names in the layout the entity records use.
    pub fields: Vec<String>,
    /// True for abstract families, which have no entities of their own.
    pub is_family: bool,
}

/// A declared connection, with ends given as type table indices.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConnectionRecord {
    /// Parent type index.
    pub parent: u32,
    /// Child type index.
    pub child: u32,
    /// Edge cardinality.
    pub connection_type: ConnectionType,
    /// Whether the child may exist without a parent.
    pub parent_nullable: bool,
    /// Whether the parent may exist without children.
    pub child_nullable: bool,
}

/// One entity: its type index, its index within the type, its data.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EntityRecord {
    /// Type table index.
    pub type_index: u32,
    /// Entity index within its type.
    pub index: u32,
    /// Provenance.
    pub source: EntitySource,
    /// Field values in the layout of the type record.
    pub fields: Vec<DumpValue>,
}

/// One parent/child edge. Ends are `(type index, entity index)` pairs.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EdgeRecord {
    /// Connection table index.
    pub connection: u32,
    /// Parent end.
    pub parent: (u32, u32),
    /// Child end.
    pub child: (u32, u32),
}

/// Field value with classes replaced by type table indices.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DumpValue {
    /// Absent value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// String value.
    String(String),
    /// List of values.
    List(Vec<DumpValue>),
    /// Soft link.
    Symbolic {
        /// Type table index of the link target.
        type_index: u32,
        /// Identity parts.
        parts: Vec<DumpValue>,
    },
}

/// Process-independent export of a snapshot.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StorageDump {
    /// Every type the other tables refer to.
    pub types: Vec<TypeRecord>,
    /// Connections that carry at least one edge.
    pub connections: Vec<ConnectionRecord>,
    /// All entities, grouped by type.
    pub entities: Vec<EntityRecord>,
    /// All edges.
    pub edges: Vec<EdgeRecord>,
}

impl StorageDump {
    /// Number of entities in the dump.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }
}

// =============================================================================
// Export
// =============================================================================

/// Assigns type table indices on first use.
struct TypeTable<'a> {
    registry: &'a EntityTypeRegistry,
    records: Vec<TypeRecord>,
    positions: HashMap<ClassId, u32>,
}

impl<'a> TypeTable<'a> {
    fn new(registry: &'a EntityTypeRegistry) -> Self {
        Self {
            registry,
            records: Vec::new(),
            positions: HashMap::new(),
        }
    }

    fn index_of(&mut self, class: ClassId) -> Result<u32> {
        if let Some(&position) = self.positions.get(&class) {
            return Ok(position);
        }
        let record = match self.registry.schema(class) {
            Some(schema) => type_record(schema),
            None => {
                let name = intern::class_name(class).ok_or_else(|| {
                    Error::internal(format!("{class:?} has no interned name"))
                })?;
                TypeRecord {
                    name: name.to_string(),
                    plugin_id: None,
                    module_id: None,
                    fields: Vec::new(),
                    is_family: self.registry.is_family(class),
                }
            }
        };
        let position = u32::try_from(self.records.len())
            .map_err(|_| Error::internal("too many types in dump"))?;
        self.records.push(record);
        self.positions.insert(class, position);
        Ok(position)
    }

    fn value(&mut self, value: &Value) -> Result<DumpValue> {
        Ok(match value {
            Value::Null => DumpValue::Null,
            Value::Bool(b) => DumpValue::Bool(*b),
            Value::Int(n) => DumpValue::Int(*n),
            Value::Float(n) => DumpValue::Float(*n),
            Value::String(s) => DumpValue::String(s.to_string()),
            Value::List(items) => {
                DumpValue::List(items.iter().map(|v| self.value(v)).collect::<Result<_>>()?)
            }
            Value::Symbolic(id) => DumpValue::Symbolic {
                type_index: self.index_of(id.class)?,
                parts: id.parts.iter().map(|v| self.value(v)).collect::<Result<_>>()?,
            },
        })
    }
}

fn type_record(schema: &EntityTypeSchema) -> TypeRecord {
    TypeRecord {
        name: schema.name.to_string(),
        plugin_id: schema.plugin_id.as_deref().map(str::to_string),
        module_id: schema.module_id.as_deref().map(str::to_string),
        fields: schema.fields.iter().map(|f| f.name.to_string()).collect(),
        is_family: false,
    }
}

impl ImmutableEntityStorage {
    /// Exports the snapshot as a self-contained dump.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if a class has no interned name, which only
    /// happens for classes built with [`ClassId::from_raw`].
    pub fn dump(&self) -> Result<StorageDump> {
        let core = &self.core;
        let mut table = TypeTable::new(&core.registry);
        let mut entities = Vec::new();

        for class in core.barrel.classes() {
            let type_index = table.index_of(class)?;
            for id in core.barrel.ids(class) {
                let Some(data) = core.barrel.get(id) else {
                    continue;
                };
                let fields = data
                    .fields()
                    .iter()
                    .map(|v| table.value(v))
                    .collect::<Result<_>>()?;
                entities.push(EntityRecord {
                    type_index,
                    index: id.index,
                    source: data.source().clone(),
                    fields,
                });
            }
        }

        let mut connections = Vec::new();
        let mut edges = Vec::new();
        for connection in core.refs.connections() {
            let pairs = core.refs.edges(connection);
            if pairs.is_empty() {
                continue;
            }
            let position = u32::try_from(connections.len())
                .map_err(|_| Error::internal("too many connections in dump"))?;
            connections.push(ConnectionRecord {
                parent: table.index_of(connection.parent_class())?,
                child: table.index_of(connection.child_class())?,
                connection_type: connection.connection_type(),
                parent_nullable: connection.is_parent_nullable(),
                child_nullable: connection.is_child_nullable(),
            });
            for (parent, child) in pairs {
                edges.push(EdgeRecord {
                    connection: position,
                    parent: (table.index_of(parent.class)?, parent.index),
                    child: (table.index_of(child.class)?, child.index),
                });
            }
        }

        tracing::debug!(
            types = table.records.len(),
            entities = entities.len(),
            edges = edges.len(),
            "dumped snapshot"
        );
        Ok(StorageDump {
            types: table.records,
            connections,
            entities,
            edges,
        })
    }
}

// =============================================================================
// Import
// =============================================================================

fn corrupt(message: impl Into<String>) -> Error {
    Error::new(ErrorKind::Serialization(message.into()))
}

/// Type table of a dump resolved against a registry.
struct ResolvedTypes {
    classes: Vec<ClassId>,
    // Per type record: dump field position for each schema field
    layouts: Vec<Option<Vec<Option<usize>>>>,
}

impl ResolvedTypes {
    fn resolve(
        registry: &EntityTypeRegistry,
        dump: &StorageDump,
        resolve: &mut dyn FnMut(&TypeRecord) -> Option<ClassId>,
    ) -> Result<Self> {
        let mut classes = Vec::with_capacity(dump.types.len());
        let mut layouts = Vec::with_capacity(dump.types.len());
        for record in &dump.types {
            let class = resolve(record).ok_or_else(|| Error::unknown_type(record.name.as_str()))?;
            let layout = registry.schema(class).map(|schema| {
                schema
                    .fields
                    .iter()
                    .map(|field| record.fields.iter().position(|name| **name == *field.name))
                    .collect()
            });
            classes.push(class);
            layouts.push(layout);
        }
        Ok(Self { classes, layouts })
    }

    fn class(&self, type_index: u32) -> Result<ClassId> {
        self.classes
            .get(type_index as usize)
            .copied()
            .ok_or_else(|| corrupt(format!("type index {type_index} out of range")))
    }

    fn id(&self, (type_index, index): (u32, u32)) -> Result<EntityId> {
        Ok(EntityId::new(self.class(type_index)?, index))
    }

    fn value(&self, value: &DumpValue) -> Result<Value> {
        Ok(match value {
            DumpValue::Null => Value::Null,
            DumpValue::Bool(b) => Value::Bool(*b),
            DumpValue::Int(n) => Value::Int(*n),
            DumpValue::Float(n) => Value::Float(*n),
            DumpValue::String(s) => Value::from(s.as_str()),
            DumpValue::List(items) => {
                Value::List(items.iter().map(|v| self.value(v)).collect::<Result<_>>()?)
            }
            DumpValue::Symbolic { type_index, parts } => Value::Symbolic(SymbolicEntityId::new(
                self.class(*type_index)?,
                parts.iter().map(|v| self.value(v)).collect::<Result<_>>()?,
            )),
        })
    }

    /// Rebuilds field values in the registry's layout. Fields the dump
    /// lacks get their default; mandatory ones make the record unusable.
    fn fields(&self, schema: &EntityTypeSchema, record: &EntityRecord) -> Result<Vec<Value>> {
        let layout = self
            .layouts
            .get(record.type_index as usize)
            .and_then(Option::as_ref)
            .ok_or_else(|| corrupt(format!("{} has no field layout", schema.name)))?;
        schema
            .fields
            .iter()
            .zip(layout)
            .map(|(field, position)| {
                let value = match position.and_then(|p| record.fields.get(p)) {
                    Some(value) => self.value(value)?,
                    None => field.kind.default_value().ok_or_else(|| {
                        corrupt(format!("{}.{} is missing", schema.name, field.name))
                    })?,
                };
                if field.kind.accepts(&value) {
                    Ok(value)
                } else {
                    Err(Error::new(ErrorKind::FieldTypeMismatch {
                        field: field.name.to_string(),
                        expected: field.kind.to_string(),
                        actual: value.kind_name().to_string(),
                    }))
                }
            })
            .collect()
    }
}

impl MutableEntityStorage {
    /// Rebuilds a storage from a dump.
    ///
    /// `resolve` maps each type record to a class of `registry`; families
    /// must resolve to the family class. Entities keep their indices. The
    /// result belongs to a new lineage and has an empty journal.
    ///
    /// # Errors
    ///
    /// - `UnknownType` if `resolve` rejects a type record or a record names
    ///   an unregistered type
    /// - `Serialization` for out-of-range indices or missing mandatory
    ///   fields
    /// - `FieldTypeMismatch` for values the current layout does not accept
    /// - `InvalidConnection` for edges on connections the registry does not
    ///   declare
    /// - `Inconsistent` if the rebuilt storage breaks an invariant
    pub fn from_dump(
        registry: Arc<EntityTypeRegistry>,
        dump: &StorageDump,
        resolve: &mut dyn FnMut(&TypeRecord) -> Option<ClassId>,
    ) -> Result<Self> {
        Self::from_dump_with_config(registry, StoreConfig::default(), dump, resolve)
    }

    /// [`from_dump`](Self::from_dump) with an explicit configuration.
    ///
    /// # Errors
    ///
    /// See [`from_dump`](Self::from_dump).
    pub fn from_dump_with_config(
        registry: Arc<EntityTypeRegistry>,
        config: StoreConfig,
        dump: &StorageDump,
        resolve: &mut dyn FnMut(&TypeRecord) -> Option<ClassId>,
    ) -> Result<Self> {
        let types = ResolvedTypes::resolve(&registry, dump, resolve)
            .map_err(|err| err.in_operation("from_dump"))?;

        let mut barrel = EntitiesBarrel::new();
        let mut indexes = StorageIndexes::new();
        for record in &dump.entities {
            let class = types.class(record.type_index)?;
            let schema = registry
                .schema(class)
                .ok_or_else(|| Error::unknown_type(format!("{class:?}")))?;
            let id = EntityId::new(class, record.index);
            if barrel.contains(id) {
                return Err(corrupt(format!("{id:?} appears twice")));
            }
            let data = EntityData::new(record.source.clone(), types.fields(schema, record)?);
            indexes.index(id, &data, schema);
            barrel.fill(id, Arc::new(data));
        }

        let mut refs = MutableRefsTable::new();
        let mut connections = Vec::with_capacity(dump.connections.len());
        for record in &dump.connections {
            let connection = ConnectionId::create(
                types.class(record.parent)?,
                types.class(record.child)?,
                record.connection_type,
                record.parent_nullable,
                record.child_nullable,
            );
            if !registry.has_connection(connection) {
                return Err(Error::invalid_connection(format!(
                    "{} is not declared",
                    connection.debug_str()
                )));
            }
            connections.push(connection);
        }
        for edge in &dump.edges {
            let connection = connections
                .get(edge.connection as usize)
                .copied()
                .ok_or_else(|| corrupt(format!("connection index {} out of range", edge.connection)))?;
            refs.link(connection, types.id(edge.parent)?, types.id(edge.child)?)?;
        }

        let core = StorageCore {
            registry,
            config,
            lineage: arbor_foundation::Lineage::fresh(),
            barrel: Arc::new(barrel),
            refs,
            indexes: Arc::new(indexes),
            mappings: Arc::new(ExternalMappings::default()),
        };
        consistency::check(&core).map_err(|err| err.in_operation("from_dump"))?;
        tracing::debug!(entities = dump.entities.len(), edges = dump.edges.len(), "loaded dump");
        Ok(Self::from_core(core, None))
    }
}
