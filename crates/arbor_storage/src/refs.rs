//! Parent/child edges, one container per connection.
//!
//! The physical container depends on the connection type:
//!
//! | Connection            | Container                                 |
//! |-----------------------|-------------------------------------------|
//! | `OneToMany`           | `NonNegativeIntIntBiMap` (child -> parent) |
//! | `OneToOne`            | `IntIntUniqueBiMap` (child <-> parent)     |
//! | `OneToAbstractMany`   | `BidirectionalMap<EntityId, EntityId>`     |
//! | `AbstractOneToOne`    | `PersistentBiMap<EntityId, EntityId>`      |
//!
//! Concrete ends store only the entity index since the class is fixed by
//! the connection. Abstract ends store full ids.

use std::collections::HashMap;
use std::sync::Arc;

use arbor_foundation::collections::{
    BidirectionalMap, IntIntUniqueBiMap, IntIntUniqueBiMapBuilder, NonNegativeIntIntBiMap,
    NonNegativeIntIntBiMapBuilder, PersistentBiMap, PersistentBiMapBuilder,
};
use arbor_foundation::{ConnectionId, ConnectionType, EntityId, Error, ErrorKind, Result};

/// Read access to edges, shared by frozen and writable tables.
pub(crate) trait EdgeRead {
    fn parent_of(&self, connection: ConnectionId, child: EntityId) -> Option<EntityId>;
    fn children_of(&self, connection: ConnectionId, parent: EntityId) -> Vec<EntityId>;
    /// All `(parent, child)` pairs of a connection.
    fn edges(&self, connection: ConnectionId) -> Vec<(EntityId, EntityId)>;
    /// Connections that hold at least one container.
    fn connections(&self) -> Vec<ConnectionId>;
}

// =============================================================================
// Frozen
// =============================================================================

#[derive(Clone, Debug)]
enum EdgeTable {
    OneToMany(NonNegativeIntIntBiMap),
    OneToOne(IntIntUniqueBiMap),
    OneToAbstractMany(BidirectionalMap<EntityId, EntityId>),
    AbstractOneToOne(PersistentBiMap<EntityId, EntityId>),
}

impl EdgeTable {
    fn to_builder(&self) -> EdgeTableBuilder {
        match self {
            Self::OneToMany(map) => EdgeTableBuilder::OneToMany(map.to_builder()),
            Self::OneToOne(map) => EdgeTableBuilder::OneToOne(map.to_builder()),
            Self::OneToAbstractMany(map) => EdgeTableBuilder::OneToAbstractMany(map.clone()),
            Self::AbstractOneToOne(map) => EdgeTableBuilder::AbstractOneToOne(map.builder()),
        }
    }

    fn parent_of(&self, connection: ConnectionId, child: EntityId) -> Option<EntityId> {
        match self {
            Self::OneToMany(map) => map
                .get_value(child.key())
                .map(|p| EntityId::from_key(connection.parent_class(), p)),
            Self::OneToOne(map) => map
                .get_value(child.key())
                .map(|p| EntityId::from_key(connection.parent_class(), p)),
            Self::OneToAbstractMany(map) => map.get(&child).copied(),
            Self::AbstractOneToOne(map) => map.get(&child).copied(),
        }
    }

    fn children_of(&self, connection: ConnectionId, parent: EntityId) -> Vec<EntityId> {
        let child_class = connection.child_class();
        match self {
            Self::OneToMany(map) => map
                .get_keys(parent.key())
                .map(|c| EntityId::from_key(child_class, c))
                .collect(),
            Self::OneToOne(map) => map
                .get_key(parent.key())
                .map(|c| EntityId::from_key(child_class, c))
                .into_iter()
                .collect(),
            Self::OneToAbstractMany(map) => map.get_keys(&parent).to_vec(),
            Self::AbstractOneToOne(map) => map.get_key(&parent).copied().into_iter().collect(),
        }
    }

    fn edges(&self, connection: ConnectionId) -> Vec<(EntityId, EntityId)> {
        let (parent_class, child_class) = (connection.parent_class(), connection.child_class());
        match self {
            Self::OneToMany(map) => map
                .iter()
                .map(|(c, p)| {
                    (
                        EntityId::from_key(parent_class, p),
                        EntityId::from_key(child_class, c),
                    )
                })
                .collect(),
            Self::OneToOne(map) => map
                .iter()
                .map(|(c, p)| {
                    (
                        EntityId::from_key(parent_class, p),
                        EntityId::from_key(child_class, c),
                    )
                })
                .collect(),
            Self::OneToAbstractMany(map) => map.iter().map(|(c, p)| (*p, *c)).collect(),
            Self::AbstractOneToOne(map) => map.iter().map(|(c, p)| (*p, *c)).collect(),
        }
    }
}

/// Frozen edges of a snapshot.
#[derive(Clone, Debug, Default)]
pub(crate) struct RefsTable {
    tables: Arc<HashMap<ConnectionId, EdgeTable>>,
}

impl RefsTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn shares_tables(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.tables, &other.tables)
    }

    /// Starts a writable table that shares every container with `self`.
    pub(crate) fn to_mutable(&self) -> MutableRefsTable {
        MutableRefsTable {
            base: self.clone(),
            modified: HashMap::new(),
        }
    }
}

impl EdgeRead for RefsTable {
    fn parent_of(&self, connection: ConnectionId, child: EntityId) -> Option<EntityId> {
        if !fits_child(connection, child) {
            return None;
        }
        self.tables.get(&connection)?.parent_of(connection, child)
    }

    fn children_of(&self, connection: ConnectionId, parent: EntityId) -> Vec<EntityId> {
        if !fits_parent(connection, parent) {
            return Vec::new();
        }
        self.tables
            .get(&connection)
            .map(|t| t.children_of(connection, parent))
            .unwrap_or_default()
    }

    fn edges(&self, connection: ConnectionId) -> Vec<(EntityId, EntityId)> {
        self.tables
            .get(&connection)
            .map(|t| t.edges(connection))
            .unwrap_or_default()
    }

    fn connections(&self) -> Vec<ConnectionId> {
        self.tables.keys().copied().collect()
    }
}

// =============================================================================
// Writable
// =============================================================================

#[derive(Clone, Debug)]
enum EdgeTableBuilder {
    OneToMany(NonNegativeIntIntBiMapBuilder),
    OneToOne(IntIntUniqueBiMapBuilder),
    OneToAbstractMany(BidirectionalMap<EntityId, EntityId>),
    AbstractOneToOne(PersistentBiMapBuilder<EntityId, EntityId>),
}

impl EdgeTableBuilder {
    fn empty(connection_type: ConnectionType) -> Self {
        match connection_type {
            ConnectionType::OneToMany => Self::OneToMany(NonNegativeIntIntBiMapBuilder::new()),
            ConnectionType::OneToOne => Self::OneToOne(IntIntUniqueBiMapBuilder::new()),
            ConnectionType::OneToAbstractMany => Self::OneToAbstractMany(BidirectionalMap::new()),
            ConnectionType::AbstractOneToOne => {
                Self::AbstractOneToOne(PersistentBiMapBuilder::new())
            }
        }
    }

    fn build(self) -> EdgeTable {
        match self {
            Self::OneToMany(map) => EdgeTable::OneToMany(map.build()),
            Self::OneToOne(map) => EdgeTable::OneToOne(map.build()),
            Self::OneToAbstractMany(map) => EdgeTable::OneToAbstractMany(map),
            Self::AbstractOneToOne(map) => EdgeTable::AbstractOneToOne(map.build()),
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            Self::OneToMany(map) => map.is_empty(),
            Self::OneToOne(map) => map.is_empty(),
            Self::OneToAbstractMany(map) => map.is_empty(),
            Self::AbstractOneToOne(map) => map.is_empty(),
        }
    }

    fn parent_of(&self, connection: ConnectionId, child: EntityId) -> Option<EntityId> {
        match self {
            Self::OneToMany(map) => map
                .get_value(child.key())
                .map(|p| EntityId::from_key(connection.parent_class(), p)),
            Self::OneToOne(map) => map
                .get_value(child.key())
                .map(|p| EntityId::from_key(connection.parent_class(), p)),
            Self::OneToAbstractMany(map) => map.get(&child).copied(),
            Self::AbstractOneToOne(map) => map.get(&child).copied(),
        }
    }

    fn children_of(&self, connection: ConnectionId, parent: EntityId) -> Vec<EntityId> {
        let child_class = connection.child_class();
        match self {
            Self::OneToMany(map) => map
                .get_keys(parent.key())
                .map(|c| EntityId::from_key(child_class, c))
                .collect(),
            Self::OneToOne(map) => map
                .get_key(parent.key())
                .map(|c| EntityId::from_key(child_class, c))
                .into_iter()
                .collect(),
            Self::OneToAbstractMany(map) => map.get_keys(&parent).to_vec(),
            Self::AbstractOneToOne(map) => map.get_key(&parent).copied().into_iter().collect(),
        }
    }

    fn edges(&self, connection: ConnectionId) -> Vec<(EntityId, EntityId)> {
        let (parent_class, child_class) = (connection.parent_class(), connection.child_class());
        match self {
            Self::OneToMany(map) => map
                .iter()
                .map(|(c, p)| {
                    (
                        EntityId::from_key(parent_class, p),
                        EntityId::from_key(child_class, c),
                    )
                })
                .collect(),
            Self::OneToOne(map) => map
                .iter()
                .map(|(c, p)| {
                    (
                        EntityId::from_key(parent_class, p),
                        EntityId::from_key(child_class, c),
                    )
                })
                .collect(),
            Self::OneToAbstractMany(map) => map.iter().map(|(c, p)| (*p, *c)).collect(),
            Self::AbstractOneToOne(map) => map.iter().map(|(c, p)| (*p, *c)).collect(),
        }
    }

    /// Links `child` under `parent`, replacing the child's previous parent.
    ///
    /// One-to-one tables refuse a parent that already holds a different
    /// child; callers detach or remove that child first.
    fn link(&mut self, parent: EntityId, child: EntityId) -> Result<()> {
        match self {
            Self::OneToMany(map) => map.put(child.key(), parent.key()),
            Self::OneToOne(map) => {
                if map.get_value(child.key()) == Some(parent.key()) {
                    return Ok(());
                }
                map.remove_key(child.key());
                map.put(child.key(), parent.key())
            }
            Self::OneToAbstractMany(map) => {
                map.insert(child, parent);
                Ok(())
            }
            Self::AbstractOneToOne(map) => {
                if map.get(&child) == Some(&parent) {
                    return Ok(());
                }
                map.remove_key(&child);
                map.put(child, parent)
            }
        }
    }

    fn unlink_child(&mut self, connection: ConnectionId, child: EntityId) -> Option<EntityId> {
        let parent_class = connection.parent_class();
        match self {
            Self::OneToMany(map) => map
                .remove_key(child.key())
                .map(|p| EntityId::from_key(parent_class, p)),
            Self::OneToOne(map) => map
                .remove_key(child.key())
                .map(|p| EntityId::from_key(parent_class, p)),
            Self::OneToAbstractMany(map) => map.remove(&child),
            Self::AbstractOneToOne(map) => map.remove_key(&child),
        }
    }

    fn unlink_parent(&mut self, connection: ConnectionId, parent: EntityId) -> Vec<EntityId> {
        let child_class = connection.child_class();
        match self {
            Self::OneToMany(map) => map
                .remove_value(parent.key())
                .into_iter()
                .map(|c| EntityId::from_key(child_class, c))
                .collect(),
            Self::OneToOne(map) => map
                .remove_value(parent.key())
                .map(|c| EntityId::from_key(child_class, c))
                .into_iter()
                .collect(),
            Self::OneToAbstractMany(map) => map.remove_value(&parent),
            Self::AbstractOneToOne(map) => map.remove_value(&parent).into_iter().collect(),
        }
    }
}

/// Writable edges of a builder.
///
/// Containers are copied from the base table the first time a connection
/// is written; untouched connections keep sharing the base containers.
#[derive(Clone, Debug, Default)]
pub(crate) struct MutableRefsTable {
    base: RefsTable,
    modified: HashMap<ConnectionId, EdgeTableBuilder>,
}

impl MutableRefsTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn table_mut(&mut self, connection: ConnectionId) -> &mut EdgeTableBuilder {
        let base = &self.base;
        self.modified.entry(connection).or_insert_with(|| {
            base.tables.get(&connection).map_or_else(
                || EdgeTableBuilder::empty(connection.connection_type()),
                EdgeTable::to_builder,
            )
        })
    }

    /// Links `child` under `parent` on `connection`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConnection` if either entity does not fit the
    /// connection, or `CardinalityViolation` if a one-to-one parent already
    /// holds another child.
    pub(crate) fn link(
        &mut self,
        connection: ConnectionId,
        parent: EntityId,
        child: EntityId,
    ) -> Result<()> {
        if !fits_parent(connection, parent) || !fits_child(connection, child) {
            return Err(Error::invalid_connection(format!(
                "{parent:?} -> {child:?} on {}",
                connection.debug_str()
            )));
        }
        self.table_mut(connection).link(parent, child).map_err(|err| match err.kind {
            ErrorKind::DuplicateValue(_) => Error::new(ErrorKind::CardinalityViolation(format!(
                "{parent:?} already has a child on {}",
                connection.debug_str()
            ))),
            _ => err,
        })
    }

    /// Removes the child's edge on `connection`, returning the old parent.
    pub(crate) fn unlink_child(
        &mut self,
        connection: ConnectionId,
        child: EntityId,
    ) -> Option<EntityId> {
        self.parent_of(connection, child)?;
        self.table_mut(connection).unlink_child(connection, child)
    }

    /// Removes every edge under `parent` on `connection`, returning the
    /// detached children.
    pub(crate) fn unlink_parent(
        &mut self,
        connection: ConnectionId,
        parent: EntityId,
    ) -> Vec<EntityId> {
        if self.children_of(connection, parent).is_empty() {
            return Vec::new();
        }
        self.table_mut(connection).unlink_parent(connection, parent)
    }

    /// Freezes the current edges, leaving the builder usable.
    ///
    /// Rebuilt containers are folded back into the base, so a later freeze
    /// only rebuilds the connections written since this one.
    pub(crate) fn freeze(&mut self) -> RefsTable {
        if !self.modified.is_empty() {
            let mut tables = (*self.base.tables).clone();
            for (connection, table) in self.modified.drain() {
                if table.is_empty() {
                    tables.remove(&connection);
                } else {
                    tables.insert(connection, table.build());
                }
            }
            self.base = RefsTable {
                tables: Arc::new(tables),
            };
        }
        self.base.clone()
    }

    #[cfg(test)]
    pub(crate) fn pending_connections(&self) -> usize {
        self.modified.len()
    }
}

impl EdgeRead for MutableRefsTable {
    fn parent_of(&self, connection: ConnectionId, child: EntityId) -> Option<EntityId> {
        if !fits_child(connection, child) {
            return None;
        }
        match self.modified.get(&connection) {
            Some(table) => table.parent_of(connection, child),
            None => self.base.parent_of(connection, child),
        }
    }

    fn children_of(&self, connection: ConnectionId, parent: EntityId) -> Vec<EntityId> {
        if !fits_parent(connection, parent) {
            return Vec::new();
        }
        match self.modified.get(&connection) {
            Some(table) => table.children_of(connection, parent),
            None => self.base.children_of(connection, parent),
        }
    }

    fn edges(&self, connection: ConnectionId) -> Vec<(EntityId, EntityId)> {
        match self.modified.get(&connection) {
            Some(table) => table.edges(connection),
            None => self.base.edges(connection),
        }
    }

    fn connections(&self) -> Vec<ConnectionId> {
        let mut connections = self.base.connections();
        for connection in self.modified.keys() {
            if !connections.contains(connection) {
                connections.push(*connection);
            }
        }
        connections
    }
}

// Concrete ends must match the connection's class exactly; family
// membership of abstract ends is checked by the storage against its registry.
fn fits_parent(connection: ConnectionId, parent: EntityId) -> bool {
    connection.connection_type().has_abstract_parent() || parent.class == connection.parent_class()
}

fn fits_child(connection: ConnectionId, child: EntityId) -> bool {
    connection.connection_type().has_abstract_child() || child.class == connection.child_class()
}
