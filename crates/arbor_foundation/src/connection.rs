//! Canonical parent/child edge descriptors.

use std::fmt;
use std::hash::{Hash, Hasher};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::ids::ClassId;
use crate::intern;

/// Cardinality of a parent/child edge.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ConnectionType {
    /// At most one child per parent, concrete classes on both ends.
    OneToOne,
    /// Any number of children per parent.
    OneToMany,
    /// Any number of children whose class belongs to an abstract family.
    OneToAbstractMany,
    /// At most one child; the parent class is an abstract family.
    AbstractOneToOne,
}

impl ConnectionType {
    /// Returns true if a parent holds at most one child on this edge.
    #[must_use]
    pub const fn is_one_to_one(self) -> bool {
        matches!(self, Self::OneToOne | Self::AbstractOneToOne)
    }

    /// Returns true if the parent end of the edge is an abstract family.
    #[must_use]
    pub const fn has_abstract_parent(self) -> bool {
        matches!(self, Self::AbstractOneToOne)
    }

    /// Returns true if the child end of the edge is an abstract family.
    #[must_use]
    pub const fn has_abstract_child(self) -> bool {
        matches!(self, Self::OneToAbstractMany)
    }
}

/// Interning key: every field that makes two edge kinds distinct.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct ConnectionKey {
    pub(crate) parent_class: ClassId,
    pub(crate) child_class: ClassId,
    pub(crate) connection_type: ConnectionType,
    pub(crate) is_parent_nullable: bool,
    pub(crate) is_child_nullable: bool,
}

/// Canonical edge descriptor, leaked once per distinct key.
#[derive(Debug)]
pub(crate) struct ConnectionData {
    key: ConnectionKey,
}

impl ConnectionData {
    pub(crate) const fn from_key(key: ConnectionKey) -> Self {
        Self { key }
    }
}

/// Interned description of one parent/child edge kind.
///
/// Two ids built from the same five fields are the same pointer, so
/// equality and hashing are address based. Descriptors live for the rest
/// of the process.
#[derive(Copy, Clone)]
pub struct ConnectionId(&'static ConnectionData);

impl ConnectionId {
    /// Returns the canonical id for the given edge kind.
    ///
    /// `is_parent_nullable` means the child may exist without a parent on
    /// this edge. `is_child_nullable` means the parent's child slot may be
    /// emptied without removing the parent.
    #[must_use]
    pub fn create(
        parent_class: ClassId,
        child_class: ClassId,
        connection_type: ConnectionType,
        is_parent_nullable: bool,
        is_child_nullable: bool,
    ) -> Self {
        Self(intern::connection(ConnectionKey {
            parent_class,
            child_class,
            connection_type,
            is_parent_nullable,
            is_child_nullable,
        }))
    }

    /// Class (or abstract family) on the parent end.
    #[must_use]
    pub fn parent_class(self) -> ClassId {
        self.0.key.parent_class
    }

    /// Class (or abstract family) on the child end.
    #[must_use]
    pub fn child_class(self) -> ClassId {
        self.0.key.child_class
    }

    /// Edge cardinality.
    #[must_use]
    pub fn connection_type(self) -> ConnectionType {
        self.0.key.connection_type
    }

    /// Whether the child may lose its parent on this edge.
    #[must_use]
    pub fn is_parent_nullable(self) -> bool {
        self.0.key.is_parent_nullable
    }

    /// Whether the parent may lose its child on this edge.
    #[must_use]
    pub fn is_child_nullable(self) -> bool {
        self.0.key.is_child_nullable
    }

    /// A removed parent detaches (rather than removes) the child.
    #[must_use]
    pub fn can_remove_parent(self) -> bool {
        self.is_parent_nullable()
    }

    /// A removed child leaves the parent in place.
    #[must_use]
    pub fn can_remove_child(self) -> bool {
        self.is_child_nullable()
    }

    /// Human readable description, e.g. `Module -> ContentRoot (OneToMany)`.
    #[must_use]
    pub fn debug_str(self) -> String {
        let name = |class: ClassId| {
            intern::class_name(class).map_or_else(|| format!("#{}", class.index()), |n| n.to_string())
        };
        format!(
            "{} -> {} ({:?}, parent nullable: {}, child nullable: {})",
            name(self.parent_class()),
            name(self.child_class()),
            self.connection_type(),
            self.is_parent_nullable(),
            self.is_child_nullable()
        )
    }
}

impl PartialEq for ConnectionId {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.0, other.0)
    }
}

impl Eq for ConnectionId {}

impl Hash for ConnectionId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::from_ref(self.0).hash(state);
    }
}

impl fmt::Debug for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConnectionId({})", self.debug_str())
    }
}
